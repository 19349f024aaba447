pub mod attendance;
pub mod geo;
pub mod ip_intel;
pub mod session_code;

pub use attendance::AttendanceService;
pub use ip_intel::{IpApiProvider, IpIntelProvider, SpoofGuard};
pub use session_code::{SessionCodeIssuer, SessionCodeSettings};
