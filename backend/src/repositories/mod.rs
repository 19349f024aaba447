//! Repository traits and their PostgreSQL implementations.
//!
//! Services depend on the traits only, so tests can swap in mocks or
//! in-memory stores.

pub mod attendance_record;
pub mod attendance_session;
pub mod subject;
pub mod user;

pub use attendance_record::{AttendanceRecordRepository, AttendanceRecordRepositoryTrait};
pub use attendance_session::{SessionRepository, SessionRepositoryTrait};
pub use subject::{SubjectRepository, SubjectRepositoryTrait};
pub use user::{UserRepository, UserRepositoryTrait};
