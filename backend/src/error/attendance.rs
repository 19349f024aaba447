use axum::http::StatusCode;

use super::AppError;

/// Rejections produced by the attendance pipeline.
///
/// Policy violations are the common case and each carries its own code so the
/// client can render a specific message.
#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Invalid or expired code")]
    InvalidOrExpiredCode,
    #[error("Session has expired")]
    SessionExpired,
    #[error("Outside geofence ({distance_m:.0}m from department, limit {radius_m:.0}m)")]
    OutsideGeofence { distance_m: f64, radius_m: f64 },
    #[error("Still within geofence. Check-out requires leaving the area")]
    StillWithinGeofence { distance_m: f64, radius_m: f64 },
    #[error("VPN detected")]
    VpnDetected,
    #[error("IP location does not match device location ({distance_m:.0}m apart)")]
    LocationMismatch { distance_m: f64 },
    #[error("You have already checked in for this session")]
    AlreadyCheckedIn,
    #[error("No active check-in found")]
    NoActiveCheckIn,
    #[error("Could not generate a unique code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },
    #[error("IP intelligence service unavailable: {0}")]
    ExternalService(String),
    #[error(transparent)]
    Store(#[from] AppError),
}

impl AttendanceError {
    /// Machine readable code surfaced in the error body.
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::Unauthorized(_) => "UNAUTHORIZED",
            AttendanceError::Forbidden(_) => "FORBIDDEN",
            AttendanceError::Validation(_) => "VALIDATION_ERROR",
            AttendanceError::NotFound(_) => "NOT_FOUND",
            AttendanceError::InvalidOrExpiredCode => "INVALID_OR_EXPIRED_CODE",
            AttendanceError::SessionExpired => "SESSION_EXPIRED",
            AttendanceError::OutsideGeofence { .. } => "OUTSIDE_GEOFENCE",
            AttendanceError::StillWithinGeofence { .. } => "STILL_WITHIN_GEOFENCE",
            AttendanceError::VpnDetected => "VPN_DETECTED",
            AttendanceError::LocationMismatch { .. } => "LOCATION_MISMATCH",
            AttendanceError::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            AttendanceError::NoActiveCheckIn => "NO_ACTIVE_CHECK_IN",
            AttendanceError::CodeSpaceExhausted { .. } => "CODE_SPACE_EXHAUSTED",
            AttendanceError::ExternalService(_) => "IP_INTEL_UNAVAILABLE",
            AttendanceError::Store(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// True for the expected rejections (as opposed to infrastructure failures).
    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            AttendanceError::InvalidOrExpiredCode
                | AttendanceError::SessionExpired
                | AttendanceError::OutsideGeofence { .. }
                | AttendanceError::StillWithinGeofence { .. }
                | AttendanceError::VpnDetected
                | AttendanceError::LocationMismatch { .. }
                | AttendanceError::AlreadyCheckedIn
                | AttendanceError::NoActiveCheckIn
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            AttendanceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AttendanceError::Forbidden(_)
            | AttendanceError::VpnDetected
            | AttendanceError::LocationMismatch { .. } => StatusCode::FORBIDDEN,
            AttendanceError::NotFound(_) => StatusCode::NOT_FOUND,
            AttendanceError::CodeSpaceExhausted { .. } | AttendanceError::ExternalService(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AttendanceError::Validation(_)
            | AttendanceError::InvalidOrExpiredCode
            | AttendanceError::SessionExpired
            | AttendanceError::OutsideGeofence { .. }
            | AttendanceError::StillWithinGeofence { .. }
            | AttendanceError::AlreadyCheckedIn
            | AttendanceError::NoActiveCheckIn => StatusCode::BAD_REQUEST,
            AttendanceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AttendanceError> for AppError {
    fn from(err: AttendanceError) -> Self {
        match err {
            AttendanceError::Store(inner) => inner,
            AttendanceError::Unauthorized(msg) => AppError::Unauthorized(msg),
            AttendanceError::Forbidden(msg) => AppError::Forbidden(msg),
            AttendanceError::NotFound(msg) => AppError::NotFound(msg),
            AttendanceError::Validation(msg) => AppError::Validation(vec![msg]),
            other => AppError::Rejected {
                status: other.status(),
                code: other.code(),
                message: other.to_string(),
            },
        }
    }
}
