//! Attendance records and the request payloads that create or close them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    services::geo::GeoPoint,
    types::{RecordId, SessionId, SubjectId, UserId},
};

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub student_id: UserId,
    pub session_id: SessionId,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub method: AttendanceMethod,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceMethod {
    Geofence,
    Manual,
}

impl AttendanceMethod {
    pub fn db_value(&self) -> &'static str {
        match self {
            AttendanceMethod::Geofence => "geofence",
            AttendanceMethod::Manual => "manual",
        }
    }
}

/// Where a (student, session) pair sits in the check-in/check-out lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    NoRecord,
    CheckedIn,
    CheckedOut,
}

impl RecordState {
    pub fn of(record: Option<&AttendanceRecord>) -> Self {
        match record {
            None => RecordState::NoRecord,
            Some(record) if record.check_out_time.is_some() => RecordState::CheckedOut,
            Some(_) => RecordState::CheckedIn,
        }
    }
}

impl AttendanceRecord {
    pub fn is_open(&self) -> bool {
        RecordState::of(Some(self)) == RecordState::CheckedIn
    }
}

/// Row to insert; the id is assigned by the database.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendanceRecord {
    pub student_id: UserId,
    pub session_id: SessionId,
    pub check_in_time: DateTime<Utc>,
    pub method: AttendanceMethod,
    pub location: Option<GeoPoint>,
}

/// Fields written when a record is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutUpdate {
    pub check_out_time: DateTime<Utc>,
    pub method: AttendanceMethod,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    #[validate(ip)]
    pub ip: String,
}

impl CheckInRequest {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutRequest {
    pub session_id: SessionId,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    #[validate(ip)]
    pub ip: String,
}

impl CheckOutRequest {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManualCheckInRequest {
    pub student_id: UserId,
    pub session_id: SessionId,
}

/// The student's currently open record, if any.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSessionResponse {
    pub record_id: RecordId,
    pub session_id: SessionId,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub check_in_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceLogEntry {
    pub record_id: RecordId,
    pub session_id: SessionId,
    pub student_id: UserId,
    pub student_name: String,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub method: AttendanceMethod,
}

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct AttendanceLogsQuery {
    pub subject_id: SubjectId,
}
