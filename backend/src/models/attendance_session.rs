//! Attendance sessions: a teacher-issued code bound to a subject for a short
//! validity window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::{SessionId, SubjectId, UserId};

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSession {
    pub id: SessionId,
    pub code: String,
    pub subject_id: SubjectId,
    pub teacher_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AttendanceSession {
    /// A session stops accepting check-ins at `expires_at` itself.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_owned_by(&self, teacher_id: UserId) -> bool {
        self.teacher_id == teacher_id
    }
}

/// Row to insert; the id is assigned by the database.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendanceSession {
    pub code: String,
    pub subject_id: SubjectId,
    pub teacher_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodeRequest {
    pub subject_id: SubjectId,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodeResponse {
    pub code: String,
    pub session_id: SessionId,
    pub expires_at: DateTime<Utc>,
}

impl From<AttendanceSession> for GenerateCodeResponse {
    fn from(session: AttendanceSession) -> Self {
        Self {
            code: session.code,
            session_id: session.id,
            expires_at: session.expires_at,
        }
    }
}
