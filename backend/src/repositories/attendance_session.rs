//! Attendance session persistence.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::attendance_session::{AttendanceSession, NewAttendanceSession};
use crate::types::SessionId;

const SELECT_COLUMNS: &str = "id, code, subject_id, teacher_id, created_at, expires_at";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepositoryTrait: Send + Sync {
    /// Inserts a session. A code collision surfaces as `AppError::Conflict`.
    async fn create(&self, item: &NewAttendanceSession) -> Result<AttendanceSession, AppError>;

    async fn find_by_id(&self, id: SessionId) -> Result<Option<AttendanceSession>, AppError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<AttendanceSession>, AppError>;
}

#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepositoryTrait for SessionRepository {
    async fn create(&self, item: &NewAttendanceSession) -> Result<AttendanceSession, AppError> {
        let query = format!(
            "INSERT INTO attendance_sessions (code, subject_id, teacher_id, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {}",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(&item.code)
            .bind(item.subject_id)
            .bind(item.teacher_id)
            .bind(item.created_at)
            .bind(item.expires_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<AttendanceSession>, AppError> {
        let query = format!(
            "SELECT {} FROM attendance_sessions WHERE id = $1",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<AttendanceSession>, AppError> {
        let query = format!(
            "SELECT {} FROM attendance_sessions WHERE code = $1",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
