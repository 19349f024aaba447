//! Attendance record persistence.
//!
//! The `(student_id, session_id)` unique constraint is the source of truth for
//! "one record per student and session"; a violating insert comes back as
//! `AppError::Conflict` (see `From<sqlx::Error> for AppError`).

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::attendance::{
    ActiveSessionResponse, AttendanceLogEntry, AttendanceRecord, CheckOutUpdate,
    NewAttendanceRecord,
};
use crate::types::{RecordId, SessionId, SubjectId, UserId};

const SELECT_COLUMNS: &str =
    "id, student_id, session_id, check_in_time, check_out_time, method, lat, lng";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttendanceRecordRepositoryTrait: Send + Sync {
    /// Inserts a record in one statement. A duplicate (student, session)
    /// surfaces as `AppError::Conflict`.
    async fn create(&self, item: &NewAttendanceRecord) -> Result<AttendanceRecord, AppError>;

    async fn find_by_student_and_session(
        &self,
        student_id: UserId,
        session_id: SessionId,
    ) -> Result<Option<AttendanceRecord>, AppError>;

    /// Closes the record if it is still open; `None` when it was already closed.
    async fn close(
        &self,
        id: RecordId,
        update: &CheckOutUpdate,
    ) -> Result<Option<AttendanceRecord>, AppError>;

    /// Most recent open record of the student, with its subject.
    async fn find_active_for_student(
        &self,
        student_id: UserId,
    ) -> Result<Option<ActiveSessionResponse>, AppError>;

    /// Records of every session of the subject.
    async fn list_for_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<AttendanceLogEntry>, AppError>;
}

#[derive(Debug, Clone)]
pub struct AttendanceRecordRepository {
    pool: PgPool,
}

impl AttendanceRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceRecordRepositoryTrait for AttendanceRecordRepository {
    async fn create(&self, item: &NewAttendanceRecord) -> Result<AttendanceRecord, AppError> {
        let query = format!(
            "INSERT INTO attendance_records (student_id, session_id, check_in_time, method, lat, lng) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {}",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(item.student_id)
            .bind(item.session_id)
            .bind(item.check_in_time)
            .bind(item.method.db_value())
            .bind(item.location.map(|p| p.lat))
            .bind(item.location.map(|p| p.lng))
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_student_and_session(
        &self,
        student_id: UserId,
        session_id: SessionId,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM attendance_records WHERE student_id = $1 AND session_id = $2",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(student_id)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn close(
        &self,
        id: RecordId,
        update: &CheckOutUpdate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let query = format!(
            "UPDATE attendance_records SET check_out_time = $2, method = $3, lat = $4, lng = $5 \
             WHERE id = $1 AND check_out_time IS NULL \
             RETURNING {}",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(id)
            .bind(update.check_out_time)
            .bind(update.method.db_value())
            .bind(update.location.lat)
            .bind(update.location.lng)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_active_for_student(
        &self,
        student_id: UserId,
    ) -> Result<Option<ActiveSessionResponse>, AppError> {
        let row = sqlx::query_as::<_, ActiveSessionResponse>(
            r#"
            SELECT r.id AS record_id, s.id AS session_id, sub.id AS subject_id,
                   sub.name AS subject_name, r.check_in_time
            FROM attendance_records r
            JOIN attendance_sessions s ON s.id = r.session_id
            JOIN subjects sub ON sub.id = s.subject_id
            WHERE r.student_id = $1 AND r.check_out_time IS NULL
            ORDER BY r.check_in_time DESC NULLS LAST, r.id DESC
            LIMIT 1
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_for_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<AttendanceLogEntry>, AppError> {
        let rows = sqlx::query_as::<_, AttendanceLogEntry>(
            r#"
            SELECT r.id AS record_id, r.session_id, r.student_id, u.name AS student_name,
                   r.check_in_time, r.check_out_time, r.method
            FROM attendance_records r
            JOIN attendance_sessions s ON s.id = r.session_id
            JOIN users u ON u.id = r.student_id
            WHERE s.subject_id = $1
            ORDER BY s.created_at DESC, r.check_in_time ASC NULLS LAST, r.id ASC
            "#,
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
