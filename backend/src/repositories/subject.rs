//! Subject and department lookups.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::subject::{Department, Subject};
use crate::types::SubjectId;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubjectRepositoryTrait: Send + Sync {
    async fn find_by_id(&self, id: SubjectId) -> Result<Option<Subject>, AppError>;

    /// Department owning the subject, i.e. the geofence center for its sessions.
    async fn find_department_for_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Option<Department>, AppError>;
}

#[derive(Debug, Clone)]
pub struct SubjectRepository {
    pool: PgPool,
}

impl SubjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubjectRepositoryTrait for SubjectRepository {
    async fn find_by_id(&self, id: SubjectId) -> Result<Option<Subject>, AppError> {
        let subject = sqlx::query_as::<_, Subject>(
            "SELECT id, name, department_id, semester_id, teacher_id FROM subjects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(subject)
    }

    async fn find_department_for_subject(
        &self,
        subject_id: SubjectId,
    ) -> Result<Option<Department>, AppError> {
        let department = sqlx::query_as::<_, Department>(
            r#"
            SELECT d.id, d.name, d.latitude, d.longitude
            FROM subjects s
            JOIN departments d ON d.id = s.department_id
            WHERE s.id = $1
            "#,
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(department)
    }
}
