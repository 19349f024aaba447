//! User lookups needed by authentication and manual check-in.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::user::User;
use crate::types::UserId;

/// Repository trait for User operations.
///
/// Use `MockUserRepositoryTrait` in unit tests to mock the behavior.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    /// Find a user by ID
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AppError>;
}

/// PostgreSQL implementation of [`UserRepositoryTrait`].
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, LOWER(role) AS role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
