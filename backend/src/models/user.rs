//! Models that represent users and their roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::UserId;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
/// Database representation of a user account.
pub struct User {
    pub id: UserId,
    /// Human-readable full name.
    pub name: String,
    pub email: String,
    /// Role describing what the user is allowed to do.
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
/// Closed set of roles stored in the database.
pub enum UserRole {
    Admin,
    Teacher,
    Student,
}

impl UserRole {
    /// Returns the canonical snake_case representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" | "Admin" | "ADMIN" => Some(UserRole::Admin),
            "teacher" | "Teacher" | "TEACHER" => Some(UserRole::Teacher),
            "student" | "Student" | "STUDENT" => Some(UserRole::Student),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for UserRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        // tolerate the upper-case spelling used by older clients
        UserRole::parse(&s).ok_or_else(|| {
            serde::de::Error::unknown_variant(&s, &["admin", "teacher", "student"])
        })
    }
}
