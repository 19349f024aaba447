//! Issues short-lived attendance codes.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::{
    config::Config,
    error::{AppError, AttendanceError},
    models::{
        attendance_session::{AttendanceSession, NewAttendanceSession},
        user::{User, UserRole},
    },
    repositories::{SessionRepositoryTrait, SubjectRepositoryTrait},
    types::SubjectId,
};

/// Uppercase base36.
pub const CODE_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

type CodeGenerator = Arc<dyn Fn(usize) -> String + Send + Sync>;

/// Draws `len` characters uniformly from [`CODE_ALPHABET`].
pub fn random_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCodeSettings {
    pub code_length: usize,
    pub validity: Duration,
    pub max_attempts: u32,
}

impl SessionCodeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            code_length: config.session_code_length,
            validity: Duration::minutes(config.session_code_ttl_minutes),
            max_attempts: config.session_code_max_attempts,
        }
    }
}

impl Default for SessionCodeSettings {
    fn default() -> Self {
        Self {
            code_length: 8,
            validity: Duration::minutes(10),
            max_attempts: 5,
        }
    }
}

#[derive(Clone)]
pub struct SessionCodeIssuer {
    sessions: Arc<dyn SessionRepositoryTrait>,
    subjects: Arc<dyn SubjectRepositoryTrait>,
    settings: SessionCodeSettings,
    generate: CodeGenerator,
}

impl SessionCodeIssuer {
    pub fn new(
        sessions: Arc<dyn SessionRepositoryTrait>,
        subjects: Arc<dyn SubjectRepositoryTrait>,
        settings: SessionCodeSettings,
    ) -> Self {
        Self::with_generator(sessions, subjects, settings, random_code)
    }

    /// Same as [`SessionCodeIssuer::new`] with a custom code source.
    pub fn with_generator<F>(
        sessions: Arc<dyn SessionRepositoryTrait>,
        subjects: Arc<dyn SubjectRepositoryTrait>,
        settings: SessionCodeSettings,
        generate: F,
    ) -> Self
    where
        F: Fn(usize) -> String + Send + Sync + 'static,
    {
        Self {
            sessions,
            subjects,
            settings,
            generate: Arc::new(generate),
        }
    }

    /// Creates a session for `subject_id` that accepts check-ins until
    /// `now + validity`.
    ///
    /// Codes are unique across all sessions, expired ones included. A code
    /// collision on insert is retried with a fresh code up to
    /// `max_attempts` times.
    pub async fn issue_code(
        &self,
        caller: &User,
        subject_id: SubjectId,
        now: DateTime<Utc>,
    ) -> Result<AttendanceSession, AttendanceError> {
        match caller.role {
            UserRole::Teacher => {}
            UserRole::Admin | UserRole::Student => {
                return Err(AttendanceError::Unauthorized(
                    "Only teachers can generate attendance codes".into(),
                ));
            }
        }

        self.subjects
            .find_by_id(subject_id)
            .await?
            .ok_or_else(|| AttendanceError::NotFound("Subject not found".into()))?;

        let expires_at = now + self.settings.validity;
        for attempt in 1..=self.settings.max_attempts {
            let candidate = NewAttendanceSession {
                code: (self.generate)(self.settings.code_length),
                subject_id,
                teacher_id: caller.id,
                created_at: now,
                expires_at,
            };

            match self.sessions.create(&candidate).await {
                Ok(session) => {
                    tracing::info!(
                        session_id = %session.id,
                        subject_id = %subject_id,
                        teacher_id = %caller.id,
                        expires_at = %session.expires_at,
                        attempt,
                        "Attendance session created"
                    );
                    return Ok(session);
                }
                Err(AppError::Conflict(_)) => {
                    tracing::debug!(attempt, "Attendance code collision, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        tracing::error!(
            subject_id = %subject_id,
            attempts = self.settings.max_attempts,
            "Could not generate a unique attendance code"
        );
        Err(AttendanceError::CodeSpaceExhausted {
            attempts: self.settings.max_attempts,
        })
    }
}
