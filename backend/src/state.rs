use std::{sync::Arc, time::Duration};

use crate::{
    config::Config,
    db::connection::DbPool,
    repositories::{
        AttendanceRecordRepository, AttendanceRecordRepositoryTrait, SessionRepository,
        SessionRepositoryTrait, SubjectRepository, SubjectRepositoryTrait, UserRepository,
        UserRepositoryTrait,
    },
    services::{
        AttendanceService, IpApiProvider, IpIntelProvider, SessionCodeIssuer,
        SessionCodeSettings, SpoofGuard,
    },
};

/// Storage backends the services are wired against.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepositoryTrait>,
    pub subjects: Arc<dyn SubjectRepositoryTrait>,
    pub sessions: Arc<dyn SessionRepositoryTrait>,
    pub records: Arc<dyn AttendanceRecordRepositoryTrait>,
}

impl Repositories {
    pub fn postgres(pool: &DbPool) -> Self {
        let pool = pool.as_ref().clone();
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            subjects: Arc::new(SubjectRepository::new(pool.clone())),
            sessions: Arc::new(SessionRepository::new(pool.clone())),
            records: Arc::new(AttendanceRecordRepository::new(pool)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserRepositoryTrait>,
    pub attendance: AttendanceService,
    pub issuer: SessionCodeIssuer,
}

impl AppState {
    pub fn new(
        config: Config,
        repositories: Repositories,
        ip_intel: Arc<dyn IpIntelProvider>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let mut spoof_guard = SpoofGuard::new(
            ip_intel,
            config.ip_intel_failure_policy,
            Duration::from_millis(config.ip_intel_timeout_ms),
        );
        if config.ip_location_check_enabled {
            spoof_guard = spoof_guard.with_location_check(config.ip_location_max_divergence_meters);
        }

        let attendance = AttendanceService::new(
            repositories.sessions.clone(),
            repositories.subjects.clone(),
            repositories.records.clone(),
            repositories.users.clone(),
            spoof_guard,
            config.geofence_radius_meters,
        )?;
        let issuer = SessionCodeIssuer::new(
            repositories.sessions,
            repositories.subjects,
            SessionCodeSettings::from_config(&config),
        );

        Ok(Self {
            config,
            users: repositories.users,
            attendance,
            issuer,
        })
    }

    /// Production wiring: PostgreSQL repositories and the HTTP IP intel client.
    pub fn from_pool(pool: &DbPool, config: Config) -> anyhow::Result<Self> {
        let provider = IpApiProvider::new(
            &config.ip_intel_base_url,
            config.ip_intel_api_key.clone(),
            Duration::from_millis(config.ip_intel_timeout_ms),
        )?;
        Self::new(config, Repositories::postgres(pool), Arc::new(provider))
    }
}
