use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};
use std::{env, net::SocketAddr, str::FromStr};

/// Accepted geofence radius range in meters. Values outside it are treated as
/// a misconfiguration and refuse startup.
pub const GEOFENCE_RADIUS_RANGE: std::ops::RangeInclusive<f64> = 10.0..=5_000.0;

/// What to do when the IP intelligence service cannot give an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpIntelFailurePolicy {
    /// Reject the attendance event with a service-unavailable error.
    #[default]
    FailClosed,
    /// Log the failure and treat the address as clean.
    FailOpen,
}

impl FromStr for IpIntelFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail_closed" | "closed" => Ok(Self::FailClosed),
            "fail_open" | "open" => Ok(Self::FailOpen),
            other => Err(anyhow!("Invalid IP_INTEL_FAILURE_POLICY value: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub cors_allow_origins: Vec<String>,
    pub geofence_radius_meters: f64,
    pub session_code_ttl_minutes: i64,
    pub session_code_length: usize,
    pub session_code_max_attempts: u32,
    pub ip_intel_base_url: String,
    pub ip_intel_api_key: Option<String>,
    pub ip_intel_timeout_ms: u64,
    pub ip_intel_failure_policy: IpIntelFailurePolicy,
    pub ip_location_check_enabled: bool,
    pub ip_location_max_divergence_meters: f64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/geoattend".to_string());

        let bind_addr = env_or("BIND_ADDR", "0.0.0.0:3000")
            .parse()
            .map_err(|e| anyhow!("Invalid BIND_ADDR value: {}", e))?;

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-this-in-production".to_string());

        let cors_allow_origins = env_or("CORS_ALLOW_ORIGINS", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let config = Config {
            database_url,
            bind_addr,
            jwt_secret,
            cors_allow_origins,
            geofence_radius_meters: parse_env("GEOFENCE_RADIUS_METERS", 200.0)?,
            session_code_ttl_minutes: parse_env("SESSION_CODE_TTL_MINUTES", 10)?,
            session_code_length: parse_env("SESSION_CODE_LENGTH", 8)?,
            session_code_max_attempts: parse_env("SESSION_CODE_MAX_ATTEMPTS", 5)?,
            ip_intel_base_url: env_or("IP_INTEL_BASE_URL", "https://ipapi.co"),
            ip_intel_api_key: env::var("IP_INTEL_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            ip_intel_timeout_ms: parse_env("IP_INTEL_TIMEOUT_MS", 3_000)?,
            ip_intel_failure_policy: env_or("IP_INTEL_FAILURE_POLICY", "fail_closed").parse()?,
            ip_location_check_enabled: parse_bool("IP_LOCATION_CHECK_ENABLED", false)?,
            ip_location_max_divergence_meters: parse_env(
                "IP_LOCATION_MAX_DIVERGENCE_METERS",
                10_000.0,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would silently disable or break attendance checks.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !GEOFENCE_RADIUS_RANGE.contains(&self.geofence_radius_meters) {
            bail!(
                "GEOFENCE_RADIUS_METERS must be within {}..={} meters, got {}",
                GEOFENCE_RADIUS_RANGE.start(),
                GEOFENCE_RADIUS_RANGE.end(),
                self.geofence_radius_meters
            );
        }
        if !(1..=240).contains(&self.session_code_ttl_minutes) {
            bail!(
                "SESSION_CODE_TTL_MINUTES must be within 1..=240, got {}",
                self.session_code_ttl_minutes
            );
        }
        if !(6..=12).contains(&self.session_code_length) {
            bail!(
                "SESSION_CODE_LENGTH must be within 6..=12, got {}",
                self.session_code_length
            );
        }
        if self.session_code_max_attempts == 0 {
            bail!("SESSION_CODE_MAX_ATTEMPTS must be at least 1");
        }
        if self.ip_intel_timeout_ms == 0 {
            bail!("IP_INTEL_TIMEOUT_MS must be positive");
        }
        if !(self.ip_location_max_divergence_meters.is_finite()
            && self.ip_location_max_divergence_meters > 0.0)
        {
            bail!("IP_LOCATION_MAX_DIVERGENCE_METERS must be a positive number");
        }
        url::Url::parse(&self.ip_intel_base_url)
            .map_err(|e| anyhow!("Invalid IP_INTEL_BASE_URL value: {}", e))?;
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {} value {:?}: {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

fn parse_bool(key: &str, default: bool) -> anyhow::Result<bool> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(anyhow!("Invalid {} value: {}", key, other)),
        },
        Err(_) => Ok(default),
    }
}
