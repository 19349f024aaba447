//! Anti-spoofing checks backed by an external IP intelligence service.
//!
//! [`IpIntelProvider`] performs a single lookup per call (no caching).
//! [`SpoofGuard`] wraps a provider with a timeout and the configured
//! failure policy, and turns the answer into attendance rejections.

use std::{net::IpAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::{config::IpIntelFailurePolicy, error::AttendanceError, services::geo::GeoPoint};

/// What the IP intelligence service reported about an address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IpIntel {
    pub vpn: bool,
    pub proxy: bool,
    pub tor: bool,
    /// Approximate location of the address, when the service reports one.
    pub location: Option<GeoPoint>,
}

impl IpIntel {
    pub fn is_anonymized(&self) -> bool {
        self.vpn || self.proxy || self.tor
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IpIntelError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("service responded with HTTP {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("service rejected lookup: {0}")]
    Rejected(String),
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IpIntelProvider: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> Result<IpIntel, IpIntelError>;
}

/// Client for ipapi.co-compatible services (`GET {base}/{ip}/json/?key=..`).
#[derive(Debug, Clone)]
pub struct IpApiProvider {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
    timeout: Duration,
}

impl IpApiProvider {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("IP intelligence base URL cannot be a base: {}", base_url);
        }
        let client = reqwest::Client::builder()
            .user_agent("geoattend-backend/1.0")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
            timeout,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> IpIntelError {
        if err.is_timeout() {
            IpIntelError::Timeout(self.timeout)
        } else {
            IpIntelError::Transport(err.to_string())
        }
    }

    fn lookup_url(&self, ip: IpAddr) -> Result<Url, IpIntelError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| IpIntelError::Transport("base URL cannot carry a path".into()))?
            .pop_if_empty()
            .push(&ip.to_string())
            .push("json")
            .push("");
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(url)
    }
}

#[async_trait]
impl IpIntelProvider for IpApiProvider {
    async fn lookup(&self, ip: IpAddr) -> Result<IpIntel, IpIntelError> {
        let url = self.lookup_url(ip)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IpIntelError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;
        parse_payload(&body)
    }
}

#[derive(Debug, Deserialize)]
struct IpApiPayload {
    #[serde(default)]
    error: Option<bool>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    vpn: Option<bool>,
    #[serde(default)]
    proxy: Option<bool>,
    #[serde(default)]
    tor: Option<bool>,
    /// Some providers nest the anonymizer flags.
    #[serde(default)]
    security: Option<SecurityFlags>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct SecurityFlags {
    #[serde(default)]
    vpn: Option<bool>,
    #[serde(default)]
    proxy: Option<bool>,
    #[serde(default)]
    tor: Option<bool>,
}

/// Decodes a provider response body.
pub fn parse_payload(body: &str) -> Result<IpIntel, IpIntelError> {
    let payload: IpApiPayload =
        serde_json::from_str(body).map_err(|e| IpIntelError::Malformed(e.to_string()))?;

    if payload.error.unwrap_or(false) {
        return Err(IpIntelError::Rejected(
            payload.reason.unwrap_or_else(|| "unknown reason".to_string()),
        ));
    }

    let security = payload.security.unwrap_or_default();
    let flag = |top: Option<bool>, nested: Option<bool>| top.or(nested).unwrap_or(false);

    let location = match (payload.latitude, payload.longitude) {
        (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
            Some(GeoPoint::new(lat, lng))
        }
        _ => None,
    };

    Ok(IpIntel {
        vpn: flag(payload.vpn, security.vpn),
        proxy: flag(payload.proxy, security.proxy),
        tor: flag(payload.tor, security.tor),
        location,
    })
}

/// Applies timeout, failure policy and the optional location cross-check.
#[derive(Clone)]
pub struct SpoofGuard {
    provider: Arc<dyn IpIntelProvider>,
    policy: IpIntelFailurePolicy,
    timeout: Duration,
    max_location_divergence_m: Option<f64>,
}

impl SpoofGuard {
    pub fn new(
        provider: Arc<dyn IpIntelProvider>,
        policy: IpIntelFailurePolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            policy,
            timeout,
            max_location_divergence_m: None,
        }
    }

    /// Enables rejecting events whose IP location is farther than
    /// `max_divergence_m` from the device-reported location.
    pub fn with_location_check(mut self, max_divergence_m: f64) -> Self {
        self.max_location_divergence_m = Some(max_divergence_m);
        self
    }

    /// True when the service flags the address as VPN, proxy or Tor.
    pub async fn is_suspicious(&self, ip: &str) -> Result<bool, AttendanceError> {
        let intel = self.lookup(parse_ip(ip)?).await?;
        Ok(intel.is_some_and(|intel| intel.is_anonymized()))
    }

    /// Rejects the event if the address is anonymized or, with the location
    /// check enabled, reported too far away from the device.
    pub async fn assess(&self, ip: &str, device: GeoPoint) -> Result<(), AttendanceError> {
        let addr = parse_ip(ip)?;
        let Some(intel) = self.lookup(addr).await? else {
            return Ok(());
        };

        if intel.is_anonymized() {
            tracing::info!(
                ip = %addr,
                vpn = intel.vpn,
                proxy = intel.proxy,
                tor = intel.tor,
                "Anonymizing network detected"
            );
            return Err(AttendanceError::VpnDetected);
        }

        if let (Some(limit), Some(ip_location)) = (self.max_location_divergence_m, intel.location)
        {
            let distance_m = ip_location.distance_to(&device);
            if distance_m > limit {
                tracing::info!(
                    ip = %addr,
                    distance_m,
                    limit_m = limit,
                    "IP location diverges from device location"
                );
                return Err(AttendanceError::LocationMismatch { distance_m });
            }
        }

        Ok(())
    }

    /// `Ok(None)` means the lookup failed and the policy lets the event through.
    async fn lookup(&self, addr: IpAddr) -> Result<Option<IpIntel>, AttendanceError> {
        let result = match tokio::time::timeout(self.timeout, self.provider.lookup(addr)).await {
            Ok(result) => result,
            Err(_) => Err(IpIntelError::Timeout(self.timeout)),
        };

        match result {
            Ok(intel) => Ok(Some(intel)),
            Err(err) => match self.policy {
                IpIntelFailurePolicy::FailOpen => {
                    tracing::warn!(ip = %addr, error = %err, "IP intelligence lookup failed, allowing (fail-open)");
                    Ok(None)
                }
                IpIntelFailurePolicy::FailClosed => {
                    tracing::warn!(ip = %addr, error = %err, "IP intelligence lookup failed, rejecting (fail-closed)");
                    Err(AttendanceError::ExternalService(err.to_string()))
                }
            },
        }
    }
}

fn parse_ip(ip: &str) -> Result<IpAddr, AttendanceError> {
    ip.trim()
        .parse()
        .map_err(|_| AttendanceError::Validation(format!("Invalid IP address: {}", ip)))
}
