use serde::Deserialize;

use crate::utils::constants::{DEFAULT_CACHE_SWEEP_SECS, DEFAULT_UPSTREAM_TIMEOUT_MS};

/// ================================
/// Service-wide configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub upstream: UpstreamConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub logging: Option<LoggingConfig>,
}

/// Everything needed to talk to the upstream FHIR server.
#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the upstream FHIR server. Normalized to a trailing '/'.
    pub fhir_url: String,
    pub client_id: String,
    /// Scope the client was registered with. Kept for the registration
    /// surface; the exchange body itself carries only the assertion fields.
    pub scope: String,
    /// Private signing key as inline PEM. Exactly one of `private_key` /
    /// `private_key_file` must be set unless `static_auth` is used.
    pub private_key: Option<String>,
    pub private_key_file: Option<String>,
    /// Passthrough mode bypasses the token lifecycle entirely: requests are
    /// forwarded with `static_auth` as the authorization value, or with no
    /// authorization header at all when `static_auth` is unset.
    #[serde(default)]
    pub passthrough: bool,
    /// Statically configured authorization value, e.g. "Bearer abc123".
    pub static_auth: Option<String>,
    /// JWKS document served at /jwks for upstream client registration.
    pub jwks_file: Option<String>,
    /// Public URL this gateway is deployed at; used when expanding
    /// resource references so consumers come back through the gateway.
    pub deploy_url: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Interval of the full-clear sweep.
    #[serde(default = "default_sweep_seconds")]
    pub sweep_interval_seconds: u64,
    /// Optional shorter cadence for clearing cached error results only.
    pub negative_sweep_interval_seconds: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval_seconds: DEFAULT_CACHE_SWEEP_SECS,
            negative_sweep_interval_seconds: None,
        }
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT_MS
}

fn default_sweep_seconds() -> u64 {
    DEFAULT_CACHE_SWEEP_SECS
}
