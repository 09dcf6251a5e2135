//! Shared constants and invariants

/// SMART-on-FHIR extension carrying the OAuth endpoint URIs inside the
/// CapabilityStatement security block.
pub const SMART_OAUTH_URIS_EXTENSION: &str =
    "http://fhir-registry.smarthealthit.org/StructureDefinition/oauth-uris";

/// Nested extension url holding the token endpoint URI.
pub const SMART_TOKEN_EXTENSION: &str = "token";

pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Seconds subtracted from the upstream-declared expiry so a token is never
/// used right at its true boundary.
pub const TOKEN_SAFETY_MARGIN_SECS: i64 = 10;

/// Lifetime of a signed client assertion.
pub const ASSERTION_LIFETIME_SECS: i64 = 300;

pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_CACHE_SWEEP_SECS: u64 = 300;
