use std::fs;
use std::path::Path;

use anyhow::{bail, Result};

use crate::config::settings::GatewayConfig;

/// Load and validate config from YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GatewayConfig> {
    let raw = fs::read_to_string(path)?;
    let mut config: GatewayConfig = serde_yaml::from_str(&raw)?;

    // Upstream calls are built as `{fhir_url}{ResourceType}/{id}`.
    if !config.upstream.fhir_url.ends_with('/') {
        config.upstream.fhir_url.push('/');
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &GatewayConfig) -> Result<()> {
    let upstream = &config.upstream;

    if upstream.fhir_url == "/" {
        bail!("upstream.fhir_url must not be empty");
    }
    if upstream.client_id.is_empty() {
        bail!("upstream.client_id must not be empty");
    }

    if upstream.static_auth.is_some() && !upstream.passthrough {
        bail!("upstream.static_auth requires upstream.passthrough: true");
    }

    // Passthrough mode needs no key material; the signed flow needs exactly
    // one key source.
    if !upstream.passthrough {
        match (&upstream.private_key, &upstream.private_key_file) {
            (None, None) => {
                bail!("one of upstream.private_key or upstream.private_key_file is required")
            }
            (Some(_), Some(_)) => {
                bail!("upstream.private_key and upstream.private_key_file are mutually exclusive")
            }
            _ => {}
        }
    }

    if config.cache.sweep_interval_seconds == 0 {
        bail!("cache.sweep_interval_seconds must be greater than zero");
    }
    if let Some(negative) = config.cache.negative_sweep_interval_seconds {
        if negative == 0 || negative > config.cache.sweep_interval_seconds {
            bail!("cache.negative_sweep_interval_seconds must be within (0, sweep_interval_seconds]");
        }
    }

    Ok(())
}
