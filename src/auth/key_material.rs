use std::fs;

use anyhow::{Context, Result};
use jsonwebtoken::EncodingKey;

use crate::config::settings::UpstreamConfig;

/// Client identifier plus the RSA private signing key, read once at process
/// start and shared read-only for the process lifetime.
pub struct KeyMaterial {
    pub client_id: String,
    key: EncodingKey,
}

impl KeyMaterial {
    /// Load from config: inline PEM wins, otherwise the key file is read.
    /// A malformed key is fatal here; there is no point starting a gateway
    /// that can never sign an assertion.
    pub fn load(upstream: &UpstreamConfig) -> Result<Self> {
        let pem = match (&upstream.private_key, &upstream.private_key_file) {
            (Some(inline), _) => inline.clone(),
            (None, Some(path)) => fs::read_to_string(path)
                .with_context(|| format!("reading private key file {}", path))?,
            (None, None) => anyhow::bail!("no private key configured"),
        };

        let key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .context("private key is not a valid RSA PEM")?;

        Ok(Self {
            client_id: upstream.client_id.clone(),
            key,
        })
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.key
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key bytes.
        f.debug_struct("KeyMaterial")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}
