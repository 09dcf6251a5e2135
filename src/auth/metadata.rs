use reqwest::Client;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::auth::error::TokenError;
use crate::utils::constants::{SMART_OAUTH_URIS_EXTENSION, SMART_TOKEN_EXTENSION};
use crate::utils::time::now_i64;

/// Token endpoint location extracted from the upstream capability statement.
#[derive(Debug, Clone)]
pub struct UpstreamMetadata {
    pub token_endpoint: String,
    pub fetched_at: i64,
}

/// Fetches the upstream `/metadata` document once and caches the token
/// endpoint for the process lifetime. Invalidated only via `force_refresh`
/// when a metadata fetch or token exchange fails outright.
pub struct MetadataResolver {
    base_url: String,
    client: Client,
    cached: RwLock<Option<UpstreamMetadata>>,
}

impl MetadataResolver {
    pub fn new(base_url: String, client: Client) -> Self {
        Self {
            base_url,
            client,
            cached: RwLock::new(None),
        }
    }

    /// Resolve the token endpoint URL, fetching the capability statement on
    /// first use.
    pub async fn token_endpoint(&self) -> Result<String, TokenError> {
        if let Some(meta) = self.cached.read().await.as_ref() {
            return Ok(meta.token_endpoint.clone());
        }

        let token_endpoint = self.fetch_token_endpoint().await?;
        info!("found token endpoint {}", token_endpoint);

        let mut cached = self.cached.write().await;
        *cached = Some(UpstreamMetadata {
            token_endpoint: token_endpoint.clone(),
            fetched_at: now_i64(),
        });

        Ok(token_endpoint)
    }

    /// Drop the cached endpoint so the next call re-fetches the document.
    pub async fn force_refresh(&self) {
        let mut cached = self.cached.write().await;
        *cached = None;
    }

    async fn fetch_token_endpoint(&self) -> Result<String, TokenError> {
        let url = format!("{}metadata", self.base_url);
        debug!("fetching capability statement from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| TokenError::MetadataUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TokenError::MetadataUnavailable(format!(
                "capability statement request returned {}",
                response.status()
            )));
        }

        let document: Value = response
            .json()
            .await
            .map_err(|e| TokenError::MetadataUnavailable(format!("capability statement was not JSON: {}", e)))?;

        extract_token_endpoint(&document)
    }
}

/// Walk `rest[0].security.extension` for the SMART oauth-uris extension and
/// pull the nested "token" extension's valueUri.
fn extract_token_endpoint(document: &Value) -> Result<String, TokenError> {
    let security_extensions = document
        .get("rest")
        .and_then(|rest| rest.get(0))
        .and_then(|entry| entry.get("security"))
        .and_then(|security| security.get("extension"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            TokenError::MetadataUnavailable(
                "capability statement has no rest[0].security.extension block".to_owned(),
            )
        })?;

    let oauth_uris = security_extensions
        .iter()
        .find(|ext| ext.get("url").and_then(Value::as_str) == Some(SMART_OAUTH_URIS_EXTENSION))
        .and_then(|ext| ext.get("extension"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            TokenError::MetadataUnavailable(format!(
                "capability statement is missing the {} extension",
                SMART_OAUTH_URIS_EXTENSION
            ))
        })?;

    oauth_uris
        .iter()
        .find(|ext| ext.get("url").and_then(Value::as_str) == Some(SMART_TOKEN_EXTENSION))
        .and_then(|ext| ext.get("valueUri"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| {
            TokenError::MetadataUnavailable(
                "oauth-uris extension carries no token valueUri".to_owned(),
            )
        })
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::extract_token_endpoint;
    use crate::auth::error::TokenError;

    fn capability_statement(token_url: &str) -> serde_json::Value {
        json!({
            "resourceType": "CapabilityStatement",
            "rest": [{
                "mode": "server",
                "security": {
                    "extension": [{
                        "url": "http://fhir-registry.smarthealthit.org/StructureDefinition/oauth-uris",
                        "extension": [
                            {"url": "authorize", "valueUri": "https://auth.example.com/authorize"},
                            {"url": "token", "valueUri": token_url}
                        ]
                    }]
                }
            }]
        })
    }

    #[test]
    fn extracts_token_uri_from_smart_extension() {
        let doc = capability_statement("https://auth.example.com/token");
        let endpoint = extract_token_endpoint(&doc).unwrap();
        assert_eq!(endpoint, "https://auth.example.com/token");
    }

    #[test]
    fn missing_extension_is_metadata_unavailable() {
        let doc = json!({"resourceType": "CapabilityStatement", "rest": [{"security": {"extension": []}}]});
        let err = extract_token_endpoint(&doc).unwrap_err();
        assert!(matches!(err, TokenError::MetadataUnavailable(_)));
    }

    #[test]
    fn missing_security_block_is_metadata_unavailable() {
        let doc = json!({"resourceType": "CapabilityStatement"});
        let err = extract_token_endpoint(&doc).unwrap_err();
        assert!(matches!(err, TokenError::MetadataUnavailable(_)));
    }
}
