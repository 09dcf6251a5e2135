use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::auth::assertion;
use crate::auth::error::TokenError;
use crate::auth::key_material::KeyMaterial;
use crate::auth::metadata::MetadataResolver;
use crate::observability::metrics::Metrics;
use crate::utils::constants::{CLIENT_ASSERTION_TYPE, TOKEN_SAFETY_MARGIN_SECS};
use crate::utils::time::now_i64;

/// Access token snapshot handed out to callers. Replaced wholesale on
/// refresh, never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub scope: String,
    /// Upstream-declared expiry minus the safety margin.
    pub expires_at: i64,
}

impl AccessToken {
    pub fn authorization_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: i64,
    #[serde(default)]
    scope: String,
}

/// Owns the single shared `AccessToken`. The whole check-expiry /
/// maybe-refresh / return sequence runs under one mutex, so concurrent
/// callers racing across an expiry boundary serialize on the refresh and
/// never observe a token assembled from two different exchanges.
pub struct TokenManager {
    key_material: Option<Arc<KeyMaterial>>,
    resolver: Arc<MetadataResolver>,
    client: Client,
    static_auth: Option<String>,
    current: Mutex<Option<AccessToken>>,
    metrics: Arc<Metrics>,
}

impl TokenManager {
    pub fn new(
        key_material: Option<Arc<KeyMaterial>>,
        resolver: Arc<MetadataResolver>,
        client: Client,
        static_auth: Option<String>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            key_material,
            resolver,
            client,
            static_auth,
            current: Mutex::new(None),
            metrics,
        }
    }

    /// Return the cached token while it is valid; otherwise perform exactly
    /// one exchange. On failure the state goes back to absent and the error
    /// propagates; the next caller's `acquire()` is the retry.
    pub async fn acquire(&self) -> Result<AccessToken, TokenError> {
        let mut current = self.current.lock().await;

        let now = now_i64();
        if let Some(token) = current.as_ref() {
            if now <= token.expires_at {
                return Ok(token.clone());
            }
            debug!("cached token expired at {}, refreshing", token.expires_at);
        }

        let result = match &self.static_auth {
            Some(value) => parse_static_auth(value),
            None => self.exchange().await,
        };

        match result {
            Ok(token) => {
                *current = Some(token.clone());
                Ok(token)
            }
            Err(err) => {
                *current = None;
                self.metrics
                    .token_exchange_failures
                    .with_label_values(&[err.reason()])
                    .inc();
                // A failed exchange may mean the cached endpoint is stale.
                if matches!(err, TokenError::Exchange(_) | TokenError::Transport(_)) {
                    self.resolver.force_refresh().await;
                }
                Err(err)
            }
        }
    }

    async fn exchange(&self) -> Result<AccessToken, TokenError> {
        let key_material = self.key_material.as_ref().ok_or_else(|| {
            TokenError::Exchange("no key material configured for the signed flow".to_owned())
        })?;

        let token_url = self.resolver.token_endpoint().await?;
        let signed = assertion::sign(key_material, &token_url)?;

        let form = [
            ("grant_type", "client_credentials"),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", signed.encoded.as_str()),
        ];
        debug!("requesting token from {}", token_url);
        self.metrics.token_exchanges.inc();

        let response = self
            .client
            .post(&token_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let parsed: Value = serde_json::from_str(&body).map_err(|_| {
            error!(
                "token response was not JSON (status {}), body: {}",
                status, body
            );
            TokenError::Exchange(format!("token response was not JSON (status {})", status))
        })?;

        if parsed.get("error").is_some() {
            error!("token endpoint returned an error: {}", parsed);
            return Err(TokenError::Exchange(
                parsed
                    .get("error_description")
                    .or_else(|| parsed.get("error"))
                    .and_then(Value::as_str)
                    .unwrap_or("token endpoint returned an error")
                    .to_owned(),
            ));
        }

        let token_response: TokenResponse = serde_json::from_value(parsed)
            .map_err(|e| TokenError::Exchange(format!("token response missing fields: {}", e)))?;

        info!("obtained access token, expires_in {}", token_response.expires_in);
        Ok(AccessToken {
            access_token: token_response.access_token,
            token_type: token_response.token_type,
            scope: token_response.scope,
            expires_at: now_i64() + token_response.expires_in - TOKEN_SAFETY_MARGIN_SECS,
        })
    }
}

/// Passthrough mode: build a synthetic non-expiring token out of the
/// configured `"{type} {token}"` value.
fn parse_static_auth(value: &str) -> Result<AccessToken, TokenError> {
    let mut parts = value.splitn(2, ' ');
    let token_type = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default();

    if token_type.is_empty() || token.is_empty() {
        error!("static_auth did not have a space in it; expected e.g. \"Bearer 1233445\"");
        return Err(TokenError::MalformedStaticAuth);
    }

    Ok(AccessToken {
        access_token: token.to_owned(),
        token_type: token_type.to_owned(),
        scope: "not applicable".to_owned(),
        expires_at: i64::MAX,
    })
}

#[cfg(test)]
mod test {
    use super::parse_static_auth;
    use crate::auth::error::TokenError;

    #[test]
    fn static_auth_splits_type_and_token() {
        let token = parse_static_auth("Bearer abc123").unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.access_token, "abc123");
        assert_eq!(token.authorization_value(), "Bearer abc123");
    }

    #[test]
    fn static_auth_without_space_is_rejected() {
        let err = parse_static_auth("Bearerabc123").unwrap_err();
        assert!(matches!(err, TokenError::MalformedStaticAuth));
    }
}
