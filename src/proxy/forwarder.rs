use std::sync::Arc;

use reqwest::Client;
use tracing::{debug, error, info};

use crate::auth::token_manager::TokenManager;
use crate::cache::resource_cache::{cache_key, ResourceCache};
use crate::observability::metrics::Metrics;
use crate::proxy::expansion::ExpansionTable;
use crate::proxy::normalize::{classify, NormalizedResult};
use crate::proxy::outcome::{OperationOutcome, NOT_JSON_TEXT, TOKEN_FAILURE_TEXT};

/// Composition root for the routing layer: token acquisition, upstream call,
/// normalization and caching in one place.
pub struct RequestForwarder {
    base_url: String,
    client: Client,
    /// None in pure passthrough mode: forward with no authorization header.
    tokens: Option<Arc<TokenManager>>,
    cache: Arc<ResourceCache>,
    expansion: ExpansionTable,
    metrics: Arc<Metrics>,
}

impl RequestForwarder {
    pub fn new(
        base_url: String,
        client: Client,
        tokens: Option<Arc<TokenManager>>,
        cache: Arc<ResourceCache>,
        expansion: ExpansionTable,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            base_url,
            client,
            tokens,
            cache,
            expansion,
            metrics,
        }
    }

    /// Direct lookup. Cached by "{ResourceType}/{id}" (capitalized, so
    /// `/patient/1` and `/Patient/1` share one entry), including upstream
    /// error results, so a misbehaving resource cannot trigger a retry
    /// storm. Token failures are returned uncached: no upstream call was
    /// made and the next lookup re-attempts acquisition.
    pub async fn fetch_by_id(&self, resource_type: &str, id: &str) -> NormalizedResult {
        let resource_type = capitalize(resource_type);
        let key = cache_key(&resource_type, id);
        if let Some(hit) = self.cache.get(&key).await {
            debug!("cache hit for {}", key);
            self.metrics.cache_hits.inc();
            return hit;
        }
        self.metrics.cache_misses.inc();

        let authorization = match self.authorize(&resource_type).await {
            Ok(value) => value,
            Err(failure) => return failure,
        };

        let path = format!("{}/{}", resource_type, id);
        let result = self.forward(&resource_type, &path, authorization).await;

        self.cache.put(key, result.clone()).await;
        result
    }

    /// Parameterized search. Never cached: result sets depend on arbitrary
    /// query combinations and caching by raw query string risks unbounded
    /// key growth. The inbound query string goes upstream verbatim, still
    /// percent-encoded, so escaped values and repeated parameters survive.
    pub async fn search(&self, resource_type: &str, raw_query: Option<&str>) -> NormalizedResult {
        let resource_type = capitalize(resource_type);
        info!("Searching {} with query: {:?}", resource_type, raw_query);

        let authorization = match self.authorize(&resource_type).await {
            Ok(value) => value,
            Err(failure) => return failure,
        };

        let path_and_query = search_path(&resource_type, raw_query);
        self.forward(&resource_type, &path_and_query, authorization)
            .await
    }

    /// Resolve the authorization header for the upstream call. A token
    /// failure short-circuits into the authorization envelope before any
    /// upstream request is built.
    async fn authorize(&self, resource_type: &str) -> Result<Option<String>, NormalizedResult> {
        let Some(manager) = &self.tokens else {
            return Ok(None);
        };
        match manager.acquire().await {
            Ok(token) => Ok(Some(token.authorization_value())),
            Err(err) => {
                error!("could not obtain a token: {}", err);
                let result = NormalizedResult::AuthorizationFailure {
                    outcome: OperationOutcome::processing_error(TOKEN_FAILURE_TEXT),
                    status: 401,
                };
                self.record(resource_type, &result);
                Err(result)
            }
        }
    }

    async fn forward(
        &self,
        resource_type: &str,
        path_and_query: &str,
        authorization: Option<String>,
    ) -> NormalizedResult {
        let url = format!("{}{}", self.base_url, path_and_query);
        debug!("forwarding to {}", url);

        let mut request = self.client.get(&url).header("Accept", "application/json");
        if let Some(value) = authorization {
            request = request.header("Authorization", value);
        }

        let result = match request.send().await {
            Ok(response) => {
                let status = response.status();
                let www_authenticate = response
                    .headers()
                    .get("WWW-Authenticate")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned);

                match response.text().await {
                    Ok(body) => {
                        let normalized =
                            classify(resource_type, status, www_authenticate.as_deref(), &body);
                        match normalized {
                            NormalizedResult::Success { payload, status } => {
                                NormalizedResult::Success {
                                    payload: self.expansion.apply(resource_type, payload),
                                    status,
                                }
                            }
                            other => other,
                        }
                    }
                    Err(err) => {
                        error!("could not read upstream response body: {}", err);
                        NormalizedResult::TransportFailure {
                            outcome: OperationOutcome::processing_error(NOT_JSON_TEXT),
                            status: 502,
                        }
                    }
                }
            }
            // Connect errors and the client-level timeout land here; there
            // is no upstream status to mirror.
            Err(err) => {
                error!("upstream call to {} failed: {}", url, err);
                NormalizedResult::TransportFailure {
                    outcome: OperationOutcome::processing_error(format!(
                        "The upstream FHIR server could not be reached: {}",
                        err
                    )),
                    status: 502,
                }
            }
        };

        self.record(resource_type, &result);
        result
    }

    fn record(&self, resource_type: &str, result: &NormalizedResult) {
        self.metrics
            .upstream_requests
            .with_label_values(&[resource_type, result.outcome_label()])
            .inc();
    }
}

/// "{ResourceType}?{rawQuery}", the query handed through untouched.
fn search_path(resource_type: &str, raw_query: Option<&str>) -> String {
    match raw_query {
        Some(query) if !query.is_empty() => format!("{}?{}", resource_type, query),
        _ => resource_type.to_owned(),
    }
}

fn capitalize(resource_type: &str) -> String {
    let mut chars = resource_type.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod test {
    use super::{capitalize, search_path};

    #[test]
    fn search_path_keeps_the_raw_query_verbatim() {
        assert_eq!(
            search_path("Patient", Some("name=b%26evil%3D1")),
            "Patient?name=b%26evil%3D1"
        );
        assert_eq!(
            search_path("Observation", Some("date=ge2020&date=le2021")),
            "Observation?date=ge2020&date=le2021"
        );
    }

    #[test]
    fn search_path_without_query() {
        assert_eq!(search_path("Condition", None), "Condition");
        assert_eq!(search_path("Condition", Some("")), "Condition");
    }

    #[test]
    fn capitalize_leaves_camel_case_intact() {
        assert_eq!(capitalize("medicationRequest"), "MedicationRequest");
        assert_eq!(capitalize("Patient"), "Patient");
    }
}
