// End-to-end over the axum routes: inbound request -> forwarder -> mock
// upstream, with the wire status mirrored from the upstream response.

#[cfg(test)]
mod test {
    use std::io::Write;

    use httpmock::prelude::*;
    use serde_json::json;
    use tempfile::NamedTempFile;

    use crate::config::settings::{CacheConfig, GatewayConfig, ServerConfig};
    use crate::observability::metrics::Metrics;
    use crate::proxy::outcome::BASE_URL_TEXT;
    use crate::server::server::AppState;
    use crate::tests::common::{build_client, spawn_router, test_upstream_config};

    fn passthrough_config(base_url: &str, jwks_file: Option<String>) -> GatewayConfig {
        let mut upstream = test_upstream_config(base_url);
        upstream.passthrough = true;
        upstream.private_key = None;
        upstream.jwks_file = jwks_file;

        GatewayConfig {
            upstream,
            server: ServerConfig {
                host: "127.0.0.1".to_owned(),
                port: "0".to_owned(),
            },
            cache: CacheConfig::default(),
            logging: None,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn resource_routes_mirror_the_upstream_status() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/Patient/123");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"resourceType": "Patient", "id": "123"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/Patient/nope");
            then.status(404)
                .header("content-type", "application/json")
                .json_body(json!({
                    "resourceType": "OperationOutcome",
                    "issue": [{"severity": "error", "code": "not-found", "diagnostics": "no such patient"}]
                }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/Patient").query_param("family", "Smith");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"resourceType": "Bundle", "type": "searchset"}));
        });

        let config = passthrough_config(&server.base_url(), None);
        let state = AppState::build(&config, Metrics::new()).unwrap();
        let (handle, addr) = spawn_router(state).await;
        let client = build_client();

        let found = client
            .get(format!("http://{}/Patient/123", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(found.status(), 200);
        let body: serde_json::Value = found.json().await.unwrap();
        assert_eq!(body["resourceType"], "Patient");

        let missing = client
            .get(format!("http://{}/Patient/nope", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), 404);
        let body: serde_json::Value = missing.json().await.unwrap();
        assert_eq!(body["resourceType"], "OperationOutcome");
        assert_eq!(body["issue"][0]["code"], "not-found");

        let bundle = client
            .get(format!("http://{}/Patient?family=Smith", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(bundle.status(), 200);
        let body: serde_json::Value = bundle.json().await.unwrap();
        assert_eq!(body["type"], "searchset");

        handle.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn service_routes_answer_locally() {
        let server = MockServer::start_async().await;

        let mut jwks_file = NamedTempFile::new().unwrap();
        jwks_file
            .write_all(json!({"keys": [{"kid": "k1", "kty": "RSA", "n": "abc", "e": "AQAB"}]}).to_string().as_bytes())
            .unwrap();

        let config = passthrough_config(
            &server.base_url(),
            Some(jwks_file.path().to_string_lossy().into_owned()),
        );
        let state = AppState::build(&config, Metrics::new()).unwrap();
        let (handle, addr) = spawn_router(state).await;
        let client = build_client();

        let health = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(health.status(), 200);
        let body: serde_json::Value = health.json().await.unwrap();
        assert!(body["status"].as_str().unwrap().contains("ready"));

        let root = client.get(format!("http://{}/", addr)).send().await.unwrap();
        assert_eq!(root.status(), 200);
        let body: serde_json::Value = root.json().await.unwrap();
        assert_eq!(body["issue"][0]["diagnostics"], BASE_URL_TEXT);

        let jwks = client
            .get(format!("http://{}/jwks", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(jwks.status(), 200);
        let body: serde_json::Value = jwks.json().await.unwrap();
        assert_eq!(body["keys"][0]["kid"], "k1");

        let metrics = client
            .get(format!("http://{}/metrics", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(metrics.status(), 200);
        let text = metrics.text().await.unwrap();
        assert!(text.contains("fhirgateway_up"));

        handle.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn jwks_route_without_configured_file_is_not_found() {
        let server = MockServer::start_async().await;
        let config = passthrough_config(&server.base_url(), None);
        let state = AppState::build(&config, Metrics::new()).unwrap();
        let (handle, addr) = spawn_router(state).await;

        let jwks = build_client()
            .get(format!("http://{}/jwks", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(jwks.status(), 404);

        handle.abort();
    }
}
