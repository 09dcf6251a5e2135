use axum::extract::{Path, RawQuery, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use http::header::CONTENT_TYPE;
use http::StatusCode;
use prometheus::{Encoder, TextEncoder};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::proxy::normalize::NormalizedResult;
use crate::proxy::outcome::{OperationOutcome, BASE_URL_TEXT};
use crate::server::server::AppState;
use tower_http::cors::{Any, CorsLayer};

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(return_root))
        .route("/health", get(return_health_check))
        .route("/favicon.ico", get(return_favicon))
        .route("/jwks", get(return_jwks))
        .route("/metrics", get(return_metrics))
        .route("/{resource_type}", get(search_resource))
        .route("/{resource_type}/{id}", get(fetch_resource))
        .layer(cors)
        .with_state(state)
}

async fn return_root() -> impl IntoResponse {
    info!("Retrieved root of API");
    Json(OperationOutcome::processing_error(BASE_URL_TEXT).to_value())
}

async fn return_health_check() -> impl IntoResponse {
    Json(json!({"status": "FHIR gateway is ready to receive requests"}))
}

async fn return_favicon() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

/// Serve the JWKS document for upstream client registration.
async fn return_jwks(State(state): State<AppState>) -> impl IntoResponse {
    let Some(path) = state.jwks_file else {
        return not_found("no JWKS document is configured");
    };

    match tokio::fs::read_to_string(&path).await {
        Ok(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(jwks) => (StatusCode::OK, Json(jwks)),
            Err(err) => {
                error!("JWKS file {} is not valid JSON: {}", path, err);
                not_found("the configured JWKS document is not valid JSON")
            }
        },
        Err(err) => {
            error!("could not read JWKS file {}: {}", path, err);
            not_found("the configured JWKS document could not be read")
        }
    }
}

async fn return_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry.gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");

    let response = String::from_utf8(buffer).expect("Failed to convert bytes to string");
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        response,
    )
}

/// GET /{resourceType}/{id}
async fn fetch_resource(
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
) -> impl IntoResponse {
    let result = state.forwarder.fetch_by_id(&resource_type, &id).await;
    render(result)
}

/// GET /{resourceType}?{searchParams}. The raw query string is handed to
/// the forwarder still encoded, never decoded and rebuilt.
async fn search_resource(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let result = state.forwarder.search(&resource_type, query.as_deref()).await;
    render(result)
}

/// Mirror the upstream status on the wire and hand the normalized body
/// through unchanged.
fn render(result: NormalizedResult) -> (StatusCode, Json<Value>) {
    let status = StatusCode::from_u16(result.status()).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(result.body()))
}

fn not_found(text: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(OperationOutcome::processing_error(text).to_value()),
    )
}
