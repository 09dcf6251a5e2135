use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::sync::watch;
use tracing::info;

use crate::auth::key_material::KeyMaterial;
use crate::auth::metadata::MetadataResolver;
use crate::auth::token_manager::TokenManager;
use crate::cache::resource_cache::ResourceCache;
use crate::config::settings::GatewayConfig;
use crate::observability::metrics::Metrics;
use crate::proxy::expansion::ExpansionTable;
use crate::proxy::forwarder::RequestForwarder;
use crate::server::routes;

/// Everything the handlers need, built once at startup. No globals: the
/// token manager and cache live here and are shared by `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<RequestForwarder>,
    pub cache: Arc<ResourceCache>,
    pub metrics: Arc<Metrics>,
    pub jwks_file: Option<String>,
}

impl AppState {
    pub fn build(config: &GatewayConfig, metrics: Arc<Metrics>) -> Result<Self> {
        let upstream = &config.upstream;

        let client = Client::builder()
            .timeout(Duration::from_millis(upstream.timeout_ms))
            .build()
            .context("building upstream HTTP client")?;

        let resolver = Arc::new(MetadataResolver::new(
            upstream.fhir_url.clone(),
            client.clone(),
        ));

        // Signed flow unless passthrough; passthrough with a static value
        // still goes through the manager so a malformed value surfaces as
        // an authorization failure instead of a bad header.
        let tokens = if upstream.passthrough {
            upstream.static_auth.clone().map(|static_auth| {
                Arc::new(TokenManager::new(
                    None,
                    resolver.clone(),
                    client.clone(),
                    Some(static_auth),
                    metrics.clone(),
                ))
            })
        } else {
            let key_material = Arc::new(KeyMaterial::load(upstream)?);
            Some(Arc::new(TokenManager::new(
                Some(key_material),
                resolver,
                client.clone(),
                None,
                metrics.clone(),
            )))
        };

        let cache = Arc::new(ResourceCache::new());
        let expansion = ExpansionTable::with_defaults(upstream.deploy_url.clone());

        let forwarder = Arc::new(RequestForwarder::new(
            upstream.fhir_url.clone(),
            client,
            tokens,
            cache.clone(),
            expansion,
            metrics.clone(),
        ));

        Ok(Self {
            forwarder,
            cache,
            metrics,
            jwks_file: upstream.jwks_file.clone(),
        })
    }
}

/// Bind and serve until ctrl-c, then signal the background workers.
pub async fn start(
    config: &GatewayConfig,
    state: AppState,
    shutdown_tx: watch::Sender<()>,
) -> Result<()> {
    let metrics = state.metrics.clone();
    let app = routes::router(state);

    let bind_addr = &config.server.host;
    let port = &config.server.port;
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind_addr, port))
        .await
        .with_context(|| format!("binding {}:{}", bind_addr, port))?;
    info!("listening on {}:{}", bind_addr, port);
    metrics.up.set(1);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(());
    Ok(())
}
