use std::sync::Arc;

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

/// Gateway metrics. Built once at startup and shared by `Arc`; the registry
/// is exposed at /metrics.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Upstream forwarding
    pub upstream_requests: IntCounterVec,

    // Token lifecycle
    pub token_exchanges: IntCounter,
    pub token_exchange_failures: IntCounterVec,

    // Resource cache
    pub cache_hits: IntCounter,
    pub cache_misses: IntCounter,

    pub up: IntGauge,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("fhirgateway".into()), None).unwrap();

        let metrics = Arc::new(Self {
            upstream_requests: IntCounterVec::new(
                Opts::new("upstream_requests_total", "Forwarded upstream calls by resource type and outcome"),
                &["resource_type", "outcome"],
            )
            .unwrap(),
            token_exchanges: IntCounter::new("token_exchanges_total", "Token exchange attempts").unwrap(),
            token_exchange_failures: IntCounterVec::new(
                Opts::new("token_exchange_failures_total", "Token acquisition failures by reason"),
                &["reason"],
            )
            .unwrap(),
            cache_hits: IntCounter::new("resource_cache_hits_total", "By-id lookups served from cache").unwrap(),
            cache_misses: IntCounter::new("resource_cache_misses_total", "By-id lookups forwarded upstream").unwrap(),
            up: IntGauge::new("up", "1 if service is healthy").unwrap(),
            registry,
        });

        let reg = &metrics.registry;
        reg.register(Box::new(metrics.upstream_requests.clone())).unwrap();
        reg.register(Box::new(metrics.token_exchanges.clone())).unwrap();
        reg.register(Box::new(metrics.token_exchange_failures.clone())).unwrap();
        reg.register(Box::new(metrics.cache_hits.clone())).unwrap();
        reg.register(Box::new(metrics.cache_misses.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
