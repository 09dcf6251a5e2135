#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::watch;

    use crate::cache::resource_cache::{cache_key, spawn_sweeper, ResourceCache};
    use crate::config::settings::CacheConfig;
    use crate::proxy::normalize::NormalizedResult;
    use crate::proxy::outcome::OperationOutcome;

    fn success() -> NormalizedResult {
        NormalizedResult::Success {
            payload: json!({"resourceType": "Patient", "id": "1"}),
            status: 200,
        }
    }

    fn failure() -> NormalizedResult {
        NormalizedResult::TransportFailure {
            outcome: OperationOutcome::processing_error("boom"),
            status: 502,
        }
    }

    #[tokio::test]
    async fn get_returns_the_stored_value_unchanged() {
        let cache = ResourceCache::new();
        cache.put(cache_key("Patient", "1"), success()).await;

        let hit = cache.get("Patient/1").await.expect("cache hit");
        assert_eq!(hit, success());
        assert!(cache.get("Patient/2").await.is_none());
    }

    #[tokio::test]
    async fn sweep_discards_everything() {
        let cache = ResourceCache::new();
        cache.put(cache_key("Patient", "1"), success()).await;
        cache.put(cache_key("Patient", "2"), failure()).await;
        assert_eq!(cache.len().await, 2);

        cache.sweep().await;
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn negative_sweep_keeps_successes() {
        let cache = ResourceCache::new();
        cache.put(cache_key("Patient", "1"), success()).await;
        cache.put(cache_key("Patient", "2"), failure()).await;

        cache.sweep_negative().await;
        assert_eq!(cache.len().await, 1);
        assert!(cache.get("Patient/1").await.is_some());
        assert!(cache.get("Patient/2").await.is_none());
    }

    #[tokio::test]
    async fn sweeper_clears_on_interval_and_stops_on_shutdown() {
        let cache = Arc::new(ResourceCache::new());
        cache.put(cache_key("Patient", "1"), success()).await;

        let cfg = CacheConfig {
            sweep_interval_seconds: 1,
            negative_sweep_interval_seconds: None,
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let handle = spawn_sweeper(cache.clone(), &cfg, shutdown_rx);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(cache.len().await, 0);

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
