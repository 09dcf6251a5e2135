use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::settings::CacheConfig;
use crate::proxy::normalize::NormalizedResult;
use crate::utils::time::now_i64;

/// One cached normalized lookup, success or error alike.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: NormalizedResult,
    pub inserted_at: i64,
}

/// Short-term store of normalized by-id lookups, keyed
/// "{resourceType}/{id}". No per-entry TTL and no LRU: the whole map is
/// cleared on a fixed interval by the background sweeper, which is enough
/// for a bounded-identifier workload with uniform staleness tolerance.
#[derive(Default)]
pub struct ResourceCache {
    inner: RwLock<HashMap<String, CacheEntry>>,
}

pub fn cache_key(resource_type: &str, id: &str) -> String {
    format!("{}/{}", resource_type, id)
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<NormalizedResult> {
        let map = self.inner.read().await;
        map.get(key).map(|entry| entry.value.clone())
    }

    pub async fn put(&self, key: String, value: NormalizedResult) {
        let mut map = self.inner.write().await;
        map.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now_i64(),
            },
        );
    }

    /// Unconditionally discard everything, whatever the entries' ages.
    pub async fn sweep(&self) {
        let mut map = self.inner.write().await;
        let dropped = map.len();
        map.clear();
        debug!("cache sweep dropped {} entries", dropped);
    }

    /// Discard only cached error results. Used when a shorter negative
    /// window is configured, so a transient upstream blip is not latched
    /// for the full sweep interval.
    pub async fn sweep_negative(&self) {
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|_, entry| !entry.value.is_error());
        debug!("negative sweep dropped {} entries", before - map.len());
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

/// Run the fixed-interval full-clear sweep until shutdown is signalled.
pub fn spawn_sweeper(
    cache: Arc<ResourceCache>,
    cfg: &CacheConfig,
    mut shutdown: watch::Receiver<()>,
) -> JoinHandle<()> {
    let full_interval = Duration::from_secs(cfg.sweep_interval_seconds);
    let negative_interval = cfg
        .negative_sweep_interval_seconds
        .map(Duration::from_secs);

    tokio::spawn(async move {
        let mut full = tokio::time::interval(full_interval);
        // tokio intervals fire immediately; the cache starts empty, so skip it.
        full.tick().await;

        let mut negative = tokio::time::interval(negative_interval.unwrap_or(full_interval));
        negative.tick().await;
        let negative_enabled = negative_interval.is_some();

        loop {
            tokio::select! {
                _ = full.tick() => {
                    cache.sweep().await;
                }
                _ = negative.tick(), if negative_enabled => {
                    cache.sweep_negative().await;
                }
                _ = shutdown.changed() => {
                    info!("cache sweeper stopping");
                    return;
                }
            }
        }
    })
}
