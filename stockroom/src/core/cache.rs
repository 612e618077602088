//! Best-effort item cache
//!
//! [`ItemCache`] sits in front of the durable store and never fails the
//! caller. Backend errors, unreachable servers and corrupted payloads all
//! read as a miss, and writes that cannot land are logged and dropped. The
//! cache can be removed entirely without changing results, only latency.

use super::CacheError;
use super::item::Item;
use async_trait::async_trait;
use std::sync::Arc;

mod memory;

pub use memory::MemoryCacheBackend;

const KEY_PREFIX: &str = "item:";

/// Key-value service holding serialized payloads
///
/// Entries have no expiry; they live until overwritten or deleted.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;

    /// Remove `key`; deleting an absent key succeeds
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Hook for counting cache outcomes
pub trait CacheObserver: Send + Sync {
    fn cache_hit(&self);
    fn cache_miss(&self);
    fn cache_error(&self);
}

/// Item snapshots keyed by id
///
/// Cloning is cheap; clones share the backend.
#[derive(Clone, Default)]
pub struct ItemCache {
    backend: Option<Arc<dyn CacheBackend>>,
    observer: Option<Arc<dyn CacheObserver>>,
}

impl ItemCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        ItemCache {
            backend: Some(backend),
            observer: None,
        }
    }

    /// A cache with no backend: every read misses, every write is a no-op
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_observer(mut self, observer: Arc<dyn CacheObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Backend key for an item id
    pub fn key(id: &str) -> String {
        format!("{KEY_PREFIX}{id}")
    }

    /// Cached snapshot for `id`, `None` on miss or any failure
    pub async fn get(&self, id: &str) -> Option<Item> {
        let Some(backend) = &self.backend else {
            self.observe(|o| o.cache_miss());
            return None;
        };

        let payload = match backend.get(&Self::key(id)).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                self.observe(|o| o.cache_miss());
                return None;
            }
            Err(e) => {
                tracing::warn!("Cache read for item {} failed: {}", id, e);
                self.observe(|o| o.cache_error());
                return None;
            }
        };

        match serde_json::from_slice::<Item>(&payload) {
            Ok(item) => {
                self.observe(|o| o.cache_hit());
                Some(item)
            }
            Err(e) => {
                tracing::warn!("Discarding corrupted cache entry for item {}: {}", id, e);
                self.observe(|o| o.cache_error());
                None
            }
        }
    }

    /// Store a snapshot for `id`, ignoring failures
    pub async fn set(&self, id: &str, item: &Item) {
        let Some(backend) = &self.backend else {
            return;
        };

        let payload = match serde_json::to_vec(item) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to serialize item {} for caching: {}", id, e);
                self.observe(|o| o.cache_error());
                return;
            }
        };

        if let Err(e) = backend.set(&Self::key(id), payload).await {
            tracing::warn!("Cache write for item {} failed: {}", id, e);
            self.observe(|o| o.cache_error());
        }
    }

    /// Drop the entry for `id` if there is one, ignoring failures
    pub async fn invalidate(&self, id: &str) {
        let Some(backend) = &self.backend else {
            return;
        };

        if let Err(e) = backend.delete(&Self::key(id)).await {
            tracing::warn!("Cache invalidation for item {} failed: {}", id, e);
            self.observe(|o| o.cache_error());
        }
    }

    fn observe(&self, f: impl FnOnce(&dyn CacheObserver)) {
        if let Some(observer) = &self.observer {
            f(observer.as_ref());
        }
    }
}

impl std::fmt::Debug for ItemCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemCache")
            .field("enabled", &self.is_enabled())
            .field("observed", &self.observer.is_some())
            .finish()
    }
}
