use super::CacheBackend;
use crate::CacheError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "ahash")]
use ahash::AHashMap as HashMap;
#[cfg(not(feature = "ahash"))]
use std::collections::HashMap;

/// In-process cache backend
///
/// Can be switched offline to exercise the degraded path: while offline every
/// call fails with [`CacheError::Unavailable`] and the stored entries are left
/// as they were.
///
/// # Example
///
/// ```
/// use stockroom::{ItemCache, MemoryCacheBackend};
/// use std::sync::Arc;
///
/// let cache = ItemCache::new(Arc::new(MemoryCacheBackend::new()));
/// assert!(cache.is_enabled());
/// ```
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    offline: AtomicBool,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Write raw bytes under `key`, bypassing serialization
    pub fn insert_raw(&self, key: &str, value: Vec<u8>) {
        self.entries.write().insert(key.to_string(), value);
    }

    fn check_online(&self) -> Result<(), CacheError> {
        if self.offline.load(Ordering::Relaxed) {
            Err(CacheError::Unavailable("memory backend is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.check_online()?;
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        self.check_online()?;
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.check_online()?;
        self.entries.write().remove(key);
        Ok(())
    }
}
