//! Cache backend factory
//!
//! Without a configured address the server runs with
//! [`ItemCache::disabled`], which gives the same results with every read
//! going to the store.

pub mod client;


pub use client::RedisCacheBackend;

use crate::config::CacheConfig;
use crate::metrics::Metrics;
use std::sync::Arc;
use stockroom::{CacheError, ItemCache};

/// Build the item cache described by `config`, reporting outcomes to `metrics`
///
/// A configured cache is pinged once so a misconfiguration shows up in the
/// logs early. An unreachable server is not an error: reads fall through to
/// the store until it comes back.
///
/// # Errors
///
/// Returns an error if the cache address cannot be used at all.
pub async fn create_cache(
    config: Option<&CacheConfig>,
    metrics: Arc<Metrics>,
) -> Result<ItemCache, CacheError> {
    let Some(config) = config else {
        tracing::info!("No cache configured, item reads go straight to the store");
        return Ok(ItemCache::disabled().with_observer(metrics));
    };

    let backend = RedisCacheBackend::new(config)?;
    match backend.ping().await {
        Ok(()) => tracing::info!("Caching items in {} (db {})", config.addr, config.db),
        Err(e) => tracing::warn!(
            "Cache at {} is not reachable ({}), reads will fall through to the store",
            config.addr,
            e
        ),
    }

    Ok(ItemCache::new(Arc::new(backend)).with_observer(metrics))
}
