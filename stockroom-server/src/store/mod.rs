//! Store factory
//!
//! Opens the durable item store named by the configuration. The database
//! path `:memory:` gives a throwaway store, useful for demos and tests.

pub mod sqlite;

pub use sqlite::SqliteItemStore;

use crate::config::StoreConfig;
use anyhow::{Context, Result};
use std::sync::Arc;
use stockroom::ItemStore;

/// Open the configured item store
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn ItemStore>> {
    let store = SqliteItemStore::open(&config.path)
        .with_context(|| format!("Failed to open item database at {}", config.path))?;
    tracing::info!("Item database opened at {}", config.path);
    Ok(Arc::new(store))
}
