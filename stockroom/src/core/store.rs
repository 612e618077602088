//! Durable item store contract
//!
//! The relational backend lives outside this crate; the accessor only talks
//! to it through [`ItemStore`]. [`MemoryItemStore`] is a map-backed
//! implementation for tests and embedded use.

use super::StoreError;
use super::item::{Item, ItemPage, ItemQuery};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "ahash")]
use ahash::AHashMap as HashMap;
#[cfg(not(feature = "ahash"))]
use std::collections::HashMap;

/// Storage backend for item snapshots
///
/// Implementations must report a missing id as [`StoreError::NotFound`] and
/// every other failure as [`StoreError::Backend`].
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Look up one item
    async fn find(&self, id: &str) -> Result<Option<Item>, StoreError>;

    /// Insert a new item carrying a caller-assigned id
    async fn create(&self, item: Item) -> Result<Item, StoreError>;

    /// Replace an existing item, [`StoreError::NotFound`] if the id is unknown
    async fn save(&self, item: Item) -> Result<Item, StoreError>;

    /// Remove an item and return the number of rows affected
    async fn delete(&self, id: &str) -> Result<u64, StoreError>;

    /// One filtered, sorted page of items
    async fn list(&self, query: &ItemQuery) -> Result<ItemPage, StoreError>;

    /// Total number of stored items
    async fn count(&self) -> Result<u64, StoreError>;
}

#[async_trait]
impl<T: ItemStore + ?Sized> ItemStore for Arc<T> {
    async fn find(&self, id: &str) -> Result<Option<Item>, StoreError> {
        (**self).find(id).await
    }

    async fn create(&self, item: Item) -> Result<Item, StoreError> {
        (**self).create(item).await
    }

    async fn save(&self, item: Item) -> Result<Item, StoreError> {
        (**self).save(item).await
    }

    async fn delete(&self, id: &str) -> Result<u64, StoreError> {
        (**self).delete(id).await
    }

    async fn list(&self, query: &ItemQuery) -> Result<ItemPage, StoreError> {
        (**self).list(query).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        (**self).count().await
    }
}

/// In-memory item store
///
/// Counts `find` calls so callers can observe how often reads reach the
/// store.
#[derive(Debug, Default)]
pub struct MemoryItemStore {
    items: RwLock<HashMap<String, Item>>,
    finds: AtomicU64,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `find` calls served so far
    pub fn find_count(&self) -> u64 {
        self.finds.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn find(&self, id: &str) -> Result<Option<Item>, StoreError> {
        self.finds.fetch_add(1, Ordering::Relaxed);
        Ok(self.items.read().get(id).cloned())
    }

    async fn create(&self, item: Item) -> Result<Item, StoreError> {
        let mut items = self.items.write();
        if items.contains_key(&item.id) {
            return Err(StoreError::Backend(format!(
                "duplicate item id: {}",
                item.id
            )));
        }
        items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    async fn save(&self, item: Item) -> Result<Item, StoreError> {
        let mut items = self.items.write();
        match items.get_mut(&item.id) {
            Some(slot) => {
                *slot = item.clone();
                Ok(item)
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, id: &str) -> Result<u64, StoreError> {
        Ok(self.items.write().remove(id).map_or(0, |_| 1))
    }

    async fn list(&self, query: &ItemQuery) -> Result<ItemPage, StoreError> {
        let mut matching: Vec<Item> = self
            .items
            .read()
            .values()
            .filter(|item| query.matches(item))
            .cloned()
            .collect();

        // Ties fall back to id so pages are stable between calls
        matching.sort_by(|a, b| query.compare(a, b).then_with(|| a.id.cmp(&b.id)));

        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.page_size as usize)
            .collect();

        Ok(ItemPage::new(data, total, query))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.items.read().len() as u64)
    }
}
