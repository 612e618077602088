//! Cache-aside access to items
//!
//! Every path through [`ItemAccessor`] follows a fixed order:
//!
//! - reads try the cache, fall through to the store on a miss and populate
//!   the cache with what the store returned
//! - writes hit the store first and only then invalidate the cache entry
//!
//! A failed store call leaves the cache untouched. Updates invalidate rather
//! than overwrite, so the next read repopulates from the stored record.
//!
//! Concurrent access to one id can still leave a stale snapshot: a read that
//! fetched the store before an update and fills the cache after that
//! update's invalidation keeps the old value cached until the next mutation.

use super::StoreError;
use super::cache::ItemCache;
use super::item::{Item, ItemPage, ItemQuery, ItemUpdate, NewItem};
use super::store::ItemStore;
use uuid::Uuid;

/// Item operations over a durable store with a side cache
///
/// # Example
///
/// ```
/// use stockroom::{ItemAccessor, ItemCache, MemoryCacheBackend, MemoryItemStore, NewItem};
/// use std::sync::Arc;
///
/// # block_on(async {
/// let accessor = ItemAccessor::new(
///     MemoryItemStore::new(),
///     ItemCache::new(Arc::new(MemoryCacheBackend::new())),
/// );
///
/// let created = accessor
///     .create(NewItem { name: "Laptop".into(), stock: 10, price: 999.99 })
///     .await
///     .unwrap();
/// let read = accessor.read(&created.id).await.unwrap();
/// assert_eq!(read, created);
/// # });
/// # fn block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug)]
pub struct ItemAccessor<S: ItemStore> {
    store: S,
    cache: ItemCache,
}

impl<S: ItemStore> ItemAccessor<S> {
    pub fn new(store: S, cache: ItemCache) -> Self {
        ItemAccessor { store, cache }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &ItemCache {
        &self.cache
    }

    /// Fetch one item, serving from the cache when possible
    ///
    /// Missing items are not cached.
    pub async fn read(&self, id: &str) -> Result<Item, StoreError> {
        if let Some(item) = self.cache.get(id).await {
            tracing::debug!("Cache hit for item {}", id);
            return Ok(item);
        }

        let item = self.store.find(id).await?.ok_or(StoreError::NotFound)?;
        self.cache.set(id, &item).await;
        Ok(item)
    }

    /// Persist a new item under a fresh id
    ///
    /// The cache is filled lazily by the first read.
    pub async fn create(&self, new_item: NewItem) -> Result<Item, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.store.create(new_item.into_item(id)).await
    }

    /// Replace an item, then drop its cache entry
    pub async fn update(&self, id: &str, update: ItemUpdate) -> Result<Item, StoreError> {
        let saved = self.store.save(update.into_item(id.to_string())).await?;
        self.cache.invalidate(id).await;
        Ok(saved)
    }

    /// Remove an item, then drop its cache entry
    ///
    /// Zero affected rows is reported as [`StoreError::NotFound`] and leaves
    /// the cache alone.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let affected = self.store.delete(id).await?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.cache.invalidate(id).await;
        Ok(())
    }

    /// One page of the listing, always read from the store
    pub async fn list(&self, query: &ItemQuery) -> Result<ItemPage, StoreError> {
        self.store.list(query).await
    }
}
