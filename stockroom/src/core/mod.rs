//! Core components of the stockroom library
//!
//! This module contains the fundamental building blocks:
//! - [`bucket`]: The lock-protected token bucket
//! - [`admission`]: The process-wide admission gate built on one bucket
//! - [`item`]: The item model, write payloads and list queries
//! - [`store`]: The durable item store contract and an in-memory implementation
//! - [`cache`]: The best-effort item cache and its backends
//! - [`accessor`]: Cache-aside orchestration over a store and a cache

pub mod accessor;
pub mod admission;
pub mod bucket;
pub mod cache;
pub mod item;
pub mod store;

pub use accessor::ItemAccessor;
pub use admission::{Admission, AdmissionGate};
pub use bucket::TokenBucket;
pub use cache::{CacheBackend, CacheObserver, ItemCache, MemoryCacheBackend};
pub use item::{Item, ItemPage, ItemQuery, ItemUpdate, NewItem, SortField, SortOrder};
pub use store::{ItemStore, MemoryItemStore};

use std::error::Error;
use std::fmt;

/// Errors raised when constructing a [`TokenBucket`]
///
/// # Example
///
/// ```
/// use stockroom::{BucketError, TokenBucket};
/// use std::time::Duration;
///
/// match TokenBucket::new(5, Duration::ZERO) {
///     Err(BucketError::ZeroRefillInterval) => {}
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketError {
    /// Capacity must be at least one token
    ZeroCapacity,
    /// The refill interval must be a positive duration
    ZeroRefillInterval,
}

impl fmt::Display for BucketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketError::ZeroCapacity => write!(f, "bucket capacity must be greater than zero"),
            BucketError::ZeroRefillInterval => {
                write!(f, "bucket refill interval must be greater than zero")
            }
        }
    }
}

impl Error for BucketError {}

/// Errors reported by the durable item store
///
/// `NotFound` is kept apart from every other failure so callers can map it
/// to a distinct outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No item exists with the requested id
    NotFound,
    /// The store failed for any other reason
    Backend(String),
}

impl StoreError {
    pub fn backend(err: impl fmt::Display) -> Self {
        StoreError::Backend(err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "item not found"),
            StoreError::Backend(msg) => write!(f, "store error: {msg}"),
        }
    }
}

impl Error for StoreError {}

/// Errors reported by a cache backend
///
/// These never leave [`ItemCache`]; they exist so backends can say what went
/// wrong before the cache logs and drops the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The backing service could not be reached
    Unavailable(String),
    /// The backing service answered with something unexpected
    Protocol(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Unavailable(msg) => write!(f, "cache unavailable: {msg}"),
            CacheError::Protocol(msg) => write!(f, "cache protocol error: {msg}"),
        }
    }
}

impl Error for CacheError {}

/// Rejected item payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for ValidationError {}
