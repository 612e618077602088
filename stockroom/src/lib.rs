//! # Stockroom
//!
//! Admission control and cache-aside item access for inventory services.
//!
//! ## Overview
//!
//! Stockroom holds the two pieces of an inventory service where time,
//! concurrency and partial failure matter:
//!
//! - **Admission**: a single [`TokenBucket`] per process, wrapped by an
//!   [`AdmissionGate`], rejects requests once the global quota is spent
//! - **Item access**: an [`ItemAccessor`] composes an [`ItemStore`] with a
//!   best-effort [`ItemCache`] under a cache-aside discipline
//!
//! Routing, validation of transport payloads, persistence schemas and token
//! issuance belong to the embedding server.
//!
//! ## Quick Start
//!
//! ```
//! use stockroom::{Admission, AdmissionGate, TokenBucket};
//! use std::time::Duration;
//!
//! // Five requests at once, one more every second
//! let gate = AdmissionGate::new(TokenBucket::new(5, Duration::from_secs(1)).unwrap());
//!
//! match gate.check() {
//!     Admission::Admitted => println!("handle the request"),
//!     Admission::RateLimited { retry_after } => {
//!         println!("rejected, retry in {}s", retry_after.as_secs());
//!     }
//! }
//! ```
//!
//! ## Token Bucket
//!
//! The bucket starts full and refills lazily: on each call it adds one token
//! per whole `refill_interval` elapsed since the last refill, capped at
//! `capacity`. The refill, check and decrement happen under one lock, so in
//! any window of length `W` at most `capacity + floor(W / refill_interval)`
//! calls are allowed regardless of how many threads call at once.
//!
//! ## Cache-Aside
//!
//! ```text
//!  read(id) ──► cache.get ──hit──► return
//!                  │miss
//!                  ▼
//!              store.find ──found──► cache.set ──► return
//!                  │absent
//!                  ▼
//!              NotFound (not cached)
//!
//!  update/delete(id) ──► store write ──ok──► cache.invalidate
//!                            │err
//!                            ▼
//!                     error, cache untouched
//! ```
//!
//! The cache never fails a caller. A backend that is down or returns a
//! payload that does not decode counts as a miss; failed writes are logged
//! and dropped. [`ItemCache::disabled`] gives the same accessor behavior with
//! no backend at all.
//!
//! ## Features
//!
//! - `ahash` (default): Use AHash for the in-memory backends

pub mod core;

pub use core::{
    Admission, AdmissionGate, BucketError, CacheBackend, CacheError, CacheObserver, Item,
    ItemAccessor, ItemCache, ItemPage, ItemQuery, ItemStore, ItemUpdate, MemoryCacheBackend,
    MemoryItemStore, NewItem, SortField, SortOrder, StoreError, TokenBucket, ValidationError,
};
