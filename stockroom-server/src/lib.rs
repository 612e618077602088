//! # Stockroom Server
//!
//! An inventory HTTP service built on the [`stockroom`] core: every request
//! passes one global token bucket, and item reads go through a cache-aside
//! layer in front of a SQLite store.
//!
//! ## Quick Start
//!
//! ```bash
//! # Show all available options
//! stockroom --help
//!
//! # Throwaway in-memory store, no cache
//! stockroom --jwt-secret s3cret --database :memory:
//!
//! # Persistent store with a Redis cache
//! stockroom --jwt-secret s3cret --database inventory.db --cache-addr 127.0.0.1:6379
//! ```
//!
//! ## Configuration
//!
//! Configure via CLI arguments or environment variables (CLI takes precedence):
//!
//! ```bash
//! export STOCKROOM_JWT_SECRET=s3cret
//! export STOCKROOM_RATE_CAPACITY=20
//! stockroom
//!
//! # List all available environment variables
//! stockroom --list-env-vars
//! ```
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────────┐
//!  request ─►│     CORS     │
//!            └──────┬───────┘
//!            ┌──────▼───────┐   empty   ┌─────┐
//!            │AdmissionGate │──────────►│ 429 │
//!            └──────┬───────┘           └─────┘
//!            ┌──────▼───────┐
//!            │   Handlers   │
//!            └──────┬───────┘
//!            ┌──────▼───────┐
//!            │ ItemAccessor │
//!            └──┬────────┬──┘
//!     ┌─────────▼──┐  ┌──▼─────────┐
//!     │ ItemCache  │  │ SqliteItem │
//!     │  (Redis)   │  │   Store    │
//!     └────────────┘  └────────────┘
//! ```
//!
//! The cache is optional and never fails a request; without it every read
//! goes to the store.

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod seed;
pub mod store;
pub mod transport;

use crate::auth::Authenticator;
use crate::config::Config;
use crate::metrics::Metrics;
use crate::transport::AppState;
use anyhow::Result;
use std::sync::Arc;
use stockroom::{AdmissionGate, ItemAccessor, ItemCache, ItemStore, TokenBucket};

/// Wire the shared request state from its parts
///
/// # Errors
///
/// Returns an error if the rate limit parameters do not form a valid bucket.
pub fn build_state(
    config: &Config,
    store: Arc<dyn ItemStore>,
    cache: ItemCache,
    metrics: Arc<Metrics>,
) -> Result<AppState> {
    let bucket = TokenBucket::new(
        config.rate_limit.capacity,
        config.rate_limit.refill_interval(),
    )?;

    Ok(AppState {
        gate: Arc::new(AdmissionGate::new(bucket)),
        items: Arc::new(ItemAccessor::new(store, cache)),
        auth: Arc::new(Authenticator::new(&config.auth)),
        metrics,
    })
}
