//! Transport layer for the inventory server
//!
//! Transports accept client connections and drive requests through the
//! shared [`AppState`]: the admission gate first, then the item accessor.
//!
//! # Available Transports
//!
//! - [`http`]: REST API with JSON payloads

pub mod http;

pub use http::AppState;

use anyhow::Result;
use async_trait::async_trait;

/// Common interface for transport implementations
///
/// Each transport is responsible for:
/// - Accepting client connections
/// - Passing every request through the admission gate
/// - Sending responses back to clients
#[async_trait]
pub trait Transport {
    /// Start the transport server
    ///
    /// Runs until an error occurs or the server shuts down.
    async fn start(self, state: AppState) -> Result<()>;
}
