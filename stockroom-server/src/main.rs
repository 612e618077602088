use anyhow::Result;
use std::sync::Arc;

use stockroom_server::cache::create_cache;
use stockroom_server::config::Config;
use stockroom_server::metrics::Metrics;
use stockroom_server::transport::{Transport, http::HttpTransport};
use stockroom_server::{build_state, seed, store};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration from environment variables and CLI arguments
    let config = Config::from_env_and_args()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("stockroom={}", config.log_level).parse()?),
        )
        .init();

    let metrics = Arc::new(Metrics::new());

    // Durable store, seeded on first start
    let store = store::open_store(&config.store)?;
    if config.seed {
        seed::seed_if_empty(store.as_ref()).await?;
    }

    // Optional cache; the server starts even if it is down
    let cache = create_cache(config.cache.as_ref(), Arc::clone(&metrics)).await?;

    let state = build_state(&config, store, cache, metrics)?;

    tracing::info!(
        "Stockroom server starting: rate limit {} requests, one more every {:?}",
        config.rate_limit.capacity,
        config.rate_limit.refill_interval()
    );

    let transport = HttpTransport::new(&config.http.host, config.http.port)?;
    transport.start(state).await
}
