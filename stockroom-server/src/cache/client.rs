//! Redis cache backend
//!
//! Commands share one multiplexed connection owned by a
//! [`ConnectionManager`], which reconnects on its own after the server goes
//! away. The connection is opened on first use. Every call, including the
//! wait for that first connect, is bounded by the configured timeout.

use crate::config::CacheConfig;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, IntoConnectionInfo, RedisError};
use std::future::Future;
use std::time::Duration;
use stockroom::{CacheBackend, CacheError};
use tokio::sync::OnceCell;
use tokio::time::timeout;
use tracing::debug;

/// [`CacheBackend`] backed by a Redis-compatible server
pub struct RedisCacheBackend {
    addr: String,
    db: u32,
    timeout: Duration,
    client: Client,
    conn: OnceCell<ConnectionManager>,
}

impl RedisCacheBackend {
    /// Create a backend; no connection is made until the first command
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Protocol`] if the address is not `host:port`.
    pub fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let (host, port) = config.host_port().ok_or_else(|| {
            CacheError::Protocol(format!("invalid cache address '{}'", config.addr))
        })?;

        let mut info = (host, port).into_connection_info().map_err(cache_error)?;
        info.redis.db = i64::from(config.db);
        info.redis.password = config.password.clone();
        let client = Client::open(info).map_err(cache_error)?;

        Ok(Self {
            addr: config.addr.clone(),
            db: config.db,
            timeout: config.timeout(),
            client,
            conn: OnceCell::new(),
        })
    }

    /// Round-trip a `PING`
    pub async fn ping(&self) -> Result<(), CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            redis::cmd("PING")
                .query_async::<String>(&mut conn)
                .await
                .map(drop)
                .map_err(cache_error)
        })
        .await
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let conn = ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(cache_error)?;
                debug!("Connected to cache at {} (db {})", self.addr, self.db);
                Ok::<_, CacheError>(conn)
            })
            .await?;
        Ok(conn.clone())
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        timeout(self.timeout, call).await.unwrap_or_else(|_| {
            Err(CacheError::Unavailable(format!(
                "no reply from {} within {:?}",
                self.addr, self.timeout
            )))
        })
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            redis::cmd("GET")
                .arg(key)
                .query_async::<Option<Vec<u8>>>(&mut conn)
                .await
                .map_err(cache_error)
        })
        .await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .query_async::<()>(&mut conn)
                .await
                .map_err(cache_error)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            redis::cmd("DEL")
                .arg(key)
                .query_async::<i64>(&mut conn)
                .await
                .map(drop)
                .map_err(cache_error)
        })
        .await
    }
}

impl std::fmt::Debug for RedisCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheBackend")
            .field("addr", &self.addr)
            .field("db", &self.db)
            .field("timeout", &self.timeout)
            .field("connected", &self.conn.initialized())
            .finish()
    }
}

fn cache_error(e: RedisError) -> CacheError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
    {
        CacheError::Unavailable(e.to_string())
    } else {
        CacheError::Protocol(e.to_string())
    }
}
