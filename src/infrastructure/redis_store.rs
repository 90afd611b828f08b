//! Redis adapter for the [`AtomicStore`] port.
//!
//! Every [`Procedure`] runs as a server-side Lua script. Redis executes a
//! script without interleaving any other command, which is what makes the
//! read-decide-write sequences atomic across processes.
//!
//! ## Connection handling
//!
//! - One multiplexed connection via `redis::aio::ConnectionManager`, which
//!   reconnects on its own after a drop
//! - Scripts are sent by SHA (`EVALSHA`) and re-sent in full only when the
//!   server does not know them yet
//! - Each round trip is bounded by [`RedisStoreConfig::command_timeout`]
//!
//! A call that times out may still have run on the server.
//!
//! ## Example
//!
//! ```rust,no_run
//! use atomic_coord::{Coordinator, RedisStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisStore::connect("redis://127.0.0.1/").await?;
//! let coord = Coordinator::builder().with_store(store).build()?;
//! let decision = coord.rate_limiter().allow("api", "user123", 100, 60).await?;
//! # Ok(())
//! # }
//! ```

use crate::application::ports::{AtomicStore, StoreError};
use crate::domain::procedure::Procedure;
use crate::domain::reply::{KeyTtl, Reply};
use crate::infrastructure::scripts;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError, Script, Value};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the Redis store.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Deadline for one round trip (default: 2 seconds)
    pub command_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(2),
        }
    }
}

/// [`AtomicStore`] backed by a Redis server.
///
/// Cheap to clone; clones share the connection.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    scripts: Arc<HashMap<Procedure, Script>>,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to Redis with default configuration.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g., "redis://127.0.0.1/")
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        Self::connect_with_config(url, RedisStoreConfig::default()).await
    }

    /// Connect to Redis with custom configuration.
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the connection fails.
    pub async fn connect_with_config(
        url: &str,
        config: RedisStoreConfig,
    ) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(map_redis_error)?;
        let connection =
            with_timeout(config.command_timeout, ConnectionManager::new(client)).await?;

        let scripts = Procedure::ALL
            .iter()
            .map(|procedure| (*procedure, Script::new(scripts::source(*procedure))))
            .collect();

        tracing::debug!(timeout = ?config.command_timeout, "connected to redis");
        Ok(Self {
            connection,
            scripts: Arc::new(scripts),
            config,
        })
    }

    /// Configuration the store was created with.
    pub fn config(&self) -> &RedisStoreConfig {
        &self.config
    }
}

#[async_trait]
impl AtomicStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        with_timeout(self.config.command_timeout, conn.get(key)).await
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let mut conn = self.connection.clone();
        let code: i64 = with_timeout(self.config.command_timeout, conn.ttl(key)).await?;
        Ok(KeyTtl::from_code(code))
    }

    async fn atomic_exec(
        &self,
        procedure: Procedure,
        keys: &[String],
        args: &[String],
    ) -> Result<Reply, StoreError> {
        let script = self
            .scripts
            .get(&procedure)
            .ok_or_else(|| StoreError::Command(format!("no script for {}", procedure)))?;

        let mut invocation = script.prepare_invoke();
        for key in keys {
            invocation.key(key);
        }
        for arg in args {
            invocation.arg(arg);
        }

        let mut conn = self.connection.clone();
        let value: Value =
            with_timeout(self.config.command_timeout, invocation.invoke_async(&mut conn)).await?;
        reply_from_value(value)
    }
}

async fn with_timeout<T>(
    deadline: Duration,
    call: impl Future<Output = Result<T, RedisError>>,
) -> Result<T, StoreError> {
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result.map_err(map_redis_error),
        Err(_) => Err(StoreError::Timeout(deadline)),
    }
}

fn map_redis_error(e: RedisError) -> StoreError {
    if e.is_timeout() {
        StoreError::Connection(format!("timed out: {}", e))
    } else if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Command(e.to_string())
    }
}

fn reply_from_value(value: Value) -> Result<Reply, StoreError> {
    match value {
        Value::Nil => Ok(Reply::Nil),
        Value::Int(n) => Ok(Reply::Integer(n)),
        Value::BulkString(bytes) => String::from_utf8(bytes)
            .map(Reply::Text)
            .map_err(|e| StoreError::Command(format!("non-UTF-8 reply: {}", e))),
        Value::SimpleString(s) => Ok(Reply::Text(s)),
        Value::Okay => Ok(Reply::text("OK")),
        Value::Array(items) => items
            .into_iter()
            .map(reply_from_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Reply::Array),
        other => Err(StoreError::Command(format!(
            "unsupported reply type: {:?}",
            other
        ))),
    }
}
