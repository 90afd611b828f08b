//! Distributed lock over Redis shared by several processes.
//!
//! Start Redis, then run this in two terminals at once:
//!
//! ```bash
//! docker run -p 6379:6379 redis:7-alpine
//! cargo run --example redis_lock --features redis-store
//! ```
//!
//! Only one process holds `lock:report` at any time. The other waits,
//! retrying until the holder releases or the lock expires.

use atomic_coord::{AcquireStatus, Coordinator, OwnerToken, RedisStore, RedisStoreConfig};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let store = RedisStore::connect_with_config(
        &url,
        RedisStoreConfig {
            command_timeout: Duration::from_millis(500),
        },
    )
    .await?;

    let coord = Coordinator::builder()
        .with_store(store)
        .with_key_prefix("demo:")
        .build()?;
    let token = OwnerToken::generate();
    info!(token = %token, "worker started");

    for round in 1..=3 {
        loop {
            let outcome = coord.lock().acquire("lock:report", &token, 10).await?;
            match outcome.status {
                AcquireStatus::Acquired | AcquireStatus::Renewed => break,
                AcquireStatus::LockedByOther => {
                    warn!(ttl = outcome.ttl_seconds, "report locked by another worker");
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
            }
        }

        info!(round, "generating report");
        tokio::time::sleep(Duration::from_secs(2)).await;

        let released = coord.lock().release("lock:report", &token).await?;
        info!(round, status = ?released.status, "report done");
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    let reports = coord.counter().increment("reports_generated", 3, None).await?;
    info!(total = reports.value, "reports generated across all workers");
    Ok(())
}
