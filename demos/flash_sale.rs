//! Flash sale simulation over the in-memory store.
//!
//! 200 buyers race for 50 units of one product. Each buyer first passes a
//! per-buyer rate limit, then takes a short lock on their cart and places an
//! order. No unit is sold twice and the ledger always balances.
//!
//! ```bash
//! RUST_LOG=atomic_coord=debug cargo run --example flash_sale
//! ```

use atomic_coord::{AcquireStatus, Coordinator, MemoryStore, OwnerToken};
use futures::future::join_all;
use tracing::info;
use tracing_subscriber::EnvFilter;

const STOCK: i64 = 50;
const BUYERS: usize = 200;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let coord = Coordinator::builder()
        .with_store(MemoryStore::new())
        .with_key_prefix("flash:")
        .build()?;

    coord.inventory().restock("sneaker", STOCK).await?;
    println!("=== Flash Sale ===\n");
    println!("{} buyers, {} units in stock\n", BUYERS, STOCK);

    let buyers = (0..BUYERS).map(|i| {
        let coord = coord.clone();
        tokio::spawn(async move { buy(&coord, i).await })
    });
    let mut sold = 0;
    let mut turned_away = 0;
    for joined in join_all(buyers).await {
        if joined?? {
            sold += 1;
        } else {
            turned_away += 1;
        }
    }

    let snapshot = coord.inventory().snapshot("sneaker").await?;
    println!("Sold:        {}", sold);
    println!("Turned away: {}", turned_away);
    println!("Stock left:  {}", snapshot.stock);
    println!("Ledger sold: {}", snapshot.sold);
    assert_eq!(snapshot.stock + snapshot.sold, STOCK);

    println!("\nLatest sales:");
    for sale in coord.inventory().sales_history("sneaker", 5).await? {
        println!("  {} (stock after: {})", sale.order_id, sale.stock_after);
    }

    let metrics = coord.metrics().snapshot();
    println!("\nMetrics: {}", serde_json::to_string_pretty(&metrics)?);

    Ok(())
}

/// Returns whether buyer `i` got a unit.
async fn buy(coord: &Coordinator, i: usize) -> atomic_coord::Result<bool> {
    let buyer = format!("buyer-{}", i % 150);

    let decision = coord.rate_limiter().allow("checkout", &buyer, 1, 60).await?;
    if !decision.allowed {
        info!(%buyer, retry_in = decision.reset_seconds, "checkout rate limited");
        return Ok(false);
    }

    let token = OwnerToken::generate();
    let cart = format!("cart:{}", buyer);
    let lock = coord.lock().acquire(&cart, &token, 5).await?;
    if lock.status == AcquireStatus::LockedByOther {
        return Ok(false);
    }

    let order_id = format!("ord-{}", i);
    let outcome = coord.inventory().decrement("sneaker", 1, &order_id).await?;
    coord.lock().release(&cart, &token).await?;

    if outcome.accepted {
        info!(%order_id, stock_left = outcome.new_stock, "order confirmed");
    }
    Ok(outcome.accepted)
}
