use atomic_coord::{
    Coordinator, InventoryRejection, InventorySnapshot, ManualClock, MemoryStore, OrderStatus,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

const START_SECONDS: u64 = 1_700_000_000;

fn coordinator() -> (Coordinator, ManualClock) {
    let clock = ManualClock::at_unix_seconds(START_SECONDS);
    let shared = Arc::new(clock.clone());
    let coord = Coordinator::builder()
        .with_store(MemoryStore::with_clock(shared.clone()))
        .with_clock(shared)
        .build()
        .unwrap();
    (coord, clock)
}

#[tokio::test]
async fn test_confirmed_decrement_writes_everything() {
    let (coord, _clock) = coordinator();
    let inventory = coord.inventory();
    inventory.restock("laptop", 100).await.unwrap();

    let outcome = inventory.decrement("laptop", 3, "ord_1").await.unwrap();
    assert!(outcome.accepted);
    assert_eq!(outcome.rejection, None);
    assert_eq!(outcome.stock_before, 100);
    assert_eq!(outcome.new_stock, 97);
    assert_eq!(outcome.new_sold, 3);

    let order = inventory.order("ord_1").await.unwrap().unwrap();
    assert_eq!(order.product_id, "laptop");
    assert_eq!(order.quantity, 3);
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.stock_before, 100);
    assert_eq!(order.stock_after, 97);
    assert_eq!(order.timestamp_ms, START_SECONDS * 1000);

    let history = inventory.sales_history("laptop", 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].order_id, "ord_1");
    assert_eq!(history[0].stock_after, 97);

    assert_eq!(
        inventory.snapshot("laptop").await.unwrap(),
        InventorySnapshot { stock: 97, sold: 3 }
    );
}

#[tokio::test]
async fn test_insufficient_stock_writes_nothing() {
    let (coord, _clock) = coordinator();
    let inventory = coord.inventory();
    inventory.restock("phone", 2).await.unwrap();

    let outcome = inventory.decrement("phone", 5, "ord_big").await.unwrap();
    assert!(!outcome.accepted);
    assert_eq!(outcome.rejection, Some(InventoryRejection::InsufficientStock));
    assert_eq!(outcome.new_stock, 2);
    assert_eq!(outcome.stock_before, 2);

    assert_eq!(inventory.order("ord_big").await.unwrap(), None);
    assert!(inventory.sales_history("phone", 10).await.unwrap().is_empty());
    assert_eq!(
        inventory.snapshot("phone").await.unwrap(),
        InventorySnapshot { stock: 2, sold: 0 }
    );
}

#[tokio::test]
async fn test_unknown_product_has_no_stock() {
    let (coord, _clock) = coordinator();

    let outcome = coord.inventory().decrement("ghost", 1, "ord_1").await.unwrap();
    assert_eq!(outcome.rejection, Some(InventoryRejection::InsufficientStock));
    assert_eq!(outcome.new_stock, 0);
}

#[tokio::test]
async fn test_duplicate_order_is_rejected() {
    let (coord, _clock) = coordinator();
    let inventory = coord.inventory();
    inventory.restock("laptop", 10).await.unwrap();

    assert!(inventory.decrement("laptop", 2, "ord_1").await.unwrap().accepted);

    let retry = inventory.decrement("laptop", 2, "ord_1").await.unwrap();
    assert!(!retry.accepted);
    assert_eq!(retry.rejection, Some(InventoryRejection::DuplicateOrder));
    assert_eq!(retry.new_stock, 8);
    assert_eq!(retry.new_sold, 2);

    // Order ids are global: reusing one for another product is also refused
    inventory.restock("mouse", 10).await.unwrap();
    let other = inventory.decrement("mouse", 1, "ord_1").await.unwrap();
    assert_eq!(other.rejection, Some(InventoryRejection::DuplicateOrder));
    assert_eq!(inventory.snapshot("mouse").await.unwrap().stock, 10);
}

#[tokio::test]
async fn test_sales_history_newest_first() {
    let (coord, clock) = coordinator();
    let inventory = coord.inventory();
    inventory.restock("laptop", 10).await.unwrap();

    for i in 1..=4 {
        inventory
            .decrement("laptop", 1, &format!("ord_{}", i))
            .await
            .unwrap();
        clock.advance(Duration::from_millis(250));
    }

    let history = inventory.sales_history("laptop", 3).await.unwrap();
    let ids: Vec<_> = history.iter().map(|s| s.order_id.as_str()).collect();
    assert_eq!(ids, vec!["ord_4", "ord_3", "ord_2"]);
    assert_eq!(history[0].stock_after, 6);
    assert!(history[0].timestamp > history[1].timestamp);

    let everything = inventory.sales_history("laptop", usize::MAX).await.unwrap();
    assert_eq!(everything.len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_no_oversell_under_concurrency() {
    let (coord, _clock) = coordinator();
    coord.inventory().restock("flash", 10).await.unwrap();

    let tasks = (0..20).map(|i| {
        let coord = coord.clone();
        tokio::spawn(async move {
            let order_id = format!("ord_{}", i);
            let outcome = coord.inventory().decrement("flash", 1, &order_id).await;
            (order_id, outcome)
        })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let mut accepted = 0;
    for (order_id, outcome) in &results {
        let outcome = outcome.as_ref().unwrap();
        let record = coord.inventory().order(order_id).await.unwrap();
        if outcome.accepted {
            accepted += 1;
            assert!(record.is_some());
            assert!(outcome.new_stock >= 0);
        } else {
            assert_eq!(outcome.rejection, Some(InventoryRejection::InsufficientStock));
            assert!(record.is_none());
        }
    }
    assert_eq!(accepted, 10);

    assert_eq!(
        coord.inventory().snapshot("flash").await.unwrap(),
        InventorySnapshot { stock: 0, sold: 10 }
    );
    assert_eq!(
        coord.inventory().sales_history("flash", 100).await.unwrap().len(),
        10
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_large_orders_race_for_stock() {
    let (coord, _clock) = coordinator();
    coord.inventory().restock("console", 100).await.unwrap();

    let tasks = ["ord_a", "ord_b"].map(|order_id| {
        let coord = coord.clone();
        tokio::spawn(async move { coord.inventory().decrement("console", 60, order_id).await })
    });
    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let winners: Vec<_> = outcomes.iter().filter(|o| o.accepted).collect();
    let losers: Vec<_> = outcomes.iter().filter(|o| !o.accepted).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(losers.len(), 1);

    assert_eq!(winners[0].stock_before, 100);
    assert_eq!(winners[0].new_stock, 40);

    // The loser saw the stock the winner left behind
    assert_eq!(losers[0].rejection, Some(InventoryRejection::InsufficientStock));
    assert_eq!(losers[0].new_stock, 40);
    assert_eq!(losers[0].stock_before, 40);

    assert_eq!(coord.inventory().snapshot("console").await.unwrap().stock, 40);
}

#[tokio::test]
async fn test_records_serialize_as_camel_case() {
    let (coord, _clock) = coordinator();
    coord.inventory().restock("laptop", 5).await.unwrap();
    let outcome = coord.inventory().decrement("laptop", 1, "ord_1").await.unwrap();

    let json = serde_json::to_value(outcome).unwrap();
    assert_eq!(json["stockBefore"], 5);
    assert_eq!(json["newStock"], 4);
    assert_eq!(json["rejection"], serde_json::Value::Null);
}
