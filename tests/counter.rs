use atomic_coord::{Coordinator, ManualClock, MemoryStore};
use futures::future::join_all;
use std::sync::Arc;

fn coordinator() -> Coordinator {
    let clock = Arc::new(ManualClock::at_unix_seconds(1_700_000_040));
    Coordinator::builder()
        .with_store(MemoryStore::with_clock(clock.clone()))
        .with_clock(clock)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_missing_counter_starts_at_zero() {
    let coord = coordinator();
    let counter = coord.counter();

    assert_eq!(counter.current("counter:page_views").await.unwrap(), 0);

    let outcome = counter.increment("counter:page_views", 1, None).await.unwrap();
    assert!(outcome.accepted);
    assert_eq!(outcome.value, 1);
    assert_eq!(counter.current("counter:page_views").await.unwrap(), 1);
}

#[tokio::test]
async fn test_max_rejects_without_mutation() {
    let coord = coordinator();
    let counter = coord.counter();

    assert_eq!(counter.increment("seats", 8, Some(10)).await.unwrap().value, 8);

    let outcome = counter.increment("seats", 3, Some(10)).await.unwrap();
    assert!(!outcome.accepted);
    assert_eq!(outcome.value, 8);
    assert_eq!(counter.current("seats").await.unwrap(), 8);

    // Exactly reaching the max is allowed
    let outcome = counter.increment("seats", 2, Some(10)).await.unwrap();
    assert!(outcome.accepted);
    assert_eq!(outcome.value, 10);
}

#[tokio::test]
async fn test_negative_delta_decrements() {
    let coord = coordinator();
    let counter = coord.counter();

    counter.increment("balance", 5, None).await.unwrap();
    let outcome = counter.increment("balance", -7, Some(10)).await.unwrap();
    assert!(outcome.accepted);
    assert_eq!(outcome.value, -2);
}

#[tokio::test]
async fn test_non_integer_value_is_unexpected() {
    let clock = Arc::new(ManualClock::at_unix_seconds(0));
    let store = MemoryStore::with_clock(clock.clone());
    store.set("views", "lots");
    let coord = Coordinator::builder()
        .with_store(store)
        .with_clock(clock)
        .build()
        .unwrap();

    let err = coord.counter().current("views").await.unwrap_err();
    assert!(!err.is_client_error());
    assert!(!err.is_retryable());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_boundedness_under_concurrency() {
    let coord = coordinator();

    let tasks = (0..100).map(|i| {
        let coord = coord.clone();
        tokio::spawn(async move {
            let delta = 1 + i % 3;
            coord
                .counter()
                .increment("tickets", delta, Some(50))
                .await
                .map(|outcome| (delta, outcome))
        })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let accepted_sum: i64 = results
        .iter()
        .filter(|(_, outcome)| outcome.accepted)
        .map(|(delta, _)| delta)
        .sum();
    let final_value = coord.counter().current("tickets").await.unwrap();

    assert!(final_value <= 50);
    assert_eq!(accepted_sum, final_value);
    for (_, outcome) in &results {
        assert!(outcome.value <= 50);
    }

    let snapshot = coord.metrics().snapshot();
    assert_eq!(snapshot.counter_accepted + snapshot.counter_rejected, 100);
}

#[tokio::test]
async fn test_key_prefix_namespaces_counters() {
    let clock = Arc::new(ManualClock::at_unix_seconds(0));
    let store = MemoryStore::with_clock(clock.clone());
    let tenant_a = Coordinator::builder()
        .with_store(store.clone())
        .with_clock(clock.clone())
        .with_key_prefix("a:")
        .build()
        .unwrap();
    let tenant_b = Coordinator::builder()
        .with_store(store)
        .with_clock(clock)
        .with_key_prefix("b:")
        .build()
        .unwrap();

    tenant_a.counter().increment("views", 3, None).await.unwrap();
    assert_eq!(tenant_a.counter().current("views").await.unwrap(), 3);
    assert_eq!(tenant_b.counter().current("views").await.unwrap(), 0);
}
