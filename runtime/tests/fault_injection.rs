//! Storage failures, deadlines and cancellation.

#![allow(clippy::unwrap_used)]

use distribution_core::{CatalogStore, ErrorKind, LedgerError, Money, Points, StoreError};
use distribution_runtime::requests::RecordDistribution;
use distribution_runtime::{DistributionEngine, EngineConfig, RetryPolicy};
use distribution_testing::fixtures::{self, Seeded};
use distribution_testing::{FaultyStore, InMemoryStore, test_clock};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

async fn setup(config: EngineConfig) -> (FaultyStore<InMemoryStore>, Seeded, DistributionEngine) {
    let store = FaultyStore::new(InMemoryStore::new());
    let seeded = fixtures::seed(store.inner()).await;
    let engine = DistributionEngine::new(store.clone(), Arc::new(test_clock()), &config);
    (store, seeded, engine)
}

fn config() -> EngineConfig {
    EngineConfig {
        storage_timeout: Duration::from_millis(200),
        read_retry: RetryPolicy::builder()
            .max_retries(2)
            .initial_delay(Duration::from_millis(10))
            .jitter(0.0)
            .build(),
        ..EngineConfig::default()
    }
}

fn gita_for_ravi(s: &Seeded, price: i64) -> RecordDistribution {
    RecordDistribution {
        user_id: s.ravi.id.to_string(),
        book_id: s.gita.id.to_string(),
        price_paid: Some(json!(price)),
    }
}

#[tokio::test]
async fn user_side_failure_is_transient_and_leaves_center_untouched() {
    let (store, s, engine) = setup(config()).await;
    store.fail(
        "append_distribution",
        StoreError::Unavailable("connection reset".into()),
    );

    let err = engine.record_distribution(&gita_for_ravi(&s, 100)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transient);
    // writes are never retried
    assert_eq!(store.calls("append_distribution"), 1);
    assert_eq!(store.calls("increment_center"), 0);

    let center = store.inner().center(s.center.id).await.unwrap().unwrap();
    assert_eq!(center.totals.points, Points::ZERO);
}

#[tokio::test]
async fn center_side_failure_is_inconsistent_and_audit_sees_the_drift() {
    let (store, s, engine) = setup(config()).await;
    store.fail("increment_center", StoreError::Backend("disk full".into()));

    let err = engine.record_distribution(&gita_for_ravi(&s, 150)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Inconsistent);
    assert!(matches!(
        err,
        LedgerError::Inconsistent { user_id, center_id, .. }
            if user_id == s.ravi.id && center_id == s.center.id
    ));

    let ravi = store.inner().user(s.ravi.id).await.unwrap().unwrap();
    assert_eq!(ravi.totals.points, Points::from_whole(2));

    store.heal("increment_center");
    let audit = engine.audit_center(&s.center.id.to_string()).await.unwrap();
    assert!(!audit.is_consistent());
    assert_eq!(audit.drift.points, Points::from_whole(-2));
    assert_eq!(audit.drift.donation, Money::from_rupees(-50));
}

#[tokio::test(start_paused = true)]
async fn slow_center_update_times_out_as_inconsistent() {
    let (store, s, engine) = setup(config()).await;
    store.delay("increment_center", Duration::from_secs(30));

    let err = engine.record_distribution(&gita_for_ravi(&s, 100)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Inconsistent);
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn slow_reads_time_out_after_bounded_retries() {
    let (store, s, engine) = setup(config()).await;
    store.delay("users_in_center", Duration::from_secs(30));

    let err = engine.analyze_center(&s.center.id.to_string()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transient);
    assert_eq!(store.calls("users_in_center"), 3);
}

#[tokio::test(start_paused = true)]
async fn transient_reads_recover_on_retry() {
    let (store, s, engine) = setup(config()).await;
    store.fail_times("stock_for_center", StoreError::Unavailable("failover".into()), 2);

    let status = engine.stock_status(&s.center.id.to_string()).await.unwrap();
    assert!(status.current_stock.is_empty());
    assert_eq!(store.calls("stock_for_center"), 3);
}

#[tokio::test]
async fn not_found_reads_are_not_retried() {
    let (store, _s, engine) = setup(config()).await;
    let missing = distribution_core::CenterId::new().to_string();

    let err = engine.stock_status(&missing).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(store.calls("center"), 1);
}

#[tokio::test(start_paused = true)]
async fn abandoned_write_still_completes() {
    let (store, s, engine) = setup(config()).await;
    store.delay("append_distribution", Duration::from_millis(100));

    let request = gita_for_ravi(&s, 100);
    let abandoned =
        tokio::time::timeout(Duration::from_millis(10), engine.record_distribution(&request)).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_secs(1)).await;

    let ravi = store.inner().user(s.ravi.id).await.unwrap().unwrap();
    assert_eq!(ravi.distributions.len(), 1);
    let center = store.inner().center(s.center.id).await.unwrap().unwrap();
    assert_eq!(center.totals.points, Points::from_whole(2));
}
