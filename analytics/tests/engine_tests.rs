//! Analytics engine over the in-memory store.

#![allow(clippy::unwrap_used)]

use chrono::{DateTime, FixedOffset, Utc};
use distribution_analytics::AnalyticsEngine;
use distribution_core::{
    AggregateStore, Book, Contribution, DistributionEvent, DistributionLedger,
    ErrorKind, Money, Points, StockEvent, StockLedger, User,
};
use distribution_testing::fixtures::{self, Seeded, noon};
use distribution_testing::{FixedClock, InMemoryStore};
use std::sync::Arc;

fn engine(store: &InMemoryStore, now: DateTime<Utc>) -> AnalyticsEngine {
    AnalyticsEngine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(FixedClock::new(now)),
        FixedOffset::east_opt(0).unwrap(),
    )
}

async fn hand_out(store: &InMemoryStore, user: &User, book: &Book, paid: i64, at: DateTime<Utc>) {
    let price_paid = Money::from_rupees(paid);
    let contribution = Contribution::assess(book, price_paid);
    let event = DistributionEvent::new(book.id, price_paid, at).unwrap();
    store
        .append_distribution(user.id, event, contribution)
        .await
        .unwrap();
    store.increment_center(user.center, contribution).await.unwrap();
}

async fn seeded() -> (InMemoryStore, Seeded) {
    let store = InMemoryStore::new();
    let seeded = fixtures::seed(&store).await;
    (store, seeded)
}

#[tokio::test]
async fn analyze_center_counts_only_its_users() {
    let (store, s) = seeded().await;
    let day = noon(2024, 3, 10);
    hand_out(&store, &s.ravi, &s.gita, 150, day).await;
    hand_out(&store, &s.sita, &s.small, 30, day).await;
    hand_out(&store, &s.gopal, &s.gita, 100, day).await;

    let report = engine(&store, day).analyze_center(s.center.id).await.unwrap();

    assert_eq!(report.total_users, 2);
    assert_eq!(report.type_breakdown.len(), 2);
    assert_eq!(report.type_breakdown[0].figures.total_donation, Money::from_rupees(50));
    assert_eq!(report.center.totals.points, Points::from_whole(3));
}

#[tokio::test]
async fn daily_defaults_to_today_and_echoes_date() {
    let (store, s) = seeded().await;
    let today = noon(2024, 3, 10);
    hand_out(&store, &s.ravi, &s.gita, 100, today).await;
    hand_out(&store, &s.ravi, &s.gita, 100, noon(2024, 3, 9)).await;

    let engine = engine(&store, today);
    let report = engine.daily_analytics(s.center.id, None).await.unwrap();
    assert_eq!(report.date.to_string(), "2024-03-10");
    assert_eq!(report.totals.total_distributions, 1);

    let yesterday = engine
        .daily_analytics(s.center.id, Some("2024-03-09"))
        .await
        .unwrap();
    assert_eq!(yesterday.totals.total_distributions, 1);
    assert_eq!(yesterday.top_devotees[0].user.name, "Ravi");
}

#[tokio::test]
async fn daily_rejects_bad_dates_and_unknown_centers() {
    let (store, s) = seeded().await;
    let engine = engine(&store, noon(2024, 3, 10));

    let bad = engine
        .daily_analytics(s.center.id, Some("2024-13-01"))
        .await
        .unwrap_err();
    assert_eq!(bad.kind(), ErrorKind::InvalidArgument);

    let missing = engine
        .daily_analytics(distribution_core::CenterId::new(), None)
        .await
        .unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn stock_status_reconciles_per_book() {
    let (store, s) = seeded().await;
    let day = noon(2024, 3, 10);
    store
        .append_stock(StockEvent::new(s.center.id, s.gita.id, 5, Money::from_rupees(500), day).unwrap())
        .await
        .unwrap();
    hand_out(&store, &s.ravi, &s.gita, 150, day).await;
    hand_out(&store, &s.sita, &s.gita, 60, day).await;
    // other center's hand-out must not count
    hand_out(&store, &s.gopal, &s.gita, 100, day).await;

    let status = engine(&store, day).stock_status(s.center.id).await.unwrap();
    assert_eq!(status.current_stock[0].remaining, 3);
    assert_eq!(status.totals.total_cost_paid, Money::from_rupees(500));
    assert_eq!(status.totals.total_revenue, Money::from_rupees(210));
    assert_eq!(status.totals.net_profit, Money::from_rupees(-290));
    assert_eq!(status.recent_entries.len(), 1);
}

#[tokio::test]
async fn views_are_idempotent() {
    let (store, s) = seeded().await;
    let day = noon(2024, 3, 10);
    hand_out(&store, &s.ravi, &s.gita, 150, day).await;
    hand_out(&store, &s.sita, &s.mega, 300, day).await;
    let engine = engine(&store, day);

    assert_eq!(
        engine.analyze_center(s.center.id).await.unwrap(),
        engine.analyze_center(s.center.id).await.unwrap()
    );
    assert_eq!(
        engine.daily_analytics(s.center.id, None).await.unwrap(),
        engine.daily_analytics(s.center.id, None).await.unwrap()
    );
    assert_eq!(
        engine.stock_status(s.center.id).await.unwrap(),
        engine.stock_status(s.center.id).await.unwrap()
    );
}

#[tokio::test]
async fn removed_books_are_skipped_but_still_counted_for_the_user() {
    let (store, s) = seeded().await;
    let day = noon(2024, 3, 10);
    hand_out(&store, &s.ravi, &s.gita, 100, day).await;
    hand_out(&store, &s.ravi, &s.mega, 400, day).await;
    store.remove_book(s.mega.id);

    let engine = engine(&store, day);
    let user = engine.user_analytics(s.ravi.id).await.unwrap();
    assert_eq!(user.total_distributions, 2);
    assert_eq!(user.book_breakdown.len(), 1);

    let center = engine.analyze_center(s.center.id).await.unwrap();
    assert_eq!(center.book_breakdown.len(), 1);
}

#[tokio::test]
async fn audit_spots_a_center_that_fell_behind() {
    let (store, s) = seeded().await;
    let day = noon(2024, 3, 10);
    hand_out(&store, &s.ravi, &s.gita, 150, day).await;
    let engine = engine(&store, day);
    assert!(engine.audit_center(s.center.id).await.unwrap().is_consistent());

    // user side lands, center side never does
    let contribution = Contribution::assess(&s.gita, Money::from_rupees(60));
    let event = DistributionEvent::new(s.gita.id, Money::from_rupees(60), day).unwrap();
    store
        .append_distribution(s.ravi.id, event, contribution)
        .await
        .unwrap();

    let report = engine.audit_center(s.center.id).await.unwrap();
    assert!(!report.is_consistent());
    assert_eq!(report.drift.loss, Money::from_rupees(-40));
}

#[tokio::test]
async fn overviews_list_every_center_by_name() {
    let (store, s) = seeded().await;
    hand_out(&store, &s.gopal, &s.gita, 100, noon(2024, 3, 10)).await;

    let rows = engine(&store, noon(2024, 3, 10))
        .center_overviews()
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name, "IYMF AECS");
    assert_eq!(rows[0].total_users, 1);
    assert_eq!(rows[0].points, Points::from_whole(2));
    assert_eq!(rows[1].total_users, 2);
}
