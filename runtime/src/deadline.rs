//! Per-call storage deadlines.
//!
//! [`Deadline`] wraps any backend and bounds every storage call with
//! `tokio::time::timeout`. A call that overruns fails with
//! [`StoreError::Timeout`], which the engine reports as `Transient`.
//!
//! The inner future is dropped on timeout. For a write the outcome is then
//! unknown, which is exactly what `Transient` means for writes.

use crate::metrics::StorageMetrics;
use distribution_core::{
    AggregateStore, Book, BookId, CatalogStore, Center, CenterId, Contribution,
    DistributionEvent, DistributionLedger, StockEvent, StockLedger, StoreError, StoreFuture, User,
    UserId,
};
use std::time::Duration;

/// A storage backend whose calls are bounded by `limit`.
#[derive(Debug, Clone)]
pub struct Deadline<S> {
    inner: S,
    limit: Duration,
}

impl<S> Deadline<S> {
    /// Wraps `inner`, bounding each call by `limit`.
    pub const fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }

    /// The per-call limit.
    pub const fn limit(&self) -> Duration {
        self.limit
    }

    /// The wrapped backend.
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    fn guard<'a, T: Send + 'a>(
        &self,
        operation: &'static str,
        call: StoreFuture<'a, T>,
    ) -> StoreFuture<'a, T> {
        let limit = self.limit;
        Box::pin(async move {
            if let Ok(result) = tokio::time::timeout(limit, call).await {
                result
            } else {
                StorageMetrics::record_timeout(operation);
                tracing::warn!(
                    operation,
                    limit_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    "Storage call timed out"
                );
                Err(StoreError::Timeout {
                    operation,
                    after: limit,
                })
            }
        })
    }
}

impl<S: CatalogStore> CatalogStore for Deadline<S> {
    fn book(&self, id: BookId) -> StoreFuture<'_, Option<Book>> {
        self.guard("book", self.inner.book(id))
    }

    fn books(&self) -> StoreFuture<'_, Vec<Book>> {
        self.guard("books", self.inner.books())
    }

    fn center(&self, id: CenterId) -> StoreFuture<'_, Option<Center>> {
        self.guard("center", self.inner.center(id))
    }

    fn centers(&self) -> StoreFuture<'_, Vec<Center>> {
        self.guard("centers", self.inner.centers())
    }

    fn user(&self, id: UserId) -> StoreFuture<'_, Option<User>> {
        self.guard("user", self.inner.user(id))
    }

    fn users_in_center(&self, center: CenterId) -> StoreFuture<'_, Vec<User>> {
        self.guard("users_in_center", self.inner.users_in_center(center))
    }

    fn find_user_by_number(
        &self,
        center: CenterId,
        number: String,
    ) -> StoreFuture<'_, Option<User>> {
        self.guard(
            "find_user_by_number",
            self.inner.find_user_by_number(center, number),
        )
    }

    fn insert_book(&self, book: Book) -> StoreFuture<'_, Book> {
        self.guard("insert_book", self.inner.insert_book(book))
    }

    fn insert_center(&self, center: Center) -> StoreFuture<'_, Center> {
        self.guard("insert_center", self.inner.insert_center(center))
    }

    fn insert_user(&self, user: User) -> StoreFuture<'_, User> {
        self.guard("insert_user", self.inner.insert_user(user))
    }
}

impl<S: DistributionLedger> DistributionLedger for Deadline<S> {
    fn append_distribution(
        &self,
        user: UserId,
        event: DistributionEvent,
        contribution: Contribution,
    ) -> StoreFuture<'_, User> {
        self.guard(
            "append_distribution",
            self.inner.append_distribution(user, event, contribution),
        )
    }
}

impl<S: AggregateStore> AggregateStore for Deadline<S> {
    fn increment_center(
        &self,
        center: CenterId,
        contribution: Contribution,
    ) -> StoreFuture<'_, Center> {
        self.guard(
            "increment_center",
            self.inner.increment_center(center, contribution),
        )
    }
}

impl<S: StockLedger> StockLedger for Deadline<S> {
    fn append_stock(&self, entry: StockEvent) -> StoreFuture<'_, StockEvent> {
        self.guard("append_stock", self.inner.append_stock(entry))
    }

    fn stock_for_center(&self, center: CenterId) -> StoreFuture<'_, Vec<StockEvent>> {
        self.guard("stock_for_center", self.inner.stock_for_center(center))
    }
}
