//! Storage traits the ledger and the analytics engine are written against.
//!
//! # Design
//!
//! Four narrow traits instead of one repository:
//!
//! - [`CatalogStore`]: lookups and inserts of books, centers and users
//! - [`DistributionLedger`]: appending a hand-out to a user's log
//! - [`AggregateStore`]: incrementing a center's running totals
//! - [`StockLedger`]: appending and listing stock entries
//!
//! Increments must be atomic per record. `append_distribution` appends the event
//! *and* bumps the user's totals as one unit; `increment_center` applies the same
//! contribution to the center. The two are separate calls because a backend is
//! not required to offer cross-record transactions.
//!
//! # Dyn Compatibility
//!
//! Methods return boxed futures so the engine can hold `Arc<dyn CatalogStore>`
//! and friends, and so tests can swap in-memory or fault-injecting doubles.
//!
//! # Implementations
//!
//! - `PostgresStore` (in `distribution-postgres`): production backend
//! - `InMemoryStore` (in `distribution-testing`): deterministic tests

use crate::aggregate::Contribution;
use crate::catalog::{Book, BookId, Center, CenterId, User, UserId};
use crate::error::StoreError;
use crate::ledger::{DistributionEvent, StockEvent};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by every storage method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Catalog lookups and inserts.
///
/// Listing methods return records in insertion order.
pub trait CatalogStore: Send + Sync {
    /// Looks up a book.
    fn book(&self, id: BookId) -> StoreFuture<'_, Option<Book>>;

    /// All books.
    fn books(&self) -> StoreFuture<'_, Vec<Book>>;

    /// Looks up a center.
    fn center(&self, id: CenterId) -> StoreFuture<'_, Option<Center>>;

    /// All centers.
    fn centers(&self) -> StoreFuture<'_, Vec<Center>>;

    /// Looks up a user, including their distribution log.
    fn user(&self, id: UserId) -> StoreFuture<'_, Option<User>>;

    /// Users belonging to `center`, in registration order.
    fn users_in_center(&self, center: CenterId) -> StoreFuture<'_, Vec<User>>;

    /// Finds the user of `center` registered with phone `number`.
    fn find_user_by_number(&self, center: CenterId, number: String)
    -> StoreFuture<'_, Option<User>>;

    /// Inserts a book.
    fn insert_book(&self, book: Book) -> StoreFuture<'_, Book>;

    /// Inserts a center.
    ///
    /// Fails with [`StoreError::Duplicate`] if the name is taken.
    fn insert_center(&self, center: Center) -> StoreFuture<'_, Center>;

    /// Inserts a user.
    ///
    /// Fails with [`StoreError::Duplicate`] if the center already has a user
    /// with the same number, and [`StoreError::NotFound`] if the center is missing.
    fn insert_user(&self, user: User) -> StoreFuture<'_, User>;
}

/// The user side of a distribution append.
pub trait DistributionLedger: Send + Sync {
    /// Appends `event` to the user's log and adds `contribution` to their totals
    /// in one atomic step, returning the updated user.
    ///
    /// Fails with [`StoreError::NotFound`] if the user does not exist.
    fn append_distribution(
        &self,
        user: UserId,
        event: DistributionEvent,
        contribution: Contribution,
    ) -> StoreFuture<'_, User>;
}

/// The center side of a distribution append.
pub trait AggregateStore: Send + Sync {
    /// Atomically adds `contribution` to the center's totals.
    ///
    /// Fails with [`StoreError::NotFound`] if the center does not exist.
    fn increment_center(
        &self,
        center: CenterId,
        contribution: Contribution,
    ) -> StoreFuture<'_, Center>;
}

/// Stock entries.
pub trait StockLedger: Send + Sync {
    /// Appends a stock entry.
    fn append_stock(&self, entry: StockEvent) -> StoreFuture<'_, StockEvent>;

    /// Stock entries for `center`, in append order.
    fn stock_for_center(&self, center: CenterId) -> StoreFuture<'_, Vec<StockEvent>>;
}

/// A backend that implements every storage trait.
pub trait Store: CatalogStore + DistributionLedger + AggregateStore + StockLedger {}

impl<T> Store for T where T: CatalogStore + DistributionLedger + AggregateStore + StockLedger {}
