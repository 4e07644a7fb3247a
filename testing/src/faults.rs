//! Fault injection for storage calls.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use distribution_core::{
    AggregateStore, Book, BookId, CatalogStore, Center, CenterId, Contribution,
    DistributionEvent, DistributionLedger, StockEvent, StockLedger, Store, StoreError,
    StoreFuture, User, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What to do to a storage call.
#[derive(Clone, Debug)]
pub enum Fault {
    /// Return this error without touching the inner store.
    Fail(StoreError),
    /// Sleep before delegating to the inner store.
    Delay(Duration),
}

#[derive(Debug)]
struct Armed {
    fault: Fault,
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct Plan {
    armed: HashMap<&'static str, Armed>,
    calls: HashMap<&'static str, usize>,
}

/// Wraps a store and fails or delays chosen calls.
///
/// Calls are named after the trait method (`"append_distribution"`,
/// `"increment_center"`, `"users_in_center"`, ...). Clones share the plan.
///
/// # Example
///
/// ```
/// use distribution_testing::{FaultyStore, InMemoryStore};
/// use distribution_core::{CatalogStore, StoreError};
///
/// # tokio_test::block_on(async {
/// let store = FaultyStore::new(InMemoryStore::new());
/// store.fail_times("centers", StoreError::Unavailable("down".into()), 1);
/// assert!(store.centers().await.is_err());
/// assert!(store.centers().await.is_ok());
/// assert_eq!(store.calls("centers"), 2);
/// # });
/// ```
#[derive(Clone, Debug)]
pub struct FaultyStore<S> {
    inner: Arc<S>,
    plan: Arc<Mutex<Plan>>,
}

impl<S: Store> FaultyStore<S> {
    /// Wrap `inner` with no faults armed
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner: Arc::new(inner),
            plan: Arc::new(Mutex::new(Plan::default())),
        }
    }

    /// The wrapped store, for seeding and inspecting state directly
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Fail every call to `operation` until healed
    pub fn fail(&self, operation: &'static str, error: StoreError) {
        self.arm(operation, Fault::Fail(error), None);
    }

    /// Fail the next `times` calls to `operation`
    pub fn fail_times(&self, operation: &'static str, error: StoreError, times: usize) {
        self.arm(operation, Fault::Fail(error), Some(times));
    }

    /// Delay every call to `operation` until healed
    pub fn delay(&self, operation: &'static str, by: Duration) {
        self.arm(operation, Fault::Delay(by), None);
    }

    /// Disarm `operation`
    pub fn heal(&self, operation: &'static str) {
        self.plan.lock().unwrap().armed.remove(operation);
    }

    /// How many times `operation` was called, faulted or not
    #[must_use]
    pub fn calls(&self, operation: &'static str) -> usize {
        self.plan
            .lock()
            .unwrap()
            .calls
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    fn arm(&self, operation: &'static str, fault: Fault, remaining: Option<usize>) {
        self.plan
            .lock()
            .unwrap()
            .armed
            .insert(operation, Armed { fault, remaining });
    }

    fn take(&self, operation: &'static str) -> Option<Fault> {
        let mut plan = self.plan.lock().unwrap();
        *plan.calls.entry(operation).or_insert(0) += 1;

        let (fault, exhausted) = {
            let armed = plan.armed.get_mut(operation)?;
            match armed.remaining.as_mut() {
                Some(0) => (None, true),
                Some(n) => {
                    *n -= 1;
                    (Some(armed.fault.clone()), *n == 0)
                }
                None => (Some(armed.fault.clone()), false),
            }
        };
        if exhausted {
            plan.armed.remove(operation);
        }
        fault
    }

    fn guard<'a, T: Send + 'a>(
        &'a self,
        operation: &'static str,
        call: StoreFuture<'a, T>,
    ) -> StoreFuture<'a, T> {
        let fault = self.take(operation);
        Box::pin(async move {
            match fault {
                Some(Fault::Fail(error)) => Err(error),
                Some(Fault::Delay(by)) => {
                    tokio::time::sleep(by).await;
                    call.await
                }
                None => call.await,
            }
        })
    }
}

impl<S: Store> CatalogStore for FaultyStore<S> {
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

impl<S: Store> DistributionLedger for FaultyStore<S> {
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

impl<S: Store> AggregateStore for FaultyStore<S> {
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

impl<S: Store> StockLedger for FaultyStore<S> {
    fn append_stock(&self, entry: StockEvent) -> StoreFuture<'_, StockEvent> {
        self.guard("append_stock", self.inner.append_stock(entry))
    }

    fn stock_for_center(&self, center: CenterId) -> StoreFuture<'_, Vec<StockEvent>> {
        self.guard("stock_for_center", self.inner.stock_for_center(center))
    }
}
