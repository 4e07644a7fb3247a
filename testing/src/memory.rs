//! In-memory storage backend.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a panicking test

use distribution_core::{
    AggregateStore, Book, BookId, CatalogStore, Center, CenterId, Contribution,
    DistributionEvent, DistributionLedger, EntityKind, StockEvent, StockLedger, StoreError,
    StoreFuture, User, UserId,
};
use indexmap::IndexMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct State {
    books: IndexMap<BookId, Book>,
    centers: IndexMap<CenterId, Center>,
    users: IndexMap<UserId, User>,
    stock: Vec<StockEvent>,
}

/// In-memory store implementing every storage trait.
///
/// Records keep insertion order. Each call takes the lock once, so per-record
/// increments are atomic like the production backend's. Clones share state.
///
/// Work happens when the returned future is first polled, not when the method
/// is called; a wrapper that drops the future unpolled leaves state untouched.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a book from the catalog, leaving distributions that reference it.
    ///
    /// Lets tests exercise reads over events whose book no longer resolves.
    pub fn remove_book(&self, id: BookId) -> Option<Book> {
        self.state.write().unwrap().books.shift_remove(&id)
    }

    /// Overwrite a center's record, bypassing the ledger.
    pub fn put_center(&self, center: Center) {
        self.state
            .write()
            .unwrap()
            .centers
            .insert(center.id, center);
    }

    /// Number of stock entries across all centers
    #[must_use]
    pub fn stock_len(&self) -> usize {
        self.state.read().unwrap().stock.len()
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> T) -> T {
        f(&self.state.read().unwrap())
    }

    fn write<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        f(&mut self.state.write().unwrap())
    }
}

fn missing(entity: EntityKind, id: impl ToString) -> StoreError {
    StoreError::NotFound {
        entity,
        id: id.to_string(),
    }
}

impl CatalogStore for InMemoryStore {
    fn book(&self, id: BookId) -> StoreFuture<'_, Option<Book>> {
        Box::pin(async move { Ok(self.read(|s| s.books.get(&id).cloned())) })
    }

    fn books(&self) -> StoreFuture<'_, Vec<Book>> {
        Box::pin(async move { Ok(self.read(|s| s.books.values().cloned().collect())) })
    }

    fn center(&self, id: CenterId) -> StoreFuture<'_, Option<Center>> {
        Box::pin(async move { Ok(self.read(|s| s.centers.get(&id).cloned())) })
    }

    fn centers(&self) -> StoreFuture<'_, Vec<Center>> {
        Box::pin(async move { Ok(self.read(|s| s.centers.values().cloned().collect())) })
    }

    fn user(&self, id: UserId) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move { Ok(self.read(|s| s.users.get(&id).cloned())) })
    }

    fn users_in_center(&self, center: CenterId) -> StoreFuture<'_, Vec<User>> {
        Box::pin(async move {
            Ok(self.read(|s| {
                s.users
                    .values()
                    .filter(|u| u.center == center)
                    .cloned()
                    .collect()
            }))
        })
    }

    fn find_user_by_number(
        &self,
        center: CenterId,
        number: String,
    ) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            Ok(self.read(|s| {
                s.users
                    .values()
                    .find(|u| u.center == center && u.number == number)
                    .cloned()
            }))
        })
    }

    fn insert_book(&self, book: Book) -> StoreFuture<'_, Book> {
        Box::pin(async move {
            self.write(|s| {
                s.books.insert(book.id, book.clone());
            });
            Ok(book)
        })
    }

    fn insert_center(&self, center: Center) -> StoreFuture<'_, Center> {
        Box::pin(async move {
            self.write(|s| {
                if s.centers.values().any(|c| c.name == center.name) {
                    return Err(StoreError::Duplicate {
                        entity: EntityKind::Center,
                        detail: format!("name {:?} is taken", center.name),
                    });
                }
                s.centers.insert(center.id, center.clone());
                Ok(center)
            })
        })
    }

    fn insert_user(&self, user: User) -> StoreFuture<'_, User> {
        Box::pin(async move {
            self.write(|s| {
                if !s.centers.contains_key(&user.center) {
                    return Err(missing(EntityKind::Center, user.center));
                }
                if s
                    .users
                    .values()
                    .any(|u| u.center == user.center && u.number == user.number)
                {
                    return Err(StoreError::Duplicate {
                        entity: EntityKind::User,
                        detail: format!("number {} is already registered", user.number),
                    });
                }
                s.users.insert(user.id, user.clone());
                Ok(user)
            })
        })
    }
}

impl DistributionLedger for InMemoryStore {
    fn append_distribution(
        &self,
        user: UserId,
        event: DistributionEvent,
        contribution: Contribution,
    ) -> StoreFuture<'_, User> {
        Box::pin(async move {
            self.write(|s| {
                let record = s
                    .users
                    .get_mut(&user)
                    .ok_or_else(|| missing(EntityKind::User, user))?;
                record.distributions.append(event);
                record.totals.apply(&contribution);
                Ok(record.clone())
            })
        })
    }
}

impl AggregateStore for InMemoryStore {
    fn increment_center(
        &self,
        center: CenterId,
        contribution: Contribution,
    ) -> StoreFuture<'_, Center> {
        Box::pin(async move {
            self.write(|s| {
                let record = s
                    .centers
                    .get_mut(&center)
                    .ok_or_else(|| missing(EntityKind::Center, center))?;
                record.totals.apply(&contribution);
                Ok(record.clone())
            })
        })
    }
}

impl StockLedger for InMemoryStore {
    fn append_stock(&self, entry: StockEvent) -> StoreFuture<'_, StockEvent> {
        Box::pin(async move {
            self.write(|s| s.stock.push(entry.clone()));
            Ok(entry)
        })
    }

    fn stock_for_center(&self, center: CenterId) -> StoreFuture<'_, Vec<StockEvent>> {
        Box::pin(async move {
            Ok(self.read(|s| {
                s.stock
                    .iter()
                    .filter(|e| e.center == center)
                    .cloned()
                    .collect()
            }))
        })
    }
}
