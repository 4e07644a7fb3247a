//! The write side: distribution and stock appends, plus catalog registration.
//!
//! # Distribution append
//!
//! 1. Resolve the user, the book and the user's center. Any miss fails the
//!    call before anything is written.
//! 2. Price the hand-out into a [`Contribution`]. A contribution that would
//!    overflow the user's or the center's totals is refused.
//! 3. Append the event to the user's log together with the user's totals
//!    (one atomic storage call).
//! 4. Apply the same contribution to the center's totals.
//!
//! If step 4 fails after step 3 landed, the call fails with
//! [`LedgerError::Inconsistent`]. Nothing is rolled back; the drift shows up in
//! a consistency audit of the center.
//!
//! # Cancellation
//!
//! Appends run on their own tokio task. A caller that stops polling does not
//! interrupt a half-finished append; the outcome is just never delivered.

use crate::metrics::LedgerMetrics;
use distribution_analytics::{BookIndex, PopulatedUser, populate_user};
use distribution_core::environment::Clock;
use distribution_core::{
    AggregateStore, Book, BookId, BookType, CatalogStore, Center, CenterId, Contribution,
    DistributionEvent, DistributionLedger, EntityKind, Language, LedgerError, Money, Points,
    Result, StockEvent, StockLedger, Store, StoreError, User, UserId,
};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Appends to the distribution and stock ledgers and keeps aggregates in step.
#[derive(Clone)]
pub struct LedgerService {
    catalog: Arc<dyn CatalogStore>,
    distributions: Arc<dyn DistributionLedger>,
    aggregates: Arc<dyn AggregateStore>,
    stock: Arc<dyn StockLedger>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for LedgerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerService").finish_non_exhaustive()
    }
}

impl LedgerService {
    /// Wires the service to its collaborators.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        distributions: Arc<dyn DistributionLedger>,
        aggregates: Arc<dyn AggregateStore>,
        stock: Arc<dyn StockLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            distributions,
            aggregates,
            stock,
            clock,
        }
    }

    /// Wires every collaborator to the same backend.
    #[must_use]
    pub fn from_store<S: Store + 'static>(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::clone(&store) as Arc<dyn CatalogStore>,
            Arc::clone(&store) as Arc<dyn DistributionLedger>,
            Arc::clone(&store) as Arc<dyn AggregateStore>,
            store,
            clock,
        )
    }

    /// Records that `user` handed out `book` for `price_paid`.
    ///
    /// Returns the updated user with its history joined to the catalog.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidArgument`] for a negative price, or one that
    ///   would overflow the user's or the center's totals
    /// - [`LedgerError::NotFound`] if the user, the book or the user's center is missing
    /// - [`LedgerError::Transient`] if storage failed; the append may have landed
    /// - [`LedgerError::Inconsistent`] if the user was updated but the center was not
    pub async fn record_distribution(
        &self,
        user: UserId,
        book: BookId,
        price_paid: Money,
    ) -> Result<PopulatedUser> {
        let this = self.clone();
        let span = tracing::info_span!("record_distribution", user = %user, book = %book);
        let outcome = run_to_completion(
            "record_distribution",
            async move { this.distribute(user, book, price_paid).await }.instrument(span),
        )
        .await;
        if let Err(err) = &outcome {
            LedgerMetrics::record_rejection(err.kind());
        }
        outcome
    }

    async fn distribute(
        &self,
        user_id: UserId,
        book_id: BookId,
        price_paid: Money,
    ) -> Result<PopulatedUser> {
        let started = Instant::now();
        if price_paid.is_negative() {
            return Err(LedgerError::invalid("price paid cannot be negative"));
        }

        let (user, book) = futures::try_join!(self.catalog.user(user_id), self.catalog.book(book_id))?;
        let user = user.ok_or_else(|| LedgerError::not_found(EntityKind::User, user_id))?;
        let book = book.ok_or_else(|| LedgerError::not_found(EntityKind::Book, book_id))?;
        let (center, history) =
            futures::try_join!(self.catalog.center(user.center), self.history_books(&user))?;
        let center = center.ok_or_else(|| LedgerError::not_found(EntityKind::Center, user.center))?;

        let contribution = Contribution::assess(&book, price_paid);
        if user.totals.checked_with(&contribution).is_none()
            || center.totals.checked_with(&contribution).is_none()
        {
            return Err(LedgerError::invalid("distribution would overflow running totals"));
        }
        let event = DistributionEvent::new(book.id, price_paid, self.clock.now())?;
        let books: BookIndex = history.into_iter().chain(std::iter::once(book)).collect();

        let updated = self
            .distributions
            .append_distribution(user.id, event, contribution)
            .await?;
        LedgerMetrics::record_distribution(started.elapsed());

        if let Err(err) = self.aggregates.increment_center(center.id, contribution).await {
            LedgerMetrics::record_drift();
            tracing::error!(
                center = %center.id,
                points = %contribution.points,
                donation = %contribution.donation,
                loss = %contribution.loss,
                error = %err,
                "Center totals not updated after user append"
            );
            return Err(LedgerError::Inconsistent {
                user_id: user.id,
                center_id: center.id,
                reason: err.to_string(),
            });
        }

        tracing::info!(
            center = %center.id,
            price_paid = %price_paid,
            points = %contribution.points,
            donation = %contribution.donation,
            loss = %contribution.loss,
            "Distribution recorded"
        );
        Ok(populate_user(&updated, &books))
    }

    /// Books referenced by `user`'s history that are still in the catalog.
    async fn history_books(&self, user: &User) -> std::result::Result<Vec<Book>, StoreError> {
        let mut seen = HashSet::new();
        let lookups = user
            .distributions
            .iter()
            .filter(|event| seen.insert(event.book))
            .map(|event| self.catalog.book(event.book));
        let found = futures::future::try_join_all(lookups).await?;
        Ok(found.into_iter().flatten().collect())
    }

    /// Records `quantity` copies of `book` arriving at `center`.
    ///
    /// `cost_paid` defaults to the list price times the quantity.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidArgument`] for a zero quantity, a negative cost,
    ///   or a default cost too large to represent
    /// - [`LedgerError::NotFound`] if the center or the book is missing
    /// - [`LedgerError::Transient`] if storage failed; the entry may have landed
    pub async fn record_stock(
        &self,
        center: CenterId,
        book: BookId,
        quantity: u32,
        cost_paid: Option<Money>,
    ) -> Result<StockEvent> {
        let this = self.clone();
        let span = tracing::info_span!("record_stock", center = %center, book = %book, quantity);
        run_to_completion(
            "record_stock",
            async move { this.stock_in(center, book, quantity, cost_paid).await }.instrument(span),
        )
        .await
    }

    async fn stock_in(
        &self,
        center_id: CenterId,
        book_id: BookId,
        quantity: u32,
        cost_paid: Option<Money>,
    ) -> Result<StockEvent> {
        let started = Instant::now();
        if quantity == 0 {
            return Err(LedgerError::invalid("quantity must be at least 1"));
        }
        if cost_paid.is_some_and(|cost| cost.is_negative()) {
            return Err(LedgerError::invalid("cost paid cannot be negative"));
        }

        let (center, book) =
            futures::try_join!(self.catalog.center(center_id), self.catalog.book(book_id))?;
        let center = center.ok_or_else(|| LedgerError::not_found(EntityKind::Center, center_id))?;
        let book = book.ok_or_else(|| LedgerError::not_found(EntityKind::Book, book_id))?;

        let cost_paid = match cost_paid {
            Some(cost) => cost,
            None => book
                .price
                .checked_mul(quantity)
                .ok_or_else(|| LedgerError::invalid("stock cost out of range"))?,
        };
        let entry = StockEvent::new(center.id, book.id, quantity, cost_paid, self.clock.now())?;
        let entry = self.stock.append_stock(entry).await?;

        LedgerMetrics::record_stock(started.elapsed());
        tracing::info!(stock = %entry.id, cost_paid = %entry.cost_paid, "Stock recorded");
        Ok(entry)
    }

    /// Adds a book to the catalog.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] for an empty name or negative amounts,
    /// or a transient storage failure.
    pub async fn register_book(
        &self,
        name: &str,
        book_type: BookType,
        language: Language,
        point: Points,
        price: Money,
    ) -> Result<Book> {
        let book = Book::new(name, book_type, language, point, price)?;
        let book = self.catalog.insert_book(book).await?;
        tracing::info!(book = %book.id, name = %book.name, "Book registered");
        Ok(book)
    }

    /// Creates a center with zero totals.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] for an empty or taken name, or a
    /// transient storage failure.
    pub async fn register_center(&self, name: &str) -> Result<Center> {
        let center = Center::new(name)?;
        let center = self.catalog.insert_center(center).await?;
        tracing::info!(center = %center.id, name = %center.name, "Center registered");
        Ok(center)
    }

    /// Returns the user of `center` with phone `number`, creating it first if needed.
    ///
    /// An existing user is returned unchanged, whatever `name` says.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] for an empty name or number,
    /// [`LedgerError::NotFound`] if the center is missing, or a transient
    /// storage failure.
    pub async fn register_user(&self, name: &str, number: &str, center: CenterId) -> Result<User> {
        let candidate = User::new(name, number, center, self.clock.now())?;
        if self.catalog.center(center).await?.is_none() {
            return Err(LedgerError::not_found(EntityKind::Center, center));
        }

        if let Some(existing) = self
            .catalog
            .find_user_by_number(center, candidate.number.clone())
            .await?
        {
            tracing::debug!(user = %existing.id, "User already registered");
            return Ok(existing);
        }

        let number = candidate.number.clone();
        match self.catalog.insert_user(candidate).await {
            Ok(user) => {
                tracing::info!(user = %user.id, center = %center, "User registered");
                Ok(user)
            }
            // Lost a race with a concurrent registration of the same number.
            Err(StoreError::Duplicate { .. }) => self
                .catalog
                .find_user_by_number(center, number.clone())
                .await?
                .ok_or_else(|| LedgerError::not_found(EntityKind::User, number)),
            Err(err) => Err(err.into()),
        }
    }
}

/// Runs `write` on its own task so that dropping the caller does not cancel it.
async fn run_to_completion<T, F>(operation: &'static str, write: F) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    match tokio::spawn(write).await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(operation, error = %err, "Write task did not complete");
            Err(LedgerError::Transient(format!("{operation} task failed: {err}")))
        }
    }
}
