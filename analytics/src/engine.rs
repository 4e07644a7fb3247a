//! The analytics engine: loads a ledger slice and runs a pure view over it.

use crate::audit::{ConsistencyReport, audit_center};
use crate::breakdown::{BookIndex, CenterAnalytics, analyze_center};
use crate::daily::{DailyAnalytics, daily_analytics};
use crate::overview::{CenterOverview, center_overviews};
use crate::stock::{StockStatus, stock_status};
use crate::user::{UserAnalytics, user_analytics};
use crate::window::{DayWindow, parse_date};
use chrono::FixedOffset;
use distribution_core::environment::Clock;
use distribution_core::{
    CatalogStore, Center, CenterId, EntityKind, LedgerError, Result, StockLedger, UserId,
};
use std::fmt;
use std::sync::Arc;

/// Read-only analytics over the catalog and both ledgers.
///
/// Every call re-reads what it needs; nothing is cached, so two calls with no
/// write in between return identical reports.
#[derive(Clone)]
pub struct AnalyticsEngine {
    catalog: Arc<dyn CatalogStore>,
    stock: Arc<dyn StockLedger>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl fmt::Debug for AnalyticsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticsEngine")
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl AnalyticsEngine {
    /// Wires the engine to its stores.
    ///
    /// `offset` fixes the civil calendar used for daily windows.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        stock: Arc<dyn StockLedger>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            catalog,
            stock,
            clock,
            offset,
        }
    }

    /// The calendar offset for daily windows.
    #[must_use]
    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }

    async fn load_center(&self, id: CenterId) -> Result<Center> {
        self.catalog
            .center(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(EntityKind::Center, id))
    }

    async fn book_index(&self) -> Result<BookIndex> {
        Ok(self.catalog.books().await?.into_iter().collect())
    }

    /// Type and book breakdown over every distribution of the center's users.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] if the center does not exist, or a transient
    /// storage failure.
    pub async fn analyze_center(&self, center: CenterId) -> Result<CenterAnalytics> {
        let record = self.load_center(center).await?;
        let users = self.catalog.users_in_center(center).await?;
        let books = self.book_index().await?;
        tracing::debug!(center = %center, users = users.len(), "Analyzing center");
        Ok(analyze_center(record, &users, &books))
    }

    /// One local day of activity. `date` is `YYYY-MM-DD`; `None` means today.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] for a malformed date,
    /// [`LedgerError::NotFound`] if the center does not exist, or a transient
    /// storage failure.
    pub async fn daily_analytics(
        &self,
        center: CenterId,
        date: Option<&str>,
    ) -> Result<DailyAnalytics> {
        let window = match date {
            Some(raw) => DayWindow::for_date(parse_date(raw)?, self.offset)?,
            None => DayWindow::containing(self.clock.now(), self.offset)?,
        };
        let record = self.load_center(center).await?;
        let users = self.catalog.users_in_center(center).await?;
        let books = self.book_index().await?;
        tracing::debug!(
            center = %center,
            date = %window.date(),
            start = %window.start(),
            "Computing daily analytics"
        );
        Ok(daily_analytics(&record, &users, &books, &window))
    }

    /// Stock received versus handed out, per book.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] if the center does not exist, or a transient
    /// storage failure.
    pub async fn stock_status(&self, center: CenterId) -> Result<StockStatus> {
        self.load_center(center).await?;
        let entries = self.stock.stock_for_center(center).await?;
        let users = self.catalog.users_in_center(center).await?;
        let books = self.book_index().await?;
        Ok(stock_status(&entries, &users, &books))
    }

    /// Per-book view of one user's history.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] if the user does not exist, or a transient
    /// storage failure.
    pub async fn user_analytics(&self, user: UserId) -> Result<UserAnalytics> {
        let record = self
            .catalog
            .user(user)
            .await?
            .ok_or_else(|| LedgerError::not_found(EntityKind::User, user))?;
        let books = self.book_index().await?;
        Ok(user_analytics(&record, &books))
    }

    /// Compares the center's stored totals with the sum over its users.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] if the center does not exist, or a transient
    /// storage failure.
    pub async fn audit_center(&self, center: CenterId) -> Result<ConsistencyReport> {
        let record = self.load_center(center).await?;
        let users = self.catalog.users_in_center(center).await?;
        let report = audit_center(&record, &users);
        if !report.is_consistent() {
            tracing::warn!(
                center = %center,
                drift = ?report.drift,
                "Center totals disagree with the sum of its users"
            );
        }
        Ok(report)
    }

    /// Every center with its stored totals and user count, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns a transient storage failure.
    pub async fn center_overviews(&self) -> Result<Vec<CenterOverview>> {
        let centers = self.catalog.centers().await?;
        let mut rows = Vec::with_capacity(centers.len());
        for center in centers {
            let users = self.catalog.users_in_center(center.id).await?.len();
            rows.push((center, users));
        }
        Ok(center_overviews(rows))
    }
}
