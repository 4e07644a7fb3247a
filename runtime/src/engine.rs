//! The query boundary: every operation the engine offers, keyed by raw ids.
//!
//! [`DistributionEngine`] owns one backend wrapped in per-call deadlines, and
//! hands it to the write side ([`LedgerService`]) and the read side
//! ([`AnalyticsEngine`]). Reads are retried on transient failures; writes are
//! not.

use crate::config::EngineConfig;
use crate::deadline::Deadline;
use crate::ledger::LedgerService;
use crate::metrics::{AnalyticsMetrics, LedgerMetrics};
use crate::requests::{self, RecordDistribution, RecordStock, RegisterBook, RegisterCenter, RegisterUser};
use crate::retry::{RetryPolicy, retry_read};
use distribution_analytics::{
    AnalyticsEngine, CenterAnalytics, CenterOverview, ConsistencyReport, DailyAnalytics,
    PopulatedUser, StockStatus, UserAnalytics,
};
use distribution_core::environment::Clock;
use distribution_core::{
    Book, CatalogStore, Center, CenterId, Result, StockEvent, StockLedger, Store, User, UserId,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Entry point for callers such as an HTTP layer or a CLI.
#[derive(Clone, Debug)]
pub struct DistributionEngine {
    ledger: LedgerService,
    analytics: AnalyticsEngine,
    read_retry: RetryPolicy,
}

impl DistributionEngine {
    /// Builds an engine over `store`.
    ///
    /// Every storage call is bounded by `config.storage_timeout`; daily windows
    /// use `config.utc_offset`.
    pub fn new<S: Store + 'static>(store: S, clock: Arc<dyn Clock>, config: &EngineConfig) -> Self {
        let store = Arc::new(Deadline::new(store, config.storage_timeout));
        let ledger = LedgerService::from_store(Arc::clone(&store), Arc::clone(&clock));
        let analytics = AnalyticsEngine::new(
            Arc::clone(&store) as Arc<dyn CatalogStore>,
            store as Arc<dyn StockLedger>,
            clock,
            config.utc_offset,
        );
        tracing::debug!(
            timeout_ms = u64::try_from(config.storage_timeout.as_millis()).unwrap_or(u64::MAX),
            utc_offset = %config.utc_offset,
            "Distribution engine ready"
        );
        Self {
            ledger,
            analytics,
            read_retry: config.read_retry.clone(),
        }
    }

    /// The write side.
    #[must_use]
    pub const fn ledger(&self) -> &LedgerService {
        &self.ledger
    }

    /// The read side, without retries.
    #[must_use]
    pub const fn analytics(&self) -> &AnalyticsEngine {
        &self.analytics
    }

    async fn read<T, F, Fut>(&self, view: &'static str, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let outcome = retry_read(&self.read_retry, view, operation).await;
        AnalyticsMetrics::record_query(view, started.elapsed());
        if let Err(err) = &outcome {
            tracing::warn!(view, kind = %err.kind(), error = %err, "Query failed");
        }
        outcome
    }

    /// Records a hand-out and returns the user with their populated history.
    ///
    /// # Errors
    ///
    /// `InvalidArgument`, `NotFound`, `Transient` or `Inconsistent`; see
    /// [`LedgerService::record_distribution`].
    pub async fn record_distribution(&self, request: &RecordDistribution) -> Result<PopulatedUser> {
        let args = request.validate().inspect_err(|err| {
            LedgerMetrics::record_rejection(err.kind());
            tracing::debug!(error = %err, "Distribution request rejected");
        })?;
        self.ledger
            .record_distribution(args.user, args.book, args.price_paid)
            .await
    }

    /// Records a stock arrival.
    ///
    /// # Errors
    ///
    /// `InvalidArgument`, `NotFound` or `Transient`; see
    /// [`LedgerService::record_stock`].
    pub async fn record_stock(&self, request: &RecordStock) -> Result<StockEvent> {
        let args = request.validate()?;
        self.ledger
            .record_stock(args.center, args.book, args.quantity, args.cost_paid)
            .await
    }

    /// Adds a book to the catalog.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` or `Transient`.
    pub async fn register_book(&self, request: &RegisterBook) -> Result<Book> {
        let args = request.validate()?;
        self.ledger
            .register_book(&args.name, args.book_type, args.language, args.point, args.price)
            .await
    }

    /// Creates a center.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` (including a taken name) or `Transient`.
    pub async fn register_center(&self, request: &RegisterCenter) -> Result<Center> {
        self.ledger.register_center(&request.name).await
    }

    /// Returns the center's user with the given number, creating it if needed.
    ///
    /// # Errors
    ///
    /// `InvalidArgument`, `NotFound` or `Transient`.
    pub async fn register_user(&self, request: &RegisterUser) -> Result<User> {
        let center = request.center()?;
        self.ledger
            .register_user(&request.name, &request.number, center)
            .await
    }

    /// Type and book breakdown of a center.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a malformed id, `NotFound` or `Transient`.
    pub async fn analyze_center(&self, center_id: &str) -> Result<CenterAnalytics> {
        let center: CenterId = requests::id("centerId", center_id)?;
        let analytics = &self.analytics;
        self.read("analyze_center", move || analytics.analyze_center(center))
            .await
    }

    /// One local day of a center. `date` is `YYYY-MM-DD`; `None` means today.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a malformed id or date, `NotFound` or `Transient`.
    pub async fn daily_analytics(
        &self,
        center_id: &str,
        date: Option<&str>,
    ) -> Result<DailyAnalytics> {
        let center: CenterId = requests::id("centerId", center_id)?;
        let analytics = &self.analytics;
        self.read("daily_analytics", move || {
            analytics.daily_analytics(center, date)
        })
        .await
    }

    /// Stock reconciliation of a center.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a malformed id, `NotFound` or `Transient`.
    pub async fn stock_status(&self, center_id: &str) -> Result<StockStatus> {
        let center: CenterId = requests::id("centerId", center_id)?;
        let analytics = &self.analytics;
        self.read("stock_status", move || analytics.stock_status(center))
            .await
    }

    /// Per-book view of a user.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a malformed id, `NotFound` or `Transient`.
    pub async fn user_analytics(&self, user_id: &str) -> Result<UserAnalytics> {
        let user: UserId = requests::id("userId", user_id)?;
        let analytics = &self.analytics;
        self.read("user_analytics", move || analytics.user_analytics(user))
            .await
    }

    /// Compares a center's totals with the sum over its users.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a malformed id, `NotFound` or `Transient`.
    pub async fn audit_center(&self, center_id: &str) -> Result<ConsistencyReport> {
        let center: CenterId = requests::id("centerId", center_id)?;
        let analytics = &self.analytics;
        self.read("audit_center", move || analytics.audit_center(center))
            .await
    }

    /// Every center with its totals and user count, by name.
    ///
    /// # Errors
    ///
    /// `Transient`.
    pub async fn center_overviews(&self) -> Result<Vec<CenterOverview>> {
        let analytics = &self.analytics;
        self.read("center_overviews", move || analytics.center_overviews())
            .await
    }
}
