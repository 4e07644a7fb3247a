//! # Distribution Core
//!
//! Domain types and storage traits for the book distribution ledger.
//!
//! Field workers ("users") hand out books at regional centers. Every hand-out is
//! an immutable [`ledger::DistributionEvent`] appended to the user's log, and it
//! moves the running [`aggregate::Totals`] of both the user and their center.
//! Stock arrivals are a separate, independent ledger of [`ledger::StockEvent`]s.
//!
//! ## Modules
//!
//! - [`money`]: fixed-point [`Money`] and [`Points`]
//! - [`catalog`]: books, centers, users and their ids
//! - [`ledger`]: distribution and stock events, the append-only log
//! - [`aggregate`]: per-event contributions and running totals
//! - [`store`]: dyn-compatible storage traits
//! - [`error`]: the `NotFound` / `InvalidArgument` / `Transient` / `Inconsistent` taxonomy
//! - [`environment`]: injected dependencies such as the clock
//!
//! ## Example
//!
//! ```
//! use distribution_core::{Book, BookType, Contribution, Language, Money, Points, Totals};
//!
//! let gita = Book::new(
//!     "Bhagavad Gita As It Is",
//!     BookType::Big,
//!     Language::English,
//!     Points::from_whole(2),
//!     Money::from_rupees(100),
//! )?;
//!
//! let mut totals = Totals::default();
//! totals.apply(&Contribution::assess(&gita, Money::from_rupees(150)));
//! totals.apply(&Contribution::assess(&gita, Money::from_rupees(60)));
//!
//! assert_eq!(totals.points, Points::from_whole(4));
//! assert_eq!(totals.donation, Money::from_rupees(50));
//! assert_eq!(totals.loss, Money::from_rupees(40));
//! # Ok::<(), distribution_core::LedgerError>(())
//! ```

pub mod aggregate;
pub mod catalog;
pub mod error;
pub mod ledger;
pub mod money;
pub mod store;

pub use aggregate::{Contribution, Drift, Totals};
pub use catalog::{Book, BookId, BookType, Center, CenterId, Language, StockId, User, UserId};
pub use error::{EntityKind, ErrorKind, LedgerError, Result, StoreError};
pub use ledger::{DistributionEvent, DistributionLog, StockEvent};
pub use money::{AmountError, MAX_AMOUNT, Money, Points};
pub use store::{AggregateStore, CatalogStore, DistributionLedger, StockLedger, Store, StoreFuture};

/// Environment traits for dependency injection.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Every ledger timestamp comes from an injected clock, so tests can pin
    /// events to a known day.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
