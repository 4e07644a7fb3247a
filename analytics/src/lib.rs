//! Analytics over the book distribution ledgers.
//!
//! # Overview
//!
//! Each view is a pure function over a ledger snapshot:
//! - **Center breakdown** ([`breakdown`]): figures per book type and per book
//! - **Daily** ([`daily`]): one local calendar day, with the top devotees
//! - **Stock** ([`stock`]): stock received versus handed out
//! - **User** ([`user`]): one user's hand-outs per book
//! - **Audit** ([`audit`]): center totals versus the sum of its users
//! - **Overview** ([`overview`]): all centers sorted by name
//!
//! [`AnalyticsEngine`] loads the slice each view needs through the storage
//! traits and runs it. Nothing here writes.
//!
//! # Ordering
//!
//! Groups appear in order of first occurrence: users in registration order,
//! each user's events in append order, stock entries in append order.

pub mod audit;
pub mod breakdown;
pub mod daily;
pub mod engine;
pub mod leaderboard;
pub mod overview;
pub mod stock;
pub mod user;
pub mod window;

pub use audit::ConsistencyReport;
pub use breakdown::{BookIndex, BookSummary, CenterAnalytics, Figures, TypeSummary};
pub use daily::{DailyAnalytics, DailyGroup, DailyTotals, TypeLanguage};
pub use engine::AnalyticsEngine;
pub use leaderboard::{Devotee, UserRef};
pub use overview::CenterOverview;
pub use stock::{StockLevel, StockStatus, StockTotals};
pub use user::{PopulatedDistribution, PopulatedUser, UserAnalytics, populate_user};
pub use window::DayWindow;
