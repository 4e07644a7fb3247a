//! # Distribution Runtime
//!
//! Runtime for the book distribution ledger.
//!
//! This crate executes the ledger's operations against a storage backend and
//! carries the operational concerns around them.
//!
//! ## Core Components
//!
//! - **[`DistributionEngine`]**: the query boundary; parses raw requests and
//!   dispatches to the write and read sides
//! - **[`LedgerService`]**: distribution and stock appends, catalog registration
//! - **[`Deadline`]**: bounds every storage call with a timeout
//! - **[`retry`]**: exponential backoff for transient read failures
//! - **[`config`]**: environment-driven configuration
//! - **[`metrics`]** and **[`telemetry`]**: Prometheus counters and tracing setup
//!
//! ## Example
//!
//! ```
//! use distribution_runtime::{DistributionEngine, EngineConfig};
//! use distribution_runtime::requests::{RecordDistribution, RegisterCenter, RegisterUser};
//! use distribution_core::environment::SystemClock;
//! use distribution_testing::InMemoryStore;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let engine = DistributionEngine::new(
//!     InMemoryStore::new(),
//!     Arc::new(SystemClock),
//!     &EngineConfig::default(),
//! );
//!
//! let center = engine
//!     .register_center(&RegisterCenter { name: "IYMF Panathur".into() })
//!     .await?;
//! let user = engine
//!     .register_user(&RegisterUser {
//!         name: "Ravi".into(),
//!         number: "9000000001".into(),
//!         center_id: center.id.to_string(),
//!     })
//!     .await?;
//!
//! let overview = engine.analyze_center(&center.id.to_string()).await?;
//! assert_eq!(overview.total_users, 1);
//! # let _ = user;
//! # Ok::<(), distribution_core::LedgerError>(())
//! # }).unwrap();
//! ```

/// Environment-driven configuration
pub mod config;

/// Per-call storage deadlines
pub mod deadline;

/// The query boundary
pub mod engine;

/// Distribution and stock appends
pub mod ledger;

/// Prometheus metrics for observability
pub mod metrics;

/// Raw request types accepted at the boundary
pub mod requests;

/// Retry logic with exponential backoff
pub mod retry;

/// Tracing subscriber setup
pub mod telemetry;

pub use config::{DatabaseConfig, EngineConfig, LogConfig, LogFormat};
pub use deadline::Deadline;
pub use engine::DistributionEngine;
pub use ledger::LedgerService;
pub use retry::RetryPolicy;
pub use telemetry::init_tracing;
