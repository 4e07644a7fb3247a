//! # Distribution Testing
//!
//! Testing utilities for the book distribution ledger.
//!
//! This crate provides:
//! - Mock implementations of environment traits ([`FixedClock`], [`ManualClock`])
//! - [`InMemoryStore`]: insertion-ordered store implementing every storage trait
//! - [`FaultyStore`]: wrapper that fails or delays chosen storage calls
//! - [`fixtures`]: a small seeded catalog shared by the test suites
//! - [`properties`]: proptest strategies for amounts
//!
//! ## Example
//!
//! ```
//! use distribution_testing::{fixtures, InMemoryStore};
//! use distribution_core::CatalogStore;
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryStore::new();
//! let seeded = fixtures::seed(&store).await;
//! let users = store.users_in_center(seeded.center.id).await.unwrap();
//! assert_eq!(users.len(), 2);
//! # });
//! ```

use chrono::{DateTime, Utc};
use distribution_core::environment::Clock;

mod faults;
pub mod fixtures;
mod memory;

pub use faults::{Fault, FaultyStore};
pub use memory::InMemoryStore;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use distribution_testing::mocks::FixedClock;
    /// use distribution_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// A clock tests can move, so events land on chosen days.
    ///
    /// Clones share the same time.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock starting at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Jump to `time`
        #[allow(clippy::unwrap_used)] // Mutex poison only follows a panicking test
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap() = time;
        }

        /// Move forward by `delta`
        #[allow(clippy::unwrap_used)]
        pub fn advance(&self, delta: chrono::Duration) {
            let mut time = self.time.lock().unwrap();
            *time += delta;
        }
    }

    impl Clock for ManualClock {
        #[allow(clippy::unwrap_used)]
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap()
        }
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use distribution_core::{Money, Points};
    use proptest::prelude::*;

    /// Prices between zero and ₹2,000.00, in paise.
    pub fn price() -> impl Strategy<Value = Money> {
        (0i64..=200_000).prop_map(Money::from_minor)
    }

    /// Book point values between 0 and 10, in steps of a quarter point.
    pub fn point_value() -> impl Strategy<Value = Points> {
        (0i64..=40).prop_map(|quarters| Points::from_hundredths(quarters * 25))
    }
}

/// Installs a test-friendly tracing subscriber once per process.
///
/// Honours `RUST_LOG`; output goes through the test harness capture.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn manual_clock_moves_and_is_shared() {
        let clock = ManualClock::new(test_clock().now());
        let shared = clock.clone();
        clock.advance(chrono::Duration::hours(25));
        assert_eq!(
            shared.now(),
            test_clock().now() + chrono::Duration::hours(25)
        );
    }
}
