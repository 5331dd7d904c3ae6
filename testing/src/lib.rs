//! # Stayhub Testing
//!
//! Testing utilities for Stayhub reducers.
//!
//! - [`FixedClock`] / [`test_clock`]: deterministic time for booking rules
//! - [`ReducerTest`]: Given-When-Then harness for reducers
//! - [`assertions`]: effect assertions
//!
//! ## Example
//!
//! ```ignore
//! use stayhub_testing::{assertions, test_clock, ReducerTest};
//!
//! ReducerTest::new(BookingReducer::new())
//!     .with_env(env_with(test_clock()))
//!     .given_state(state_for_room())
//!     .when_action(BookingAction::BookRoom { .. })
//!     .then_effects(assertions::assert_no_effects)
//!     .run();
//! ```


pub use reducer_test::{ReducerTest, assertions};

use chrono::{DateTime, Utc};
use stayhub_core::environment::Clock;

/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use stayhub_testing::mocks::FixedClock;
    /// use stayhub_core::environment::Clock;
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

    /// Create a default fixed clock for tests (2024-05-20 09:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2024-05-20T09:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
