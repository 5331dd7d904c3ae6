//! # Stayhub Core
//!
//! The functional core of the Stayhub booking backend.
//!
//! Business rules are written as reducers: pure functions
//! `(State, Action, Environment) → (State, Effects)`. Reducers never touch the
//! database or the wall clock directly. Anything outside the process is
//! reached through the injected [`environment`], and anything that has to
//! happen after a decision is returned as an [`effect::Effect`] description
//! that the runtime executes.
//!
//! ## Concepts
//!
//! - **State**: what a reducer knows when it decides (for bookings, the
//!   resource being booked and a read view of its existing bookings)
//! - **Action**: commands (requests) and events (facts) in one enum
//! - **Reducer**: validates commands, applies events, returns effects
//! - **Effect**: a description of side work, e.g. "persist this booking"
//! - **Environment**: injected dependencies such as the [`environment::Clock`]
//!
//! ## Example
//!
//! ```ignore
//! use stayhub_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! impl Reducer for BookingReducer {
//!     type State = BookingState;
//!     type Action = BookingAction;
//!     type Environment = BookingEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut BookingState,
//!         action: BookingAction,
//!         env: &BookingEnvironment,
//!     ) -> SmallVec<[Effect<BookingAction>; 4]> {
//!         SmallVec::new()
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Reducer module - the trait all business logic implements.
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// Most actions produce zero or one effect, so the inline capacity of
        /// the returned vector avoids a heap allocation in the common case.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions.
///
/// Effects are values. A reducer returns them; the runtime executes them and
/// feeds any resulting action back into the reducer.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Boxed future produced by [`Effect::Future`].
    pub type EffectFuture<Action> = Pin<Box<dyn Future<Output = Option<Action>> + Send>>;

    /// Effect type - describes a side effect to be executed
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(EffectFuture<Action>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap an async block as an effect.
        pub fn future<F>(future: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(future))
        }

        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Whether this effect does nothing when executed.
        #[must_use]
        pub fn is_none(&self) -> bool {
            match self {
                Effect::None => true,
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    effects.iter().all(Effect::is_none)
                },
                Effect::Future(_) => false,
            }
        }
    }
}

/// Environment module - dependency injection traits.
pub mod environment {
    use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Booking rules compare against "now" (experience slots) and "today"
    /// (room stays). Both are read through this trait so tests can pin them.
    pub trait Clock: Send + Sync {
        /// Get the current instant
        fn now(&self) -> DateTime<Utc>;

        /// The calendar date at the current instant, seen from `offset`.
        fn today(&self, offset: FixedOffset) -> NaiveDate {
            self.now().with_timezone(&offset).date_naive()
        }
    }

    /// Wall clock used in production.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::effect::Effect;
    use super::environment::Clock;
    use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

    struct Pinned(DateTime<Utc>);

    impl Clock for Pinned {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn today_follows_the_local_offset() {
        // 20:30 UTC on May 31st is already June 1st in UTC+9.
        let clock = Pinned(Utc.with_ymd_and_hms(2024, 5, 31, 20, 30, 0).unwrap());
        let seoul = FixedOffset::east_opt(9 * 3600).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();

        assert_eq!(clock.today(seoul), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(clock.today(utc), NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
    }

    #[test]
    fn nested_none_effects_are_none() {
        let effect: Effect<()> = Effect::merge(vec![Effect::None, Effect::chain(vec![])]);
        assert!(effect.is_none());

        let effect: Effect<()> = Effect::chain(vec![Effect::None, Effect::future(async { None })]);
        assert!(!effect.is_none());
    }
}
