//! # Stayhub Runtime
//!
//! Runtime for Stayhub reducers.
//!
//! The [`Store`] owns a piece of state, a reducer and its environment. Sending
//! an action runs the reducer, executes every returned [`Effect`], and feeds
//! any action an effect produces back into the reducer until the system is
//! quiet. HTTP handlers build one short-lived store per request, so `send`
//! resolves only after the whole feedback loop has finished and the handler
//! can read the outcome straight from state.
//!
//! ```ignore
//! let store = Store::new(state, BookingReducer::new(), env);
//! store.send(BookingAction::BookRoom { .. }).await?;
//! let outcome = store.state(|s| s.outcome.clone()).await;
//! ```

use futures::future::join_all;
use stayhub_core::{effect::Effect, reducer::Reducer};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::RwLock;

/// Default upper bound on actions processed by a single `send`.
pub const DEFAULT_MAX_ACTIONS: usize = 64;

/// Error types for the Store runtime
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The reducer kept producing actions past the configured bound.
    ///
    /// This always indicates a reducer bug: a feedback cycle between an
    /// effect and the reducer.
    #[error("Action feedback loop exceeded {0} actions")]
    FeedbackLimitExceeded(usize),
}

/// The Store - runtime coordinator for a reducer
///
/// # Type Parameters
///
/// - `S`: State type
/// - `A`: Action type
/// - `E`: Environment type
/// - `R`: Reducer implementation
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: RwLock<S>,
    reducer: R,
    environment: E,
    max_actions: usize,
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync,
    A: Send + 'static,
    S: Send + Sync,
    E: Send + Sync,
{
    /// Create a new store with initial state, reducer, and environment
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self {
            state: RwLock::new(initial_state),
            reducer,
            environment,
            max_actions: DEFAULT_MAX_ACTIONS,
        }
    }

    /// Override the bound on actions processed by one `send`.
    #[must_use]
    pub const fn with_max_actions(mut self, max_actions: usize) -> Self {
        self.max_actions = max_actions;
        self
    }

    /// Send an action and run the resulting effects to completion
    ///
    /// Actions produced by effects are reduced in the order they arrive.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::FeedbackLimitExceeded`] when more than
    /// `max_actions` actions are processed for a single call.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<(), StoreError> {
        let mut queue = VecDeque::from([action]);
        let mut processed = 0usize;

        while let Some(action) = queue.pop_front() {
            processed += 1;
            if processed > self.max_actions {
                tracing::error!(limit = self.max_actions, "Action feedback loop detected");
                return Err(StoreError::FeedbackLimitExceeded(self.max_actions));
            }

            let effects = {
                let mut state = self.state.write().await;
                self.reducer.reduce(&mut state, action, &self.environment)
            };
            metrics::counter!("stayhub.store.actions_processed").increment(1);

            for effect in effects {
                if effect.is_none() {
                    continue;
                }
                metrics::counter!("stayhub.store.effects_executed").increment(1);
                queue.extend(execute(effect).await);
            }
        }

        tracing::debug!(processed, "Store settled");
        Ok(())
    }

    /// Read the current state through a closure
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Consume the store and return its final state.
    pub fn into_state(self) -> S {
        self.state.into_inner()
    }
}

/// Execute one effect, returning the actions it produced in order.
fn execute<A>(effect: Effect<A>) -> Pin<Box<dyn Future<Output = Vec<A>> + Send>>
where
    A: Send + 'static,
{
    Box::pin(async move {
        match effect {
            Effect::None => Vec::new(),
            Effect::Future(future) => future.await.into_iter().collect(),
            Effect::Sequential(effects) => {
                let mut produced = Vec::new();
                for effect in effects {
                    produced.extend(execute(effect).await);
                }
                produced
            },
            Effect::Parallel(effects) => join_all(effects.into_iter().map(execute))
                .await
                .into_iter()
                .flatten()
                .collect(),
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use stayhub_core::{SmallVec, smallvec};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum CounterAction {
        Add(u32),
        AddLater(u32),
        FanOut,
        Loop,
    }

    #[derive(Clone)]
    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = Vec<u32>;
        type Action = CounterAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Vec<u32>,
            action: CounterAction,
            _env: &(),
        ) -> SmallVec<[Effect<CounterAction>; 4]> {
            match action {
                CounterAction::Add(n) => {
                    state.push(n);
                    SmallVec::new()
                },
                CounterAction::AddLater(n) => {
                    smallvec![Effect::future(async move { Some(CounterAction::Add(n)) })]
                },
                CounterAction::FanOut => smallvec![Effect::chain(vec![
                    Effect::future(async { Some(CounterAction::Add(1)) }),
                    Effect::merge(vec![
                        Effect::future(async { Some(CounterAction::Add(2)) }),
                        Effect::None,
                        Effect::future(async { Some(CounterAction::Add(3)) }),
                    ]),
                ])],
                CounterAction::Loop => {
                    smallvec![Effect::future(async { Some(CounterAction::Loop) })]
                },
            }
        }
    }

    #[tokio::test]
    async fn send_runs_feedback_to_completion() {
        let store = Store::new(Vec::new(), CounterReducer, ());
        store.send(CounterAction::AddLater(7)).await.unwrap();
        assert_eq!(store.state(Clone::clone).await, vec![7]);
    }

    #[tokio::test]
    async fn nested_effects_keep_their_order() {
        let store = Store::new(Vec::new(), CounterReducer, ());
        store.send(CounterAction::FanOut).await.unwrap();
        assert_eq!(store.into_state(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn runaway_feedback_is_stopped() {
        let store = Store::new(Vec::new(), CounterReducer, ()).with_max_actions(5);
        let result = store.send(CounterAction::Loop).await;
        assert!(matches!(result, Err(StoreError::FeedbackLimitExceeded(5))));
    }
}
