//! Circuit breaker guarding registry calls.
//!
//! The breaker counts consecutive failures of the protected call. Once
//! `max_failures` is reached it opens and rejects calls without running them
//! until `reset_timeout` has elapsed; the next call is then admitted as a
//! single half-open probe whose outcome either closes or re-opens the breaker.
//! Every admitted call is bounded by `call_timeout`, and expiry counts as a
//! failure.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::{info, warn};

/// Breaker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerSettings {
    /// Name used in log events.
    pub name: String,
    /// Consecutive failures required to open the breaker.
    pub max_failures: u32,
    /// Upper bound for a single protected call.
    pub call_timeout: Duration,
    /// Time spent open before a probe call is admitted.
    pub reset_timeout: Duration,
    /// Whether a failed call takes the fallback path. The only fallback is
    /// surfacing the error to the caller, which [`CircuitBreaker::execute`]
    /// always does; the flag is never read by the breaker.
    pub fallback_on_failure: bool,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            name: "circuit-breaker".to_owned(),
            max_failures: 5,
            call_timeout: Duration::from_millis(10_000),
            reset_timeout: Duration::from_millis(30_000),
            fallback_on_failure: true,
        }
    }
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitBreakerState {
    /// Calls flow normally.
    Closed,
    /// Calls are rejected until the reset timeout elapses.
    Open,
    /// One probe call is allowed.
    HalfOpen,
}

/// Failure of a call made through the breaker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CircuitError<E> {
    /// The breaker rejected the call without running it.
    #[error("circuit breaker is open")]
    Open,
    /// The call did not finish within the configured timeout.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
    /// The call ran and failed.
    #[error(transparent)]
    Call(E),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitInternalState {
    Closed { consecutive_failures: u32 },
    Open { opened_at: DateTime<Utc> },
    // A single probe call is in flight.
    HalfOpen,
}

/// Failure-counting call guard.
pub struct CircuitBreaker {
    settings: CircuitBreakerSettings,
    clock: Arc<dyn Clock>,
    state: Mutex<CircuitInternalState>,
}

impl CircuitBreaker {
    /// Build a closed breaker.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use mockable::DefaultClock;
    /// use user_service::domain::{CircuitBreaker, CircuitBreakerSettings, CircuitBreakerState};
    ///
    /// let breaker =
    ///     CircuitBreaker::new(CircuitBreakerSettings::default(), Arc::new(DefaultClock));
    /// assert_eq!(breaker.state(), CircuitBreakerState::Closed);
    /// ```
    pub fn new(settings: CircuitBreakerSettings, clock: Arc<dyn Clock>) -> Self {
        let settings = CircuitBreakerSettings {
            max_failures: settings.max_failures.max(1),
            ..settings
        };
        Self {
            settings,
            clock,
            state: Mutex::new(CircuitInternalState::Closed {
                consecutive_failures: 0,
            }),
        }
    }

    /// Active configuration.
    pub fn settings(&self) -> &CircuitBreakerSettings {
        &self.settings
    }

    /// Snapshot the current state.
    pub fn state(&self) -> CircuitBreakerState {
        match *self.lock_state() {
            CircuitInternalState::Closed { .. } => CircuitBreakerState::Closed,
            CircuitInternalState::Open { .. } => CircuitBreakerState::Open,
            CircuitInternalState::HalfOpen => CircuitBreakerState::HalfOpen,
        }
    }

    /// Run `call` if the breaker admits it, recording the outcome.
    pub async fn execute<T, E, F, Fut>(&self, call: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.admit_call() {
            return Err(CircuitError::Open);
        }

        // Re-opens the breaker if this future is dropped before the call
        // settles, so an abandoned half-open call cannot wedge it.
        let pending = PendingCall {
            breaker: self,
            settled: false,
        };
        let outcome = tokio::time::timeout(self.settings.call_timeout, call()).await;
        pending.settle();

        match outcome {
            Ok(Ok(value)) => {
                self.record_success();
                Ok(value)
            }
            Ok(Err(err)) => {
                self.record_failure();
                Err(CircuitError::Call(err))
            }
            Err(_) => {
                self.record_failure();
                Err(CircuitError::Timeout(self.settings.call_timeout))
            }
        }
    }

    fn admit_call(&self) -> bool {
        let now = self.clock.utc();
        let mut state = self.lock_state();
        match *state {
            CircuitInternalState::Closed { .. } => true,
            CircuitInternalState::Open { opened_at }
                if is_reset_elapsed(opened_at, now, self.settings.reset_timeout) =>
            {
                info!(breaker = %self.settings.name, "circuit half-open; admitting probe");
                *state = CircuitInternalState::HalfOpen;
                true
            }
            CircuitInternalState::Open { .. } | CircuitInternalState::HalfOpen => false,
        }
    }

    fn record_abandoned(&self) {
        let mut state = self.lock_state();
        if *state == CircuitInternalState::HalfOpen {
            warn!(breaker = %self.settings.name, "probe abandoned; circuit re-opened");
            *state = CircuitInternalState::Open {
                opened_at: self.clock.utc(),
            };
        }
    }

    fn record_success(&self) {
        let mut state = self.lock_state();
        if !matches!(*state, CircuitInternalState::Closed { .. }) {
            info!(breaker = %self.settings.name, "circuit closed");
        }
        *state = CircuitInternalState::Closed {
            consecutive_failures: 0,
        };
    }

    fn record_failure(&self) {
        let now = self.clock.utc();
        let mut state = self.lock_state();
        let next = match *state {
            CircuitInternalState::Closed {
                consecutive_failures,
            } => {
                let failures = consecutive_failures.saturating_add(1);
                if failures >= self.settings.max_failures {
                    CircuitInternalState::Open { opened_at: now }
                } else {
                    CircuitInternalState::Closed {
                        consecutive_failures: failures,
                    }
                }
            }
            CircuitInternalState::HalfOpen => CircuitInternalState::Open { opened_at: now },
            CircuitInternalState::Open { opened_at } => CircuitInternalState::Open { opened_at },
        };
        if matches!(next, CircuitInternalState::Open { .. })
            && !matches!(*state, CircuitInternalState::Open { .. })
        {
            warn!(
                breaker = %self.settings.name,
                max_failures = self.settings.max_failures,
                "circuit opened"
            );
        }
        *state = next;
    }

    fn lock_state(&self) -> MutexGuard<'_, CircuitInternalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Admitted call that has not yet produced an outcome.
struct PendingCall<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl PendingCall<'_> {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.record_abandoned();
        }
    }
}

/// Reset windows beyond chrono's range never elapse.
fn is_reset_elapsed(opened_at: DateTime<Utc>, now: DateTime<Utc>, reset: Duration) -> bool {
    chrono::Duration::from_std(reset)
        .ok()
        .and_then(|reset| opened_at.checked_add_signed(reset))
        .is_some_and(|reopens_at| now >= reopens_at)
}
