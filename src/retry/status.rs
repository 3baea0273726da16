//! The live, externally observable record of a retry cycle.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::extensions::Extensions;
use crate::retry::completion::{Completion, Settlement, WithCompletion};
use crate::retry::error::RetryError;
use crate::retry::policy::RetryPolicy;

/// One completed attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry<T, E> {
    /// When the outcome arrived.
    pub time: Instant,
    /// The value or failure the attempt produced.
    pub outcome: Result<T, E>,
}

impl<T, E> HistoryEntry<T, E> {
    /// The produced value, if the attempt succeeded.
    pub fn value(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    /// The failure reason, if the attempt failed.
    pub fn error(&self) -> Option<&E> {
        self.outcome.as_ref().err()
    }

    /// Returns true if the attempt failed.
    pub fn is_error(&self) -> bool {
        self.outcome.is_err()
    }
}

/// A consistent copy of every status field at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot<T, E> {
    /// Attempts started so far.
    pub attempt: u64,
    /// Most recent success value.
    pub value: Option<T>,
    /// Most recent failure reason.
    pub error: Option<E>,
    /// Whether the most recent outcome was a failure.
    pub is_error: bool,
    /// Every completed attempt, in order.
    pub history: Vec<HistoryEntry<T, E>>,
    /// A delay timer is pending.
    pub wait: bool,
    /// An attempt's outcome has not settled yet.
    pub value_wait: bool,
    /// Cancellation was requested.
    pub stopped: bool,
    /// The completion signal has settled.
    pub finished: bool,
    /// When the cycle started.
    pub start_time: Instant,
}

#[derive(Debug)]
struct State<T, E> {
    attempt: u64,
    value: Option<T>,
    error: Option<E>,
    is_error: bool,
    history: Vec<HistoryEntry<T, E>>,
    wait: bool,
    value_wait: bool,
    stopped: bool,
    // The driver holds a fresh outcome and has not yet armed a timer, started
    // an attempt or settled. A stop in this window is settled by the driver.
    deciding: bool,
}

struct Inner<T, E> {
    state: Mutex<State<T, E>>,
    policy: Arc<RetryPolicy<T, E>>,
    settlement: Settlement<T, E>,
    completion: Completion<T, E>,
    timer_cancel: Notify,
    start_time: Instant,
}

/// Shared handle to the status of a running (or finished) retry cycle.
///
/// Cloning the handle is cheap; all clones observe the same record. The same
/// handle is passed to the operation, the continuation predicates and the
/// delay functions, and is returned to the caller by [`retry`](crate::retry).
///
/// # Examples
///
/// ```rust
/// use povtor::{retry, RetryPolicy, RetrySettings};
///
/// # tokio_test::block_on(async {
/// let status = retry(
///     RetrySettings::new(|status| Ok::<_, String>(status.attempt() * 10))
///         .with_policy(RetryPolicy::new().with_retry_qty(2).with_retry_test(true)),
/// );
///
/// assert_eq!(status.completion().await, Ok(Some(30)));
/// assert_eq!(status.attempt(), 3);
/// assert_eq!(status.history().len(), 3);
/// assert!(!status.is_waiting());
/// assert!(!status.is_value_waiting());
/// # });
/// ```
pub struct RetryStatus<T, E> {
    inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for RetryStatus<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> RetryStatus<T, E>
where
    T: Clone,
    E: Clone,
{
    pub(crate) fn new(policy: Arc<RetryPolicy<T, E>>) -> Self {
        let (settlement, completion) = Settlement::new();
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    attempt: 0,
                    value: None,
                    error: None,
                    is_error: false,
                    history: Vec::new(),
                    wait: false,
                    value_wait: false,
                    stopped: false,
                    deciding: false,
                }),
                policy,
                settlement,
                completion,
                timer_cancel: Notify::new(),
                start_time: Instant::now(),
            }),
        }
    }

    /// Cancel the cycle.
    ///
    /// The first call cancels a pending delay timer and latches
    /// [`is_stopped`](Self::is_stopped). If no attempt is in flight the
    /// completion signal resolves right away with the last success value
    /// (`None` if there was none). Otherwise the in-flight attempt is left to
    /// finish and its outcome settles the signal. Later calls do nothing.
    ///
    /// Every call returns the same completion signal.
    pub fn stop(&self) -> Completion<T, E> {
        let settle_with = {
            let mut state = self.lock();
            if state.stopped {
                None
            } else {
                state.stopped = true;
                if state.wait {
                    state.wait = false;
                    self.inner.timer_cancel.notify_one();
                }
                if state.value_wait || state.deciding {
                    None
                } else {
                    Some(state.value.clone())
                }
            }
        };

        if let Some(value) = settle_with {
            if self.inner.settlement.settle(Ok(value)) {
                #[cfg(feature = "tracing")]
                tracing::info!(attempt = self.attempt(), "retry stopped");
            }
        }

        self.completion()
    }

    /// Get a handle to the completion signal.
    pub fn completion(&self) -> Completion<T, E> {
        self.inner.completion.clone()
    }

    /// Attempts started so far.
    pub fn attempt(&self) -> u64 {
        self.lock().attempt
    }

    /// Most recent success value.
    pub fn value(&self) -> Option<T> {
        self.lock().value.clone()
    }

    /// Most recent failure reason.
    pub fn error(&self) -> Option<E> {
        self.lock().error.clone()
    }

    /// Returns true if the most recent outcome was a failure.
    pub fn is_error(&self) -> bool {
        self.lock().is_error
    }

    /// Every completed attempt, in order.
    pub fn history(&self) -> Vec<HistoryEntry<T, E>> {
        self.lock().history.clone()
    }

    /// Number of completed attempts.
    pub fn completed(&self) -> usize {
        self.lock().history.len()
    }

    /// Returns true while a delay timer is pending.
    pub fn is_waiting(&self) -> bool {
        self.lock().wait
    }

    /// Returns true while an attempt's outcome has not settled.
    pub fn is_value_waiting(&self) -> bool {
        self.lock().value_wait
    }

    /// Returns true once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Returns true once the completion signal has settled.
    pub fn is_finished(&self) -> bool {
        self.inner.settlement.is_settled()
    }

    /// A consistent copy of every field.
    pub fn snapshot(&self) -> StatusSnapshot<T, E> {
        let finished = self.is_finished();
        let state = self.lock();
        StatusSnapshot {
            attempt: state.attempt,
            value: state.value.clone(),
            error: state.error.clone(),
            is_error: state.is_error,
            history: state.history.clone(),
            wait: state.wait,
            value_wait: state.value_wait,
            stopped: state.stopped,
            finished,
            start_time: self.inner.start_time,
        }
    }

    /// The policy this cycle was started with.
    pub fn policy(&self) -> &RetryPolicy<T, E> {
        &self.inner.policy
    }

    /// Caller-defined extra fields from the policy.
    pub fn extensions(&self) -> &Extensions {
        self.inner.policy.extensions()
    }

    /// When the cycle started.
    pub fn start_time(&self) -> Instant {
        self.inner.start_time
    }

    /// Time since the cycle started.
    pub fn elapsed(&self) -> Duration {
        self.inner.start_time.elapsed()
    }

    // ---- driver transitions ----

    /// Start an attempt unless stopped. Returns the new attempt number.
    pub(crate) fn begin_attempt(&self) -> Option<u64> {
        let mut state = self.lock();
        if state.stopped {
            return None;
        }
        state.attempt += 1;
        state.wait = false;
        state.value_wait = true;
        state.deciding = false;
        Some(state.attempt)
    }

    /// Record a settled outcome. Returns true if a stop is already latched.
    pub(crate) fn record(&self, outcome: Result<T, E>) -> bool {
        let mut state = self.lock();
        match &outcome {
            Ok(value) => {
                state.value = Some(value.clone());
                state.is_error = false;
            }
            Err(error) => {
                state.error = Some(error.clone());
                state.is_error = true;
            }
        }
        state.history.push(HistoryEntry {
            time: Instant::now(),
            outcome,
        });
        state.value_wait = false;
        state.deciding = true;
        state.stopped
    }

    /// Arm a delay timer unless stopped. Returns false if stopped.
    pub(crate) fn arm_timer(&self) -> bool {
        let mut state = self.lock();
        if state.stopped {
            return false;
        }
        state.wait = true;
        state.deciding = false;
        true
    }

    /// Wait until `stop` cancels the pending timer.
    pub(crate) async fn timer_cancelled(&self) {
        self.inner.timer_cancel.notified().await
    }

    /// Settle the completion signal from the last known outcome.
    pub(crate) fn finish(&self) -> bool {
        let output = {
            let mut state = self.lock();
            state.deciding = false;
            state.wait = false;
            if state.is_error {
                match state.error.clone() {
                    Some(error) => Err(RetryError::Rejected(error)),
                    None => Ok(state.value.clone()),
                }
            } else {
                Ok(state.value.clone())
            }
        };
        self.inner.settlement.settle(output)
    }

    /// Tear the cycle down after a panic in caller code.
    pub(crate) fn abandon(&self, message: String) -> bool {
        {
            let mut state = self.lock();
            state.wait = false;
            state.value_wait = false;
            state.deciding = false;
        }
        self.inner
            .settlement
            .settle(Err(RetryError::Panicked(message)))
    }
}

impl<T, E> RetryStatus<T, E> {
    fn lock(&self) -> MutexGuard<'_, State<T, E>> {
        // Caller code never runs under this lock, so poisoning only follows a
        // panic inside `Clone`; the record is still consistent.
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Clone, E: Clone> WithCompletion<T, E> for RetryStatus<T, E> {
    fn completion(&self) -> Completion<T, E> {
        RetryStatus::completion(self)
    }
}

impl<T, E> fmt::Debug for RetryStatus<T, E>
where
    T: fmt::Debug,
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("RetryStatus")
            .field("attempt", &state.attempt)
            .field("value", &state.value)
            .field("error", &state.error)
            .field("is_error", &state.is_error)
            .field("completed", &state.history.len())
            .field("wait", &state.wait)
            .field("value_wait", &state.value_wait)
            .field("stopped", &state.stopped)
            .finish_non_exhaustive()
    }
}
