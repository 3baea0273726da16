//! Retry driver with a live status handle.
//!
//! [`retry`] starts a cycle that invokes an operation according to a
//! [`RetryPolicy`] and hands back a [`RetryStatus`] straight away:
//!
//! - **Policy**: a fixed retry count, an explicit per-retry delay schedule,
//!   or dynamic delays computed from the status, plus continuation settings
//!   for success and failure outcomes
//! - **Status**: attempt counter, last value and failure, outcome history and
//!   wait flags, readable while the cycle runs
//! - **Completion**: a single [`Completion`] future that settles exactly once
//! - **Stop**: [`RetryStatus::stop`] cancels a pending delay and forces
//!   completion
//!
//! # Quick Start
//!
//! ```rust
//! use povtor::{retry, RetrySettings};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let status = retry(
//!     RetrySettings::new(|status| Ok::<_, String>(status.attempt()))
//!         .map_policy(|policy| {
//!             policy
//!                 .with_retry_qty(10)
//!                 .with_retry_timeout(Duration::from_millis(1))
//!                 .with_retry_test_fn(|value, _| *value < 4)
//!         }),
//! );
//!
//! assert_eq!(status.completion().await, Ok(Some(4)));
//! assert_eq!(status.attempt(), 4);
//! # });
//! ```
//!
//! # Continuation
//!
//! Retries are opt-in. After a success the driver consults
//! [`RetryPolicy::with_retry_test`]; after a failure,
//! [`RetryPolicy::with_retry_on_error`]. Either setting may be a plain
//! boolean or a predicate over the outcome and the status. Whatever they
//! say, a stop request, an exhausted attempt budget or an exceeded
//! [time limit](RetryPolicy::with_time_limit) ends the cycle.
//!
//! # Delays
//!
//! - [`RetryPolicy::with_initial_delay`]: wait before the first attempt
//! - [`RetryPolicy::with_retry_attempts`]: one delay per retry, consumed in
//!   order; its length fixes the number of retries
//! - [`RetryPolicy::with_retry_timeout`]: the same delay before every retry
//!
//! A [`Delay::Dynamic`] delay is computed from the status each time. Returning
//! [`NextDelay::Abort`] ends the cycle with the last outcome.
//!
//! # Error Types
//!
//! - [`RetryError`]: carried by a rejected completion signal

mod attempt;
mod completion;
mod driver;
mod error;
mod policy;
mod settings;
mod status;

use std::sync::Arc;

pub use attempt::Attempt;
pub use completion::{completion_signal, Completion, CompletionOutput, WithCompletion};
pub use error::RetryError;
pub use policy::{AttemptBudget, Continuation, Delay, NextDelay, RetryPolicy};
pub use settings::RetrySettings;
pub use status::{HistoryEntry, RetryStatus, StatusSnapshot};

use driver::Driver;

/// Start a retry cycle on the current Tokio runtime.
///
/// Returns the live status immediately; the first attempt runs on a spawned
/// task. Await [`RetryStatus::completion`] for the result.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn retry<T, E>(settings: RetrySettings<T, E>) -> RetryStatus<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    let (operation, policy) = settings.into_parts();
    let status = RetryStatus::new(Arc::new(policy));
    let driver = Driver::new(operation, status.clone());

    #[cfg(feature = "tracing")]
    let task = {
        use tracing::Instrument as _;
        driver.run().instrument(tracing::debug_span!("retry"))
    };
    #[cfg(not(feature = "tracing"))]
    let task = driver.run();

    tokio::spawn(task);
    status
}
