//! # Povtor
//!
//! > *"Try it again, but say when to stop"*
//!
//! A Rust library for driving a fallible operation through a declarative
//! retry policy while exposing a live, inspectable status.
//!
//! ## Philosophy
//!
//! A retry cycle is described, not hand-written:
//! - **Policy** = what to do after each outcome (continue or finish) and how
//!   long to wait between attempts
//! - **Status** = what has happened so far, readable at any time by the
//!   caller and by the policy's own callbacks
//!
//! The cycle ends by settling a single completion signal, exactly once,
//! either on its own or because the caller called `stop`.
//!
//! ## Quick Example
//!
//! ```rust
//! use povtor::{retry, RetryError, RetryPolicy, RetrySettings};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let mut reason = String::new();
//! let status = retry(
//!     RetrySettings::new(move |_| {
//!         reason.push('!');
//!         Err::<(), _>(reason.clone())
//!     })
//!     .with_policy(
//!         RetryPolicy::new()
//!             .with_retry_qty(-1)
//!             .with_retry_timeout(Duration::from_millis(1))
//!             .with_retry_on_error_fn(|reason: &String, _| reason.len() < 3),
//!     ),
//! );
//!
//! assert_eq!(
//!     status.completion().await,
//!     Err(RetryError::Rejected("!!!".to_string()))
//! );
//! assert_eq!(status.attempt(), 3);
//! # });
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

#[cfg(feature = "serde")]
pub mod config;
pub mod extensions;
pub mod retry;

// Re-exports
pub use extensions::Extensions;
pub use retry::{
    completion_signal, retry, Attempt, AttemptBudget, Completion, CompletionOutput,
    Continuation, Delay, HistoryEntry, NextDelay, RetryError, RetryPolicy, RetrySettings,
    RetryStatus, StatusSnapshot, WithCompletion,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::extensions::Extensions;
    pub use crate::retry::{
        completion_signal, retry, Attempt, Completion, Continuation, Delay, NextDelay,
        RetryError, RetryPolicy, RetrySettings, RetryStatus,
    };
}
