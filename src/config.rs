//! Declarative retry configuration.
//!
//! [`RetryConfig`] is the plain-data half of a [`RetryPolicy`]: numbers and
//! booleans that can live in a JSON or TOML file. Values are normalized
//! leniently rather than rejected: a negative delay or time limit counts as
//! absent, and a negative retry count means unbounded.
//!
//! # Examples
//!
//! ```rust
//! use povtor::config::RetryConfig;
//! use povtor::{AttemptBudget, RetryPolicy};
//!
//! let config = RetryConfig {
//!     delay_ms: Some(-1),
//!     retry_qty: Some(3),
//!     retry_timeout_ms: Some(250),
//!     retry_on_error: Some(true),
//!     ..RetryConfig::default()
//! };
//!
//! let policy = RetryPolicy::<u32, String>::new().with_config(&config);
//! assert_eq!(policy.initial_delay(), None);
//! assert_eq!(policy.budget(), AttemptBudget::Limited(4));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::{Continuation, Delay, NextDelay, RetryPolicy, RetrySettings};

/// Retry settings expressible as data. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Milliseconds to wait before the first attempt.
    pub delay_ms: Option<i64>,
    /// Explicit per-retry delays in milliseconds. Non-empty overrides `retry_qty`.
    pub retry_attempts_ms: Vec<i64>,
    /// Maximum number of retries; negative means unbounded.
    pub retry_qty: Option<i64>,
    /// Milliseconds to wait before every retry.
    pub retry_timeout_ms: Option<i64>,
    /// Overall time ceiling in milliseconds, measured from the start.
    pub time_limit_ms: Option<i64>,
    /// Retry after a success.
    pub retry_test: Option<bool>,
    /// Retry after a failure.
    pub retry_on_error: Option<bool>,
}

/// Negative or absent milliseconds normalize to `None`.
pub fn normalize_ms(ms: Option<i64>) -> Option<Duration> {
    ms.and_then(|ms| u64::try_from(ms).ok())
        .map(Duration::from_millis)
}

impl<T: 'static, E: 'static> RetryPolicy<T, E> {
    /// Apply every field the config sets, leaving the rest untouched.
    ///
    /// A schedule entry with a negative value still counts towards the
    /// attempt budget but starts its retry immediately.
    pub fn with_config(mut self, config: &RetryConfig) -> Self {
        if let Some(ms) = config.delay_ms {
            self.set_initial_delay(normalize_ms(Some(ms)));
        }
        if !config.retry_attempts_ms.is_empty() {
            self = self.with_retry_attempts(config.retry_attempts_ms.iter().map(|&ms| {
                match normalize_ms(Some(ms)) {
                    Some(d) => Delay::Fixed(d),
                    None => Delay::dynamic(|_| NextDelay::Immediately),
                }
            }));
        }
        if let Some(n) = config.retry_qty {
            self.set_retry_qty(Some(n));
        }
        if let Some(ms) = config.retry_timeout_ms {
            self.set_retry_timeout(normalize_ms(Some(ms)).map(Delay::Fixed));
        }
        if let Some(ms) = config.time_limit_ms {
            self.set_time_limit(normalize_ms(Some(ms)));
        }
        if let Some(b) = config.retry_test {
            self = self.with_retry_test(Continuation::from(b));
        }
        if let Some(b) = config.retry_on_error {
            self = self.with_retry_on_error(Continuation::from(b));
        }
        self
    }
}

impl<T: 'static, E: 'static> RetrySettings<T, E> {
    /// Apply a [`RetryConfig`] to the current policy.
    pub fn with_config(self, config: &RetryConfig) -> Self {
        self.map_policy(|policy| policy.with_config(config))
    }
}
