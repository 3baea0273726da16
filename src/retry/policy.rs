//! Retry policy types and configuration.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::extensions::Extensions;
use crate::retry::status::RetryStatus;

/// A retry policy describing when and how often to invoke the operation.
///
/// Policies are data plus caller callbacks. They are read-only once a cycle
/// starts; the live [`RetryStatus`] keeps a shared reference to the policy it
/// was started with.
///
/// # Defaults
///
/// With no settings the operation runs exactly once: retries are opt-in for
/// both outcomes.
///
/// # Examples
///
/// ```rust
/// use povtor::{AttemptBudget, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::<i32, String>::new()
///     .with_retry_qty(3)
///     .with_retry_timeout(Duration::from_millis(50))
///     .with_retry_test_fn(|value, _status| *value < 10);
///
/// assert_eq!(policy.budget(), AttemptBudget::Limited(4));
///
/// // An explicit schedule outranks the retry count.
/// let policy = policy.with_retry_attempts([
///     Duration::from_millis(100),
///     Duration::from_millis(200),
/// ]);
/// assert_eq!(policy.budget(), AttemptBudget::Limited(3));
/// ```
pub struct RetryPolicy<T, E> {
    initial_delay: Option<Duration>,
    retry_attempts: Vec<Delay<T, E>>,
    retry_qty: Option<i64>,
    retry_timeout: Option<Delay<T, E>>,
    retry_test: Continuation<T, T, E>,
    retry_on_error: Continuation<E, T, E>,
    time_limit: Option<Duration>,
    extensions: Extensions,
}

/// How many attempts a cycle may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptBudget {
    /// No limit.
    Unbounded,
    /// At most this many more attempts.
    Limited(u64),
}

/// Wait before an attempt: a fixed duration or one computed from the status.
pub enum Delay<T, E> {
    /// Always wait this long.
    Fixed(Duration),
    /// Ask the callback each time.
    Dynamic(Arc<dyn Fn(&RetryStatus<T, E>) -> NextDelay + Send + Sync>),
}

/// The result of resolving a [`Delay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextDelay {
    /// Start the next attempt without arming a timer.
    Immediately,
    /// Arm a timer for this long.
    After(Duration),
    /// End the cycle now with the last known outcome.
    Abort,
}

/// Decides whether another attempt follows an outcome of type `V`.
pub enum Continuation<V, T, E> {
    /// Always continue.
    Always,
    /// Never continue.
    Never,
    /// Continue when the predicate holds for the outcome and status.
    When(Arc<dyn Fn(&V, &RetryStatus<T, E>) -> bool + Send + Sync>),
}

impl AttemptBudget {
    /// Resolve the attempt budget from an explicit delay schedule and a retry
    /// count.
    ///
    /// A non-empty schedule of `L` delays allows `L + 1` attempts and wins over
    /// the count. Otherwise a non-negative count `n` allows `n + 1` attempts,
    /// and a negative or absent count is unbounded.
    ///
    /// ```rust
    /// use povtor::AttemptBudget;
    ///
    /// assert_eq!(AttemptBudget::resolve(0, Some(7)), AttemptBudget::Limited(8));
    /// assert_eq!(AttemptBudget::resolve(3, Some(7)), AttemptBudget::Limited(4));
    /// assert_eq!(AttemptBudget::resolve(0, Some(-1)), AttemptBudget::Unbounded);
    /// assert_eq!(AttemptBudget::resolve(0, None), AttemptBudget::Unbounded);
    /// ```
    pub fn resolve(schedule_len: usize, retry_qty: Option<i64>) -> Self {
        if schedule_len > 0 {
            return AttemptBudget::Limited(schedule_len as u64 + 1);
        }
        match retry_qty {
            Some(n) if n >= 0 => AttemptBudget::Limited((n as u64).saturating_add(1)),
            _ => AttemptBudget::Unbounded,
        }
    }

    /// Account for one attempt about to be scheduled.
    pub fn consume(&mut self) {
        if let AttemptBudget::Limited(n) = self {
            *n = n.saturating_sub(1);
        }
    }

    /// Returns true when no further attempt may start.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, AttemptBudget::Limited(0))
    }

    /// Attempts left, if bounded.
    pub fn remaining(&self) -> Option<u64> {
        match self {
            AttemptBudget::Unbounded => None,
            AttemptBudget::Limited(n) => Some(*n),
        }
    }
}

impl<T, E> Delay<T, E> {
    /// Compute the delay from the live status each time it is consumed.
    ///
    /// Returning [`NextDelay::Abort`] ends the cycle without another attempt.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&RetryStatus<T, E>) -> NextDelay + Send + Sync + 'static,
    {
        Delay::Dynamic(Arc::new(f))
    }

    /// Resolve this delay against the current status.
    pub fn resolve(&self, status: &RetryStatus<T, E>) -> NextDelay {
        match self {
            Delay::Fixed(d) => NextDelay::After(*d),
            Delay::Dynamic(f) => f(status),
        }
    }
}

impl<T, E> Clone for Delay<T, E> {
    fn clone(&self) -> Self {
        match self {
            Delay::Fixed(d) => Delay::Fixed(*d),
            Delay::Dynamic(f) => Delay::Dynamic(Arc::clone(f)),
        }
    }
}

impl<T, E> fmt::Debug for Delay<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delay::Fixed(d) => f.debug_tuple("Fixed").field(d).finish(),
            Delay::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl<T, E> From<Duration> for Delay<T, E> {
    fn from(d: Duration) -> Self {
        Delay::Fixed(d)
    }
}

impl From<Duration> for NextDelay {
    fn from(d: Duration) -> Self {
        NextDelay::After(d)
    }
}

impl From<Option<Duration>> for NextDelay {
    fn from(d: Option<Duration>) -> Self {
        d.map_or(NextDelay::Immediately, NextDelay::After)
    }
}

impl<V, T, E> Continuation<V, T, E> {
    /// Continue when `f` returns true.
    pub fn when<F>(f: F) -> Self
    where
        F: Fn(&V, &RetryStatus<T, E>) -> bool + Send + Sync + 'static,
    {
        Continuation::When(Arc::new(f))
    }

    /// Evaluate the setting for one outcome.
    pub fn decide(&self, outcome: &V, status: &RetryStatus<T, E>) -> bool {
        match self {
            Continuation::Always => true,
            Continuation::Never => false,
            Continuation::When(f) => f(outcome, status),
        }
    }
}

impl<V, T, E> Default for Continuation<V, T, E> {
    fn default() -> Self {
        Continuation::Never
    }
}

impl<V, T, E> From<bool> for Continuation<V, T, E> {
    fn from(b: bool) -> Self {
        if b {
            Continuation::Always
        } else {
            Continuation::Never
        }
    }
}

impl<V, T, E> Clone for Continuation<V, T, E> {
    fn clone(&self) -> Self {
        match self {
            Continuation::Always => Continuation::Always,
            Continuation::Never => Continuation::Never,
            Continuation::When(f) => Continuation::When(Arc::clone(f)),
        }
    }
}

impl<V, T, E> fmt::Debug for Continuation<V, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Continuation::Always => f.write_str("Always"),
            Continuation::Never => f.write_str("Never"),
            Continuation::When(_) => f.write_str("When(..)"),
        }
    }
}

impl<T, E> RetryPolicy<T, E> {
    /// A policy that runs the operation once.
    pub fn new() -> Self {
        Self {
            initial_delay: None,
            retry_attempts: Vec::new(),
            retry_qty: None,
            retry_timeout: None,
            retry_test: Continuation::Never,
            retry_on_error: Continuation::Never,
            time_limit: None,
            extensions: Extensions::new(),
        }
    }

    /// Wait this long before the very first attempt.
    pub fn with_initial_delay(mut self, d: Duration) -> Self {
        self.initial_delay = Some(d);
        self
    }

    /// Set an explicit schedule of inter-attempt delays.
    ///
    /// Each element is consumed by one retry, in order. A non-empty schedule
    /// of `L` delays allows `L + 1` attempts and overrides
    /// [`with_retry_qty`](Self::with_retry_qty). An empty schedule counts as
    /// absent.
    pub fn with_retry_attempts<I, D>(mut self, delays: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Delay<T, E>>,
    {
        self.retry_attempts = delays.into_iter().map(Into::into).collect();
        self
    }

    /// Set the maximum number of retries (not counting the first attempt).
    ///
    /// A negative count means unbounded.
    pub fn with_retry_qty(mut self, n: i64) -> Self {
        self.retry_qty = Some(n);
        self
    }

    /// Set the uniform delay between attempts, used when no explicit schedule
    /// is given.
    pub fn with_retry_timeout(mut self, delay: impl Into<Delay<T, E>>) -> Self {
        self.retry_timeout = Some(delay.into());
        self
    }

    /// Compute the uniform delay between attempts from the live status.
    pub fn with_retry_timeout_fn<F>(self, f: F) -> Self
    where
        F: Fn(&RetryStatus<T, E>) -> NextDelay + Send + Sync + 'static,
    {
        self.with_retry_timeout(Delay::dynamic(f))
    }

    /// Decide whether to retry after a successful outcome.
    pub fn with_retry_test(mut self, test: impl Into<Continuation<T, T, E>>) -> Self {
        self.retry_test = test.into();
        self
    }

    /// Retry after a success while `f` returns true.
    pub fn with_retry_test_fn<F>(self, f: F) -> Self
    where
        F: Fn(&T, &RetryStatus<T, E>) -> bool + Send + Sync + 'static,
    {
        self.with_retry_test(Continuation::when(f))
    }

    /// Decide whether to retry after a failure outcome.
    pub fn with_retry_on_error(mut self, test: impl Into<Continuation<E, T, E>>) -> Self {
        self.retry_on_error = test.into();
        self
    }

    /// Retry after a failure while `f` returns true.
    pub fn with_retry_on_error_fn<F>(self, f: F) -> Self
    where
        F: Fn(&E, &RetryStatus<T, E>) -> bool + Send + Sync + 'static,
    {
        self.with_retry_on_error(Continuation::when(f))
    }

    /// Stop retrying once this much time has passed since the cycle started.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Attach a caller-defined extra field.
    pub fn with_extension<V>(mut self, key: impl Into<String>, value: V) -> Self
    where
        V: std::any::Any + Send + Sync,
    {
        self.extensions.insert(key, value);
        self
    }

    /// Replace all caller-defined extra fields.
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    pub(crate) fn set_initial_delay(&mut self, d: Option<Duration>) {
        self.initial_delay = d;
    }

    pub(crate) fn set_retry_qty(&mut self, n: Option<i64>) {
        self.retry_qty = n;
    }

    pub(crate) fn set_retry_timeout(&mut self, delay: Option<Delay<T, E>>) {
        self.retry_timeout = delay;
    }

    pub(crate) fn set_time_limit(&mut self, limit: Option<Duration>) {
        self.time_limit = limit;
    }

    /// Get the delay before the first attempt.
    pub fn initial_delay(&self) -> Option<Duration> {
        self.initial_delay
    }

    /// Get the explicit delay schedule.
    pub fn retry_attempts(&self) -> &[Delay<T, E>] {
        &self.retry_attempts
    }

    /// Get the configured retry count.
    pub fn retry_qty(&self) -> Option<i64> {
        self.retry_qty
    }

    /// Get the uniform inter-attempt delay.
    pub fn retry_timeout(&self) -> Option<&Delay<T, E>> {
        self.retry_timeout.as_ref()
    }

    /// Get the success-continuation setting.
    pub fn retry_test(&self) -> &Continuation<T, T, E> {
        &self.retry_test
    }

    /// Get the failure-continuation setting.
    pub fn retry_on_error(&self) -> &Continuation<E, T, E> {
        &self.retry_on_error
    }

    /// Get the overall time ceiling.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    /// Get the caller-defined extra fields.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Resolve the attempt budget this policy allows.
    pub fn budget(&self) -> AttemptBudget {
        AttemptBudget::resolve(self.retry_attempts.len(), self.retry_qty)
    }

    /// The delay source consumed between attempts.
    pub(crate) fn schedule(&self) -> Schedule<T, E> {
        if self.retry_attempts.is_empty() {
            Schedule::Uniform(self.retry_timeout.clone())
        } else {
            Schedule::Explicit(self.retry_attempts.iter().cloned().collect())
        }
    }
}

impl<T, E> Default for RetryPolicy<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for RetryPolicy<T, E> {
    fn clone(&self) -> Self {
        Self {
            initial_delay: self.initial_delay,
            retry_attempts: self.retry_attempts.clone(),
            retry_qty: self.retry_qty,
            retry_timeout: self.retry_timeout.clone(),
            retry_test: self.retry_test.clone(),
            retry_on_error: self.retry_on_error.clone(),
            time_limit: self.time_limit,
            extensions: self.extensions.clone(),
        }
    }
}

impl<T, E> fmt::Debug for RetryPolicy<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("initial_delay", &self.initial_delay)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_qty", &self.retry_qty)
            .field("retry_timeout", &self.retry_timeout)
            .field("retry_test", &self.retry_test)
            .field("retry_on_error", &self.retry_on_error)
            .field("time_limit", &self.time_limit)
            .field("extensions", &self.extensions)
            .finish()
    }
}

/// Per-cycle delay source. The explicit schedule is drained one element per
/// retry; the policy's own copy is left untouched.
pub(crate) enum Schedule<T, E> {
    Explicit(VecDeque<Delay<T, E>>),
    Uniform(Option<Delay<T, E>>),
}

impl<T, E> Schedule<T, E> {
    /// Take the delay for the next retry.
    pub(crate) fn next_delay(&mut self) -> Option<Delay<T, E>> {
        match self {
            Schedule::Explicit(queue) => queue.pop_front(),
            Schedule::Uniform(delay) => delay.clone(),
        }
    }
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    #[test]
    fn test_budget_prefers_schedule() {
        assert_eq!(AttemptBudget::resolve(3, Some(100)), AttemptBudget::Limited(4));
        assert_eq!(AttemptBudget::resolve(3, Some(-1)), AttemptBudget::Limited(4));
        assert_eq!(AttemptBudget::resolve(1, None), AttemptBudget::Limited(2));
    }

    #[test]
    fn test_budget_from_qty() {
        assert_eq!(AttemptBudget::resolve(0, Some(0)), AttemptBudget::Limited(1));
        assert_eq!(AttemptBudget::resolve(0, Some(200)), AttemptBudget::Limited(201));
        assert_eq!(AttemptBudget::resolve(0, Some(-5)), AttemptBudget::Unbounded);
        assert_eq!(AttemptBudget::resolve(0, None), AttemptBudget::Unbounded);
    }

    #[test]
    fn test_budget_consume_saturates() {
        let mut budget = AttemptBudget::Limited(2);
        budget.consume();
        assert_eq!(budget.remaining(), Some(1));
        assert!(!budget.is_exhausted());
        budget.consume();
        assert!(budget.is_exhausted());
        budget.consume();
        assert_eq!(budget, AttemptBudget::Limited(0));
    }

    #[test]
    fn test_unbounded_never_exhausts() {
        let mut budget = AttemptBudget::Unbounded;
        for _ in 0..1_000 {
            budget.consume();
        }
        assert!(!budget.is_exhausted());
        assert_eq!(budget.remaining(), None);
    }

    #[test]
    fn test_empty_schedule_is_absent() {
        let policy = RetryPolicy::<i32, String>::new()
            .with_retry_attempts(Vec::<Duration>::new())
            .with_retry_qty(2);
        assert_eq!(policy.budget(), AttemptBudget::Limited(3));
        assert!(matches!(policy.schedule(), Schedule::Uniform(None)));
    }

    #[test]
    fn test_default_policy_runs_once_without_delays() {
        let policy = RetryPolicy::<i32, String>::default();
        assert_eq!(policy.budget(), AttemptBudget::Unbounded);
        assert!(policy.initial_delay().is_none());
        assert!(policy.retry_timeout().is_none());
        assert!(matches!(policy.retry_test(), Continuation::Never));
        assert!(matches!(policy.retry_on_error(), Continuation::Never));
        assert!(policy.time_limit().is_none());
    }

    #[test]
    fn test_explicit_schedule_drains_in_order() {
        let policy = RetryPolicy::<i32, String>::new().with_retry_attempts([
            Duration::from_millis(100),
            Duration::from_millis(200),
        ]);
        let mut schedule = policy.schedule();
        assert!(matches!(
            schedule.next_delay(),
            Some(Delay::Fixed(d)) if d == Duration::from_millis(100)
        ));
        assert!(matches!(
            schedule.next_delay(),
            Some(Delay::Fixed(d)) if d == Duration::from_millis(200)
        ));
        assert!(schedule.next_delay().is_none());
        // The policy keeps its own copy.
        assert_eq!(policy.retry_attempts().len(), 2);
    }

    #[test]
    fn test_uniform_schedule_repeats() {
        let policy =
            RetryPolicy::<i32, String>::new().with_retry_timeout(Duration::from_millis(5));
        let mut schedule = policy.schedule();
        for _ in 0..3 {
            assert!(matches!(
                schedule.next_delay(),
                Some(Delay::Fixed(d)) if d == Duration::from_millis(5)
            ));
        }
    }

    #[test]
    fn test_continuation_from_bool() {
        assert!(matches!(
            Continuation::<i32, i32, String>::from(true),
            Continuation::Always
        ));
        assert!(matches!(
            Continuation::<i32, i32, String>::from(false),
            Continuation::Never
        ));
        assert!(matches!(
            Continuation::<i32, i32, String>::default(),
            Continuation::Never
        ));
    }

    #[test]
    fn test_next_delay_conversions() {
        assert_eq!(
            NextDelay::from(Duration::from_millis(3)),
            NextDelay::After(Duration::from_millis(3))
        );
        assert_eq!(NextDelay::from(None::<Duration>), NextDelay::Immediately);
    }

    #[test]
    fn test_policy_debug_hides_callbacks() {
        let policy = RetryPolicy::<i32, String>::new()
            .with_retry_test_fn(|v, _| *v < 3)
            .with_retry_timeout_fn(|_| NextDelay::Abort)
            .with_extension("k", 1u8);
        let debug = format!("{:?}", policy);
        assert!(debug.contains("RetryPolicy"));
        assert!(debug.contains("When(..)"));
        assert!(debug.contains("Dynamic(..)"));
        assert!(debug.contains("\"k\""));
    }

    #[test]
    fn test_policy_is_clone() {
        let policy = RetryPolicy::<i32, String>::new()
            .with_retry_qty(4)
            .with_time_limit(Duration::from_secs(1))
            .with_extension("k", 1u8);
        let cloned = policy.clone();
        assert_eq!(cloned.retry_qty(), Some(4));
        assert_eq!(cloned.time_limit(), Some(Duration::from_secs(1)));
        assert_eq!(cloned.extensions().get::<u8>("k"), Some(&1));
    }
}
