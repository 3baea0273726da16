//! The operation to retry, bundled with its policy.

use std::fmt;
use std::future::Future;

use crate::retry::attempt::Attempt;
use crate::retry::policy::RetryPolicy;
use crate::retry::status::RetryStatus;

pub(crate) type Operation<T, E> = Box<dyn FnMut(&RetryStatus<T, E>) -> Attempt<T, E> + Send>;

/// Everything [`retry`](crate::retry) needs to start a cycle.
///
/// The operation receives the live status on every attempt. Whatever
/// context or arguments it needs are captured by the closure, or stored as
/// extensions on the policy and read back through
/// [`RetryStatus::extensions`].
///
/// # Examples
///
/// ```rust
/// use povtor::{retry, RetryPolicy, RetrySettings};
///
/// # tokio_test::block_on(async {
/// // Synchronous operation
/// let sync = RetrySettings::new(|_| Ok::<_, String>(1));
/// assert_eq!(retry(sync).completion().await, Ok(Some(1)));
///
/// // Asynchronous operation
/// let not_ready = RetrySettings::new_async(|status| {
///     let n = status.attempt();
///     async move { if n < 3 { Err(format!("attempt {} failed", n)) } else { Ok(n) } }
/// })
/// .with_policy(RetryPolicy::new().with_retry_qty(5).with_retry_on_error(true));
/// assert_eq!(retry(not_ready).completion().await, Ok(Some(3)));
/// # });
/// ```
pub struct RetrySettings<T, E> {
    operation: Operation<T, E>,
    policy: RetryPolicy<T, E>,
}

impl<T, E> RetrySettings<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Retry a synchronous operation. An `Err` return is a failure outcome.
    pub fn new<F>(mut operation: F) -> Self
    where
        F: FnMut(&RetryStatus<T, E>) -> Result<T, E> + Send + 'static,
    {
        Self::from_attempts(move |status: &RetryStatus<T, E>| {
            Attempt::Immediate(operation(status))
        })
    }

    /// Retry an asynchronous operation; each returned future is one attempt.
    pub fn new_async<F, Fut>(mut operation: F) -> Self
    where
        F: FnMut(&RetryStatus<T, E>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::from_attempts(move |status: &RetryStatus<T, E>| {
            Attempt::deferred(operation(status))
        })
    }

    /// Retry an operation that decides per call whether its outcome is
    /// immediate or deferred.
    pub fn from_attempts<F>(operation: F) -> Self
    where
        F: FnMut(&RetryStatus<T, E>) -> Attempt<T, E> + Send + 'static,
    {
        Self {
            operation: Box::new(operation),
            policy: RetryPolicy::new(),
        }
    }
}

impl<T, E> RetrySettings<T, E> {
    /// Replace the policy.
    pub fn with_policy(mut self, policy: RetryPolicy<T, E>) -> Self {
        self.policy = policy;
        self
    }

    /// Adjust the current policy in place.
    pub fn map_policy<F>(mut self, f: F) -> Self
    where
        F: FnOnce(RetryPolicy<T, E>) -> RetryPolicy<T, E>,
    {
        self.policy = f(self.policy);
        self
    }

    /// Get the policy.
    pub fn policy(&self) -> &RetryPolicy<T, E> {
        &self.policy
    }

    pub(crate) fn into_parts(self) -> (Operation<T, E>, RetryPolicy<T, E>) {
        (self.operation, self.policy)
    }
}

impl<T, E> fmt::Debug for RetrySettings<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrySettings")
            .field("operation", &"<fn>")
            .field("policy", &self.policy)
            .finish()
    }
}
