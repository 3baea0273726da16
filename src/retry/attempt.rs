//! The two shapes an attempt's outcome can take.

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;

/// What one invocation of the operation handed back to the driver.
///
/// Synchronous operations produce an [`Attempt::Immediate`] outcome; a
/// returned `Err` is the equivalent of a synchronous throw. Asynchronous
/// operations produce an [`Attempt::Deferred`] future whose settlement is the
/// attempt's outcome.
///
/// # Examples
///
/// ```rust
/// use povtor::Attempt;
///
/// let ready: Attempt<i32, String> = Attempt::from(Ok(1));
/// assert!(ready.is_immediate());
///
/// let later: Attempt<i32, String> = Attempt::deferred(async { Ok(2) });
/// assert!(!later.is_immediate());
/// ```
pub enum Attempt<T, E> {
    /// The outcome is already known.
    Immediate(Result<T, E>),
    /// The outcome settles when the future completes.
    Deferred(BoxFuture<'static, Result<T, E>>),
}

impl<T, E> Attempt<T, E> {
    /// Wrap a future as a deferred outcome.
    pub fn deferred<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::Deferred(future.boxed())
    }

    /// Immediate success.
    pub fn ok(value: T) -> Self {
        Self::Immediate(Ok(value))
    }

    /// Immediate failure.
    pub fn err(error: E) -> Self {
        Self::Immediate(Err(error))
    }

    /// Returns true if the outcome is already known.
    pub fn is_immediate(&self) -> bool {
        matches!(self, Self::Immediate(_))
    }

    /// Wait for the outcome, whichever shape it has.
    pub async fn settle(self) -> Result<T, E> {
        match self {
            Self::Immediate(result) => result,
            Self::Deferred(future) => future.await,
        }
    }
}

impl<T, E> From<Result<T, E>> for Attempt<T, E> {
    fn from(result: Result<T, E>) -> Self {
        Self::Immediate(result)
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Attempt<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(result) => f.debug_tuple("Immediate").field(result).finish(),
            Self::Deferred(_) => f.debug_tuple("Deferred").field(&"<future>").finish(),
        }
    }
}
