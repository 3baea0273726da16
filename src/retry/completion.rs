//! The single-settlement completion signal.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::future::{Map, Shared};
use futures::FutureExt;

use crate::retry::error::RetryError;

/// What the completion signal resolves to.
///
/// `Ok(None)` means the cycle was stopped before any attempt succeeded.
pub type CompletionOutput<T, E> = Result<Option<T>, RetryError<E>>;

type Inner<T, E> = Shared<
    Map<
        oneshot::Receiver<CompletionOutput<T, E>>,
        fn(Result<CompletionOutput<T, E>, oneshot::Canceled>) -> CompletionOutput<T, E>,
    >,
>;

/// A cloneable future that settles exactly once with the cycle's result.
///
/// Every clone observes the same settlement. [`RetryStatus::stop`] hands
/// back a clone of the same signal, which [`Completion::ptr_eq`] can confirm.
///
/// [`RetryStatus::stop`]: crate::RetryStatus::stop
#[must_use = "futures do nothing unless polled"]
pub struct Completion<T, E> {
    inner: Inner<T, E>,
}

impl<T, E> Completion<T, E>
where
    T: Clone,
    E: Clone,
{
    /// Returns true if both handles observe the same settlement.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Shared::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone, E: Clone> Clone for Completion<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone, E: Clone> Future for Completion<T, E> {
    type Output = CompletionOutput<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl<T, E> fmt::Debug for Completion<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}

fn flatten_canceled<T, E>(
    received: Result<CompletionOutput<T, E>, oneshot::Canceled>,
) -> CompletionOutput<T, E> {
    received.unwrap_or_else(|_| {
        Err(RetryError::Panicked(
            "retry driver dropped before settling".to_string(),
        ))
    })
}

/// Set-once cell guarding the resolve/reject side of a [`Completion`].
pub(crate) struct Settlement<T, E> {
    sender: Mutex<Option<oneshot::Sender<CompletionOutput<T, E>>>>,
}

impl<T: Clone, E: Clone> Settlement<T, E> {
    /// Create the cell together with the signal it settles.
    pub(crate) fn new() -> (Self, Completion<T, E>) {
        let (tx, rx) = oneshot::channel();
        let flatten: fn(_) -> _ = flatten_canceled::<T, E>;
        let completion = Completion {
            inner: rx.map(flatten).shared(),
        };
        (
            Self {
                sender: Mutex::new(Some(tx)),
            },
            completion,
        )
    }
}

impl<T, E> Settlement<T, E> {
    /// Settle the signal. Only the first call has any effect; it returns true.
    pub(crate) fn settle(&self, output: CompletionOutput<T, E>) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            // A dropped receiver only means nobody is listening any more.
            Some(tx) => {
                let _ = tx.send(output);
                true
            }
            None => false,
        }
    }

    /// Returns true once [`settle`](Self::settle) has run.
    pub(crate) fn is_settled(&self) -> bool {
        match self.sender.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

/// Anything that carries a completion signal.
pub trait WithCompletion<T, E> {
    /// Get a handle to the carried completion signal.
    fn completion(&self) -> Completion<T, E>;
}

impl<T: Clone, E: Clone> WithCompletion<T, E> for Completion<T, E> {
    fn completion(&self) -> Completion<T, E> {
        self.clone()
    }
}

/// Project the completion signal off any carrier.
///
/// ```rust
/// use povtor::{completion_signal, retry, RetrySettings};
///
/// # tokio_test::block_on(async {
/// let status = retry(RetrySettings::new(|_| Ok::<_, String>(1)));
/// let signal = completion_signal(&status);
/// assert!(signal.ptr_eq(&status.completion()));
/// assert_eq!(signal.await, Ok(Some(1)));
/// # });
/// ```
pub fn completion_signal<T, E, C>(carrier: &C) -> Completion<T, E>
where
    C: WithCompletion<T, E> + ?Sized,
{
    carrier.completion()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_settles_once() {
        let (cell, completion) = Settlement::<i32, String>::new();
        assert!(!cell.is_settled());
        assert!(cell.settle(Ok(Some(1))));
        assert!(!cell.settle(Ok(Some(2))));
        assert!(!cell.settle(Err(RetryError::Rejected("late".to_string()))));
        assert!(cell.is_settled());
        assert_eq!(completion.await, Ok(Some(1)));
    }

    #[tokio::test]
    async fn test_clones_share_settlement() {
        let (cell, completion) = Settlement::<i32, String>::new();
        let other = completion.clone();
        assert!(completion.ptr_eq(&other));

        cell.settle(Err(RetryError::Rejected("no".to_string())));
        assert_eq!(other.await, Err(RetryError::Rejected("no".to_string())));
        assert_eq!(completion.await, Err(RetryError::Rejected("no".to_string())));
    }

    #[tokio::test]
    async fn test_distinct_signals_are_not_equal() {
        let (_a, first) = Settlement::<i32, String>::new();
        let (_b, second) = Settlement::<i32, String>::new();
        assert!(!first.ptr_eq(&second));
    }

    #[tokio::test]
    async fn test_dropped_cell_reports_panicked() {
        let (cell, completion) = Settlement::<i32, String>::new();
        drop(cell);
        assert!(matches!(completion.await, Err(RetryError::Panicked(_))));
    }

    #[test]
    fn test_completion_signal_on_completion() {
        let (_cell, completion) = Settlement::<i32, String>::new();
        assert!(completion_signal(&completion).ptr_eq(&completion));
    }
}
