//! Error types for retry operations.

/// Error carried by a rejected completion signal.
///
/// A retry cycle that ends on a failure outcome rejects with the last failure
/// the operation produced. A cycle whose driver was torn down by a panic in
/// the operation or in a caller-supplied predicate or delay function rejects
/// with [`RetryError::Panicked`] instead.
///
/// # Examples
///
/// ```rust
/// use povtor::{retry, RetryError, RetrySettings};
///
/// # tokio_test::block_on(async {
/// let status = retry(RetrySettings::new(|_: &_| Err::<i32, _>("Test rejection")));
///
/// match status.completion().await {
///     Err(RetryError::Rejected(reason)) => assert_eq!(reason, "Test rejection"),
///     other => panic!("unexpected completion: {:?}", other),
/// }
/// assert_eq!(status.attempt(), 1);
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The cycle finished on a failure outcome.
    Rejected(E),
    /// The operation or a policy callback panicked while the driver ran it.
    Panicked(String),
}

impl<E> RetryError<E> {
    /// Create a rejection error.
    pub fn rejected(error: E) -> Self {
        Self::Rejected(error)
    }

    /// Returns true if the cycle ended on a failure outcome.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Returns true if the driver was torn down by a panic.
    pub fn is_panicked(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }

    /// Get a reference to the failure outcome, if this is a rejection.
    pub fn rejection(&self) -> Option<&E> {
        match self {
            Self::Rejected(e) => Some(e),
            Self::Panicked(_) => None,
        }
    }

    /// Extract the failure outcome, if this is a rejection.
    pub fn into_rejection(self) -> Option<E> {
        match self {
            Self::Rejected(e) => Some(e),
            Self::Panicked(_) => None,
        }
    }

    /// Transform the failure outcome.
    pub fn map<F, E2>(self, f: F) -> RetryError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Self::Rejected(e) => RetryError::Rejected(f(e)),
            Self::Panicked(msg) => RetryError::Panicked(msg),
        }
    }
}

impl<E: std::fmt::Display> std::fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(e) => write!(f, "{}", e),
            Self::Panicked(msg) => write!(f, "retry driver panicked: {}", msg),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rejected(e) => Some(e),
            Self::Panicked(_) => None,
        }
    }
}

/// Render a panic payload the way the standard library's hook does.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_rejected_display_is_transparent() {
        let err = RetryError::rejected("connection failed");
        assert_eq!(format!("{}", err), "connection failed");
    }

    #[test]
    fn test_panicked_display() {
        let err: RetryError<String> = RetryError::Panicked("boom".to_string());
        let display = format!("{}", err);
        assert!(display.contains("panicked"));
        assert!(display.contains("boom"));
    }

    #[test]
    fn test_accessors() {
        let err = RetryError::rejected("nope".to_string());
        assert!(err.is_rejected());
        assert!(!err.is_panicked());
        assert_eq!(err.rejection().map(String::as_str), Some("nope"));
        assert_eq!(err.into_rejection(), Some("nope".to_string()));

        let err: RetryError<String> = RetryError::Panicked("x".to_string());
        assert!(err.is_panicked());
        assert!(err.rejection().is_none());
        assert!(err.into_rejection().is_none());
    }

    #[test]
    fn test_map_keeps_panics() {
        let err = RetryError::rejected(3).map(|n| n * 2);
        assert_eq!(err, RetryError::Rejected(6));

        let err: RetryError<i32> = RetryError::Panicked("p".to_string());
        assert_eq!(err.map(|n| n * 2), RetryError::Panicked("p".to_string()));
    }

    #[test]
    fn test_error_source() {
        use std::error::Error;

        let io = std::io::Error::other("disk");
        let err = RetryError::rejected(io);
        assert!(err.source().is_some());

        let err: RetryError<std::io::Error> = RetryError::Panicked("p".to_string());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_panic_message_variants() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "Box<dyn Any>");
    }
}
