use thiserror::Error;

use crate::Operation;

/// Result type returned by every [`CacheBackend`](crate::CacheBackend) operation.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors surfaced by cache operations.
///
/// The recording layer never produces or swallows these: whatever the
/// underlying backend returns reaches the caller unchanged.
///
/// # Examples
///
/// ```
/// use cache_panel_core::{CacheError, Operation};
///
/// let err = CacheError::Unsupported(Operation::Incr);
/// assert_eq!(err.to_string(), "No such method in backend: incr");
/// ```
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend does not implement this operation.
    #[error("No such method in backend: {0}")]
    Unsupported(Operation),

    /// `incr`/`decr` on a key that is not stored.
    #[error("Key '{0}' not found")]
    KeyNotFound(String),

    /// `incr`/`decr` on a value that is not an integer.
    #[error("Value stored at '{0}' is not an integer")]
    NotAnInteger(String),

    #[error("Integer overflow adjusting '{0}'")]
    Overflow(String),

    /// Failure reported by a concrete backend (connection, protocol, ...).
    #[error("Cache backend failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CacheError {
    /// Wraps an arbitrary backend error.
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        CacheError::Backend(err.into())
    }

    /// Returns `true` for the "operation not implemented" stub error.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, CacheError::Unsupported(_))
    }
}
