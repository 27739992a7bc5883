//! Error types for collection operations

use std::fmt;
use thiserror::Error;

/// Error type for collection operations
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("collection is empty")]
    Empty,
    #[error("position {0} is out of range for length {1}")]
    OutOfRange(isize, usize), // position, length
    #[error("key is already present")]
    DuplicateKey,
    #[error("key not found")]
    KeyNotFound,
    #[error("cursor is before the first element")]
    BeforeStart,
    #[error("cursor is after the last element")]
    AfterEnd,
    #[error("operation not supported by this cursor")]
    Unsupported,
}

/// An operation that would have taken ownership of `item` failed.
///
/// The item is handed back so that nothing is lost on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected<T> {
    pub error: Error,
    pub item: T,
}

impl<T> Rejected<T> {
    pub fn new(error: Error, item: T) -> Self {
        Self { error, item }
    }

    /// Recover the rejected item.
    pub fn into_inner(self) -> T {
        self.item
    }
}

impl<T> fmt::Display for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<T: fmt::Debug> std::error::Error for Rejected<T> {}

impl<T> From<Rejected<T>> for Error {
    fn from(rejected: Rejected<T>) -> Self {
        rejected.error
    }
}
