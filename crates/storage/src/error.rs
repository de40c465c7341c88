//! Storage Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use tribe_ident::LevelId;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote service couldn't be reached, timed out, answered with a
    /// failure status or an empty body. The upload may be retried by the
    /// client; the server never retries on its own.
    #[display("storage connection error: {_0}")]
    Connection(#[error(not(source))] String),
    /// No content is stored under this level id.
    #[display("level file not found: {_0}")]
    NotFound(#[error(not(source))] LevelId),
    /// The backend has no API for this operation.
    #[display("{_0} is not supported by this storage backend")]
    Unsupported(#[error(not(source))] &'static str),
    /// The payload handed to the backend couldn't be decoded.
    #[display("invalid level payload")]
    InvalidPayload,
    /// The catalog tables backing this storage failed.
    #[display("storage catalog error")]
    Catalog,
    /// The backend couldn't be constructed from its configuration.
    #[display("invalid storage configuration: {_0}")]
    Config(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}
