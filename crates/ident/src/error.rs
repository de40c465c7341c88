//! Identity Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction, in the same shape as every other crate in the workspace.

use crate::LevelId;
use derive_more::{Display, Error};

/// An identity error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for identity operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The payload could not be decoded from its transport encoding. The
    /// client sent garbage; don't retry with the same input.
    #[display("malformed level payload: {_0}")]
    MalformedPayload(#[error(not(source))] &'static str),
    /// The decoded payload is larger than the configured limit.
    #[display("level payload is {size} bytes, limit is {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },
    /// Every digest in the fallback chain produced an identity that is
    /// already taken: the content is a genuine duplicate.
    #[display("level already exists: {_0}")]
    Duplicate(#[error(not(source))] LevelId),
    /// A string does not have the `XXXX-XXXX-XXXX-XXXX` shape.
    #[display("invalid level id: {_0}")]
    InvalidLevelId(#[error(not(source))] String),
    /// The identity index (catalog) could not answer a lookup.
    #[display("identity index lookup failed")]
    Index,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Index)
    }
}
