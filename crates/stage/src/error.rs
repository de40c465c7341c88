//! Stage Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Errors from the catalog, identity and storage crates
//! are raised into one of these kinds so the HTTP layer only ever has to look
//! at [`ErrorKind::category`].

use derive_more::{Display, Error};
use tribe_ident::LevelId;

/// A stage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for stage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// How the boundary should answer an error.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request is wrong; nothing changed.
    Validation,
    /// The level already exists.
    Conflict,
    /// Storage couldn't be reached. The client may try again.
    Transport,
    NotFound,
    Permission,
    Internal,
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    // -- Validation ----------------------------------------------------------
    #[display("malformed level payload")]
    MalformedPayload,
    #[display("level is {size} bytes, limit is {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },
    #[display("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: &'static str },
    #[display("unknown tag: {_0:?}")]
    UnknownTag(#[error(not(source))] String),
    #[display("unknown query mode: {_0:?}")]
    UnknownQueryMode(#[error(not(source))] String),
    #[display("unknown sort mode: {_0:?}")]
    UnknownSortMode(#[error(not(source))] String),
    #[display("unknown difficulty: {_0:?}")]
    UnknownDifficulty(#[error(not(source))] String),
    #[display("page size {requested} is outside 1..={max}")]
    InvalidPageSize { requested: u32, max: u32 },
    #[display("{_0} is disabled on this server")]
    FeatureDisabled(#[error(not(source))] &'static str),
    #[display("upload limit of {_0} levels reached")]
    UploadLimit(#[error(not(source))] u32),
    // -- Conflict ------------------------------------------------------------
    #[display("level already exists: {_0}")]
    Duplicate(#[error(not(source))] LevelId),
    // -- Transport -----------------------------------------------------------
    #[display("storage backend unavailable")]
    StorageConnection,
    // -- Not found -----------------------------------------------------------
    #[display("level not found: {_0}")]
    LevelNotFound(#[error(not(source))] LevelId),
    #[display("user not found: {_0}")]
    UserNotFound(#[error(not(source))] i64),
    #[display("no levels found")]
    NoLevelsFound,
    // -- Permission ----------------------------------------------------------
    #[display("permission denied")]
    PermissionDenied,
    // -- Internal ------------------------------------------------------------
    #[display("storage backend error")]
    Storage,
    #[display("catalog error")]
    Catalog,
    #[display("invalid configuration")]
    Config,
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedPayload
            | Self::PayloadTooLarge { .. }
            | Self::InvalidField { .. }
            | Self::UnknownTag(_)
            | Self::UnknownQueryMode(_)
            | Self::UnknownSortMode(_)
            | Self::UnknownDifficulty(_)
            | Self::InvalidPageSize { .. }
            | Self::FeatureDisabled(_)
            | Self::UploadLimit(_) => ErrorCategory::Validation,
            Self::Duplicate(_) => ErrorCategory::Conflict,
            Self::StorageConnection => ErrorCategory::Transport,
            Self::LevelNotFound(_) | Self::UserNotFound(_) | Self::NoLevelsFound => ErrorCategory::NotFound,
            Self::PermissionDenied => ErrorCategory::Permission,
            Self::Storage | Self::Catalog | Self::Config => ErrorCategory::Internal,
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::UnknownDifficulty("5".into()), ErrorCategory::Validation)]
    #[case(ErrorKind::UploadLimit(25), ErrorCategory::Validation)]
    #[case(ErrorKind::Duplicate("0123-4567-89AB-CDEF".parse().unwrap()), ErrorCategory::Conflict)]
    #[case(ErrorKind::StorageConnection, ErrorCategory::Transport)]
    #[case(ErrorKind::NoLevelsFound, ErrorCategory::NotFound)]
    #[case(ErrorKind::PermissionDenied, ErrorCategory::Permission)]
    #[case(ErrorKind::Catalog, ErrorCategory::Internal)]
    fn test_category(#[case] kind: ErrorKind, #[case] expected: ErrorCategory) {
        assert_eq!(kind.category(), expected);
    }

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(ErrorKind::StorageConnection.is_retryable());
        assert!(!ErrorKind::Storage.is_retryable());
        assert!(!ErrorKind::NoLevelsFound.is_retryable());
    }
}
