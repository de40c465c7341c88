//! Content-addressed level identity.
//!
//! A level's identity is derived from its content: the transport payload is
//! decoded, its volatile timestamp fields are blanked, and the result is
//! hashed. Re-uploading the same level therefore maps to the same identity,
//! which is how duplicates are detected.

mod assign;
mod digest;
pub mod error;
mod id;
mod normalize;
mod payload;

pub use assign::{Assigned, IdentityIndex, assign, primary_identity};
pub use digest::DigestAlgorithm;
pub use error::{Error, ErrorKind, Result};
pub use id::LevelId;
pub use normalize::{Canonical, canonicalize, normalize};
pub use payload::{CHECKSUM_LEN, DEFAULT_MAX_CONTENT_BYTES, Payload};
