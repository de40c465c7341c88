//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, which provides a unified
//! interface for keeping level files somewhere a game client can fetch them
//! from: a remote object store, a file manager, the catalog database, or an
//! attachment relay.

mod file_manager;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod object_store;
mod relational;
mod relay;

pub use self::file_manager::FileManagerBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
pub use self::object_store::ObjectStoreBackend;
pub use self::relational::RelationalBackend;
pub use self::relay::RelayBackend;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use tribe_ident::LevelId;

/// Level metadata some backends forward alongside the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadMeta {
    pub name: String,
    pub author: String,
    pub tags: Vec<String>,
}

/// Unified interface for storage backends.
///
/// Lookups are by [`LevelId`] only. Every backend receives the payload in
/// its transport form (`base64(content) ++ checksum`) and is expected to hand
/// the same form back to clients, either from a URL it generates or, for
/// backends that [serve in place](Self::serves_in_place), from
/// [`dump()`](Self::dump).
///
/// # Examples
///
/// ```
/// use tribe_ident::LevelId;
/// use tribe_storage::{StorageBackend, UploadMeta, error::Result};
///
/// async fn publish(backend: &dyn StorageBackend, id: &LevelId, payload: &str) -> Result<String> {
///     backend.upload(id, payload, &UploadMeta::default()).await?;
///     backend.generate_url(id).await
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend (used for logging only).
    fn name(&self) -> &str;

    /// Store a level under `id`. Uploading the same id twice replaces the
    /// stored file.
    ///
    /// A failure here is final: nothing is retried, in this call or later.
    async fn upload(&self, id: &LevelId, payload: &str, meta: &UploadMeta) -> Result<()>;

    /// The URL clients load the level from.
    async fn generate_url(&self, id: &LevelId) -> Result<String>;

    /// The URL clients save the level file from.
    async fn generate_download_url(&self, id: &LevelId) -> Result<String>;

    /// Remove the stored file.
    ///
    /// Returns [`Unsupported`](ErrorKind::Unsupported) for backends without
    /// a delete API, and [`NotFound`](ErrorKind::NotFound) if nothing was
    /// stored under `id`.
    async fn delete(&self, id: &LevelId) -> Result<()>;

    /// Whether [`dump()`](Self::dump) returns the file. When `true`, the
    /// backend's URLs point back at this server.
    fn serves_in_place(&self) -> bool {
        false
    }

    /// The stored file in transport form.
    async fn dump(&self, id: &LevelId) -> Result<String> {
        let _ = id;
        exn::bail!(ErrorKind::Unsupported("dump"))
    }
}

/// Makes sure a configured base URL can have a file name appended to it.
pub(crate) fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') { url.to_string() } else { format!("{url}/") }
}

/// The URL backends that serve in place point clients at.
pub(crate) fn proxied_file_url(base_url: &str, id: &LevelId) -> String {
    format!("{base_url}stage/{id}/file")
}
