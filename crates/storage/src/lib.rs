//! Level file storage.
//!
//! One backend is chosen at startup from [`StorageConfig`] and shared by
//! every request as a [`BackendHandle`]. Backends never retry: a failed
//! upload is reported to the caller as-is.

pub mod backend;
pub mod error;
mod http;

pub use crate::backend::{StorageBackend, UploadMeta};
use crate::backend::{FileManagerBackend, ObjectStoreBackend, RelationalBackend, RelayBackend};
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tribe_catalog::Repository;
use tribe_config::{BackendConfig, StorageConfig};

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;

/// Build the configured backend.
///
/// `repo` is used by backends that keep state in the catalog database, and
/// `max_content_bytes` bounds what the database backend accepts.
pub fn from_config(config: &StorageConfig, repo: &Repository, max_content_bytes: usize) -> Result<BackendHandle> {
    let name = config.backend.name();
    let timeout = Duration::from_secs(config.timeout_secs);
    let handle: BackendHandle = match &config.backend {
        BackendConfig::ObjectStore { url, key, proxied } => {
            Arc::new(ObjectStoreBackend::new(name, url, key.clone(), *proxied, timeout)?)
        },
        BackendConfig::FileManager { url, password } => {
            Arc::new(FileManagerBackend::new(name, url, password.clone(), timeout)?)
        },
        BackendConfig::Database { base_url } => {
            Arc::new(RelationalBackend::new(name, repo.clone(), base_url, max_content_bytes))
        },
        BackendConfig::AttachmentRelay { api_url, base_url, channel_id, proxied } => Arc::new(RelayBackend::new(
            name,
            repo.clone(),
            api_url,
            base_url,
            channel_id.clone(),
            *proxied,
            timeout,
        )?),
    };
    tracing::info!(backend = name, "Storage backend ready");
    Ok(handle)
}
