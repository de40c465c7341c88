//! Level orchestration.
//!
//! [`Stage`] ties the catalog, the identity generator and the configured
//! storage backend together into the operations clients perform: uploading,
//! searching and fetching levels, reporting plays and clears, and moderation.
//!
//! Request parsing and authentication happen elsewhere. Every operation takes
//! an already-authenticated [`Viewer`] and returns typed errors whose
//! [`category`](error::ErrorKind::category) tells the boundary how to answer.

pub mod error;
mod file;
mod latin;
mod locks;
mod moderation;
mod search;
mod stats;
mod summary;
mod tags;
mod upload;
mod viewer;

pub use crate::file::FileResponse;
pub use crate::latin::{is_non_latin, latinify};
pub use crate::search::{SearchParams, SearchResponse};
pub use crate::summary::{LevelSummary, Reaction, RecordSummary};
pub use crate::tags::TagTable;
pub use crate::upload::UploadRequest;
pub use crate::viewer::{Locale, Role, Viewer};
use crate::error::{ErrorKind, Result};
use crate::locks::KeyedLocks;
use exn::ResultExt;
use std::sync::atomic::{AtomicU64, Ordering};
use tribe_catalog::{Database, Repository};
use tribe_config::{CatalogConfig, Config, LimitsConfig};
use tribe_storage::BackendHandle;

/// Counts shown on the server status page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ServerStats {
    pub levels: u64,
    pub users: u64,
    /// Operations handled since startup.
    pub requests: u64,
}

pub struct Stage {
    repo: Repository,
    backend: BackendHandle,
    catalog: CatalogConfig,
    limits: LimitsConfig,
    tags: TagTable,
    locks: KeyedLocks,
    requests: AtomicU64,
}

impl Stage {
    pub fn new(repo: Repository, backend: BackendHandle, config: &Config) -> Self {
        Self {
            repo,
            backend,
            catalog: config.catalog.clone(),
            limits: config.limits.clone(),
            tags: TagTable::builtin(),
            locks: KeyedLocks::default(),
            requests: AtomicU64::new(0),
        }
    }

    /// Open the configured database, run migrations and build the
    /// configured storage backend.
    pub async fn open(config: &Config) -> Result<Self> {
        let db = Database::open(&config.database).await.or_raise(|| ErrorKind::Catalog)?;
        let repo = Repository::from(&db);
        let backend = tribe_storage::from_config(&config.storage, &repo, config.limits.max_payload_bytes)
            .or_raise(|| ErrorKind::Config)?;
        Ok(Self::new(repo, backend, config))
    }

    pub fn with_tags(mut self, tags: TagTable) -> Self {
        self.tags = tags;
        self
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    fn count_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn stats(&self) -> Result<ServerStats> {
        self.count_request();
        let levels = self.repo.count_levels().await.or_raise(|| ErrorKind::Catalog)?;
        let users = self.repo.count_users().await.or_raise(|| ErrorKind::Catalog)?;
        Ok(ServerStats { levels, users, requests: self.requests.load(Ordering::Relaxed) })
    }
}

/// Raise a storage error, keeping transport failures distinguishable.
pub(crate) fn from_storage<T>(result: tribe_storage::error::Result<T>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) => {
            let kind = if e.is_retryable() { ErrorKind::StorageConnection } else { ErrorKind::Storage };
            Err(e).or_raise(|| kind)
        },
    }
}
