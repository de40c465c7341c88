//! In-memory storage backend for testing.

use super::{StorageBackend, UploadMeta};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::OptionExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tribe_ident::LevelId;

/// In-memory storage backend for testing.
///
/// Payloads are stored in a `HashMap` behind a [`RwLock`], so all trait
/// methods can operate on `&self` without external synchronisation. Every
/// call to [`upload()`](StorageBackend::upload) is counted, including the
/// ones made to fail with [`fail_uploads()`](Self::fail_uploads), so tests
/// can assert that a request never reached storage.
///
/// # Examples
///
/// ```
/// use tribe_ident::LevelId;
/// use tribe_storage::{StorageBackend, UploadMeta, backend::MockBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::default();
/// let id: LevelId = "0123-4567-89AB-CDEF".parse()?;
/// backend.upload(&id, "payload", &UploadMeta::default()).await?;
/// assert_eq!(backend.uploads(), 1);
/// assert_eq!(backend.dump(&id).await?, "payload");
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<LevelId, String>>,
    uploads: AtomicUsize,
    failing: AtomicBool,
    failing_deletes: AtomicBool,
}

impl MockBackend {
    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make every following upload fail with a connection error.
    pub fn fail_uploads(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every following delete fail with a connection error.
    pub fn fail_deletes(&self, failing: bool) {
        self.failing_deletes.store(failing, Ordering::SeqCst);
    }

    /// Number of upload attempts so far.
    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub async fn contains(&self, id: &LevelId) -> bool {
        self.storage.read().await.contains_key(id)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(HashMap::new()),
            uploads: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            failing_deletes: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload(&self, id: &LevelId, payload: &str, _meta: &UploadMeta) -> Result<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Connection("mock upload failure".into()));
        }
        self.storage.write().await.insert(id.clone(), payload.to_string());
        Ok(())
    }

    async fn generate_url(&self, id: &LevelId) -> Result<String> {
        Ok(format!("mock://{}", id.file_name()))
    }

    async fn generate_download_url(&self, id: &LevelId) -> Result<String> {
        Ok(format!("mock://{}?raw", id.file_name()))
    }

    async fn delete(&self, id: &LevelId) -> Result<()> {
        if self.failing_deletes.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Connection("mock delete failure".into()));
        }
        self.storage.write().await.remove(id).map(|_| ()).ok_or_raise(|| ErrorKind::NotFound(id.clone()))
    }

    fn serves_in_place(&self) -> bool {
        true
    }

    async fn dump(&self, id: &LevelId) -> Result<String> {
        self.storage.read().await.get(id).cloned().ok_or_raise(|| ErrorKind::NotFound(id.clone()))
    }
}
