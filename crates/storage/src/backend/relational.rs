//! Level content kept in the catalog database.
//!
//! The decoded content and the checksum are stored separately so the table
//! holds readable level JSON; [`dump()`](StorageBackend::dump) re-encodes
//! them into the exact transport form that was uploaded.

use super::{StorageBackend, UploadMeta, proxied_file_url, with_trailing_slash};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use tribe_catalog::Repository;
use tribe_ident::{LevelId, Payload};

#[derive(Debug, Clone)]
pub struct RelationalBackend {
    name: String,
    repo: Repository,
    base_url: String,
    max_content_bytes: usize,
}

impl RelationalBackend {
    /// `base_url` is this server's public address; level URLs point back at
    /// its file route.
    pub fn new(name: impl Into<String>, repo: Repository, base_url: &str, max_content_bytes: usize) -> Self {
        Self { name: name.into(), repo, base_url: with_trailing_slash(base_url), max_content_bytes }
    }
}

#[async_trait]
impl StorageBackend for RelationalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload(&self, id: &LevelId, payload: &str, _meta: &UploadMeta) -> Result<()> {
        let payload = Payload::decode(payload, self.max_content_bytes).or_raise(|| ErrorKind::InvalidPayload)?;
        self.repo.upsert_blob(id, payload.content(), payload.checksum()).await.or_raise(|| ErrorKind::Catalog)?;
        tracing::info!(backend = %self.name, %id, bytes = payload.content().len(), "Stored level");
        Ok(())
    }

    async fn generate_url(&self, id: &LevelId) -> Result<String> {
        Ok(proxied_file_url(&self.base_url, id))
    }

    async fn generate_download_url(&self, id: &LevelId) -> Result<String> {
        Ok(proxied_file_url(&self.base_url, id))
    }

    async fn delete(&self, id: &LevelId) -> Result<()> {
        if !self.repo.delete_blob(id).await.or_raise(|| ErrorKind::Catalog)? {
            exn::bail!(ErrorKind::NotFound(id.clone()));
        }
        Ok(())
    }

    fn serves_in_place(&self) -> bool {
        true
    }

    async fn dump(&self, id: &LevelId) -> Result<String> {
        let (content, checksum) = self
            .repo
            .get_blob(id)
            .await
            .or_raise(|| ErrorKind::Catalog)?
            .ok_or_raise(|| ErrorKind::NotFound(id.clone()))?;
        let payload = Payload::from_parts(content, checksum).or_raise(|| ErrorKind::InvalidPayload)?;
        Ok(payload.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribe_catalog::Database;

    const CHECKSUM: &str = "0123456789abcdef0123456789abcdef01234567";

    async fn backend() -> RelationalBackend {
        let db = Database::in_memory().await.unwrap();
        RelationalBackend::new("database", Repository::from(&db), "http://localhost:25019", 1024)
    }

    fn id() -> LevelId {
        "0123-4567-89AB-CDEF".parse().unwrap()
    }

    #[tokio::test]
    async fn test_dump_reproduces_upload() {
        let backend = backend().await;
        // base64("{\"name\":\"test\"}")
        let payload = format!("eyJuYW1lIjoidGVzdCJ9{CHECKSUM}");
        backend.upload(&id(), &payload, &UploadMeta::default()).await.unwrap();
        assert_eq!(backend.dump(&id()).await.unwrap(), payload);
    }

    #[tokio::test]
    async fn test_urls_point_at_file_route() {
        let backend = backend().await;
        assert!(backend.serves_in_place());
        assert_eq!(backend.generate_url(&id()).await.unwrap(), "http://localhost:25019/stage/0123-4567-89AB-CDEF/file");
        assert_eq!(backend.generate_download_url(&id()).await.unwrap(), backend.generate_url(&id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_level() {
        let backend = backend().await;
        assert!(matches!(&*backend.dump(&id()).await.unwrap_err(), ErrorKind::NotFound(_)));
        assert!(matches!(&*backend.delete(&id()).await.unwrap_err(), ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_content() {
        let backend = backend().await;
        let payload = format!("eyJuYW1lIjoidGVzdCJ9{CHECKSUM}");
        backend.upload(&id(), &payload, &UploadMeta::default()).await.unwrap();
        backend.delete(&id()).await.unwrap();
        assert!(matches!(&*backend.dump(&id()).await.unwrap_err(), ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_undecodable_payload() {
        let backend = backend().await;
        let err = backend.upload(&id(), "not a payload", &UploadMeta::default()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPayload));
    }
}
