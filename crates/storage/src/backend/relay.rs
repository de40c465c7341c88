//! Attachment relay.
//!
//! A companion bot posts each level to a chat channel and reports back the
//! attachment id it was given. That id is the only way to build the CDN URL
//! later, so it's kept in the catalog database next to the level.
//!
//! A proxied relay points clients at this server's file route, which then
//! fetches the attachment itself.

use super::{StorageBackend, UploadMeta, proxied_file_url, with_trailing_slash};
use crate::error::{ErrorKind, Result};
use crate::http;
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tribe_catalog::Repository;
use tribe_ident::LevelId;

const CDN_URL: &str = "https://cdn.discordapp.com/attachments";

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    level_data: &'a str,
    level_id: &'a str,
    level_name: &'a str,
    level_author: &'a str,
    level_tags: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    status: String,
    #[serde(default)]
    attachment_id: Option<AttachmentId>,
}

/// Attachment ids arrive as either a JSON number or a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AttachmentId {
    Number(u64),
    Text(String),
}

impl AttachmentId {
    fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayBackend {
    name: String,
    client: Client,
    repo: Repository,
    api_url: String,
    base_url: String,
    channel_id: String,
    proxied: bool,
}

impl RelayBackend {
    pub fn new(
        name: impl Into<String>,
        repo: Repository,
        api_url: &str,
        base_url: &str,
        channel_id: impl Into<String>,
        proxied: bool,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            client: http::client(timeout)?,
            repo,
            api_url: api_url.trim_end_matches('/').to_string(),
            base_url: with_trailing_slash(base_url),
            channel_id: channel_id.into(),
            proxied,
        })
    }

    async fn direct_url(&self, id: &LevelId) -> Result<String> {
        let attachment_id = self
            .repo
            .get_attachment(id)
            .await
            .or_raise(|| ErrorKind::Catalog)?
            .ok_or_raise(|| ErrorKind::NotFound(id.clone()))?;
        Ok(format!("{CDN_URL}/{}/{attachment_id}/{}", self.channel_id, id.file_name()))
    }
}

#[async_trait]
impl StorageBackend for RelayBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload(&self, id: &LevelId, payload: &str, meta: &UploadMeta) -> Result<()> {
        let request = UploadRequest {
            level_data: payload,
            level_id: id.as_str(),
            level_name: &meta.name,
            level_author: &meta.author,
            level_tags: meta.tags.join(","),
        };
        let body = http::send(self.client.post(format!("{}/upload", self.api_url)).json(&request)).await?;
        let response: UploadResponse =
            serde_json::from_str(&body).or_raise(|| ErrorKind::Connection("malformed relay response".into()))?;
        if response.status != "success" {
            exn::bail!(ErrorKind::Connection(format!("relay answered status {:?}", response.status)));
        }
        let attachment_id = response
            .attachment_id
            .ok_or_raise(|| ErrorKind::Connection("relay response has no attachment id".into()))?
            .into_string();
        self.repo.upsert_attachment(id, &attachment_id).await.or_raise(|| ErrorKind::Catalog)?;
        tracing::info!(backend = %self.name, %id, %attachment_id, "Relayed level");
        Ok(())
    }

    async fn generate_url(&self, id: &LevelId) -> Result<String> {
        if self.proxied {
            return Ok(proxied_file_url(&self.base_url, id));
        }
        self.direct_url(id).await
    }

    /// Always the CDN URL, so downloads never go through this server.
    async fn generate_download_url(&self, id: &LevelId) -> Result<String> {
        self.direct_url(id).await
    }

    /// Forgets the attachment. The message itself stays in the channel.
    async fn delete(&self, id: &LevelId) -> Result<()> {
        if !self.repo.delete_attachment(id).await.or_raise(|| ErrorKind::Catalog)? {
            exn::bail!(ErrorKind::NotFound(id.clone()));
        }
        Ok(())
    }

    fn serves_in_place(&self) -> bool {
        self.proxied
    }

    async fn dump(&self, id: &LevelId) -> Result<String> {
        let url = self.direct_url(id).await?;
        http::send(self.client.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribe_catalog::Database;

    async fn backend(proxied: bool) -> RelayBackend {
        let db = Database::in_memory().await.unwrap();
        RelayBackend::new(
            "relay",
            Repository::from(&db),
            "http://127.0.0.1:9/",
            "http://tribe.example.com",
            "42",
            proxied,
            Duration::from_secs(1),
        )
        .unwrap()
    }

    fn id() -> LevelId {
        "0123-4567-89AB-CDEF".parse().unwrap()
    }

    #[tokio::test]
    async fn test_direct_url_uses_stored_attachment() {
        let backend = backend(false).await;
        assert!(matches!(&*backend.generate_url(&id()).await.unwrap_err(), ErrorKind::NotFound(_)));
        backend.repo.upsert_attachment(&id(), "777").await.unwrap();
        assert_eq!(
            backend.generate_url(&id()).await.unwrap(),
            "https://cdn.discordapp.com/attachments/42/777/0123-4567-89AB-CDEF.swe"
        );
    }

    #[tokio::test]
    async fn test_proxied_url_skips_lookup() {
        let backend = backend(true).await;
        assert!(backend.serves_in_place());
        assert_eq!(backend.generate_url(&id()).await.unwrap(), "http://tribe.example.com/stage/0123-4567-89AB-CDEF/file");
        backend.repo.upsert_attachment(&id(), "777").await.unwrap();
        assert_eq!(
            backend.generate_download_url(&id()).await.unwrap(),
            "https://cdn.discordapp.com/attachments/42/777/0123-4567-89AB-CDEF.swe"
        );
    }

    #[test]
    fn test_attachment_id_forms() {
        let numeric: UploadResponse = serde_json::from_str(r#"{"status":"success","attachment_id":123}"#).unwrap();
        assert_eq!(numeric.attachment_id.unwrap().into_string(), "123");
        let text: UploadResponse = serde_json::from_str(r#"{"status":"success","attachment_id":"456"}"#).unwrap();
        assert_eq!(text.attachment_id.unwrap().into_string(), "456");
    }
}
