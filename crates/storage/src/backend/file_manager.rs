//! OneManager style file manager.
//!
//! Uploads go through the manager's small-file form as the administrator.
//! The manager has no delete endpoint and serves every file from its plain
//! URL, so both generated URLs are the same.

use super::{StorageBackend, UploadMeta, with_trailing_slash};
use crate::error::{ErrorKind, Result};
use crate::http;
use async_trait::async_trait;
use exn::ResultExt;
use md5::{Digest, Md5};
use reqwest::Client;
use reqwest::header::COOKIE;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use time::OffsetDateTime;
use tribe_ident::LevelId;

/// How long the admin cookie claims to be valid for.
const COOKIE_LIFETIME_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct FileManagerBackend {
    name: String,
    client: Client,
    url: String,
    password: String,
}

impl FileManagerBackend {
    pub fn new(name: impl Into<String>, url: &str, password: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            client: http::client(timeout)?,
            url: with_trailing_slash(url),
            password: password.into(),
        })
    }

    fn file_url(&self, id: &LevelId) -> String {
        format!("{}{}", self.url, id.file_name())
    }
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// `md5("admin:" ++ md5(password) ++ "@" ++ expiry) ++ "(" ++ expiry ++ ")"`
pub(crate) fn admin_cookie(password: &str, expires_at: i64) -> String {
    let signature = md5_hex(&format!("admin:{}@{expires_at}", md5_hex(password)));
    format!("admin={signature}({expires_at})")
}

#[async_trait]
impl StorageBackend for FileManagerBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload(&self, id: &LevelId, payload: &str, _meta: &UploadMeta) -> Result<()> {
        let part = Part::bytes(payload.as_bytes().to_vec())
            .file_name(id.file_name())
            .mime_str("text/plain")
            .or_raise(|| ErrorKind::InvalidPayload)?;
        let expires_at = OffsetDateTime::now_utc().unix_timestamp() + COOKIE_LIFETIME_SECS;
        let request = self
            .client
            .post(format!("{}?action=upsmallfile", self.url))
            .header(COOKIE, admin_cookie(&self.password, expires_at))
            .multipart(Form::new().part("file1", part));
        let body = http::send(request).await?;
        // The manager answers failed uploads with an error page that embeds a
        // JSON object right after the first character.
        if body.chars().nth(1).is_none_or(|c| c == '{') {
            exn::bail!(ErrorKind::Connection("file manager rejected the upload".into()));
        }
        tracing::info!(backend = %self.name, %id, bytes = payload.len(), "Uploaded level");
        Ok(())
    }

    async fn generate_url(&self, id: &LevelId) -> Result<String> {
        Ok(self.file_url(id))
    }

    async fn generate_download_url(&self, id: &LevelId) -> Result<String> {
        Ok(self.file_url(id))
    }

    async fn delete(&self, _id: &LevelId) -> Result<()> {
        exn::bail!(ErrorKind::Unsupported("delete"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_cookie() {
        // md5("admin") = 21232f297a57a5a743894a0e4a801fc3
        let expected = md5_hex("admin:21232f297a57a5a743894a0e4a801fc3@1700000000");
        assert_eq!(admin_cookie("admin", 1_700_000_000), format!("admin={expected}(1700000000)"));
    }

    #[test]
    fn test_md5_hex() {
        assert_eq!(md5_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[tokio::test]
    async fn test_urls_are_identical() {
        let backend =
            FileManagerBackend::new("manager", "http://files.example.com", "pw", Duration::from_secs(1)).unwrap();
        let id: LevelId = "0123-4567-89AB-CDEF".parse().unwrap();
        let url = backend.generate_url(&id).await.unwrap();
        assert_eq!(url, "http://files.example.com/0123-4567-89AB-CDEF.swe");
        assert_eq!(backend.generate_download_url(&id).await.unwrap(), url);
    }
}
