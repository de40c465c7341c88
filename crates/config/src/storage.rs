use crate::error::{ErrorKind, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_BASE_URL: &str = "http://localhost:25019/";

/// Where level files live, and how long any single storage call may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub timeout_secs: u64,
    pub backend: BackendConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            backend: BackendConfig::Database { base_url: DEFAULT_BASE_URL.to_string() },
        }
    }
}

/// The storage backend, chosen once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BackendConfig {
    /// An onedrive-cf-index style object store accepting authenticated POSTs.
    ObjectStore {
        url: String,
        key: String,
        #[serde(default)]
        proxied: bool,
    },
    /// A OneManager style file manager using cookie authentication.
    FileManager { url: String, password: String },
    /// Level content kept in the catalog database and served by this server.
    Database { base_url: String },
    /// A companion bot that re-hosts files as chat attachments.
    AttachmentRelay {
        api_url: String,
        base_url: String,
        channel_id: String,
        #[serde(default)]
        proxied: bool,
    },
}

impl BackendConfig {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ObjectStore { .. } => "object-store",
            Self::FileManager { .. } => "file-manager",
            Self::Database { .. } => "database",
            Self::AttachmentRelay { .. } => "attachment-relay",
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Self::ObjectStore { url, key, .. } => {
                check_url("storage.backend.url", url)?;
                check_secret("storage.backend.key", key)
            },
            Self::FileManager { url, password } => {
                check_url("storage.backend.url", url)?;
                check_secret("storage.backend.password", password)
            },
            Self::Database { base_url } => check_url("storage.backend.base_url", base_url),
            Self::AttachmentRelay { api_url, base_url, channel_id, .. } => {
                check_url("storage.backend.api_url", api_url)?;
                check_url("storage.backend.base_url", base_url)?;
                check_secret("storage.backend.channel_id", channel_id)
            },
        }
    }
}

fn check_url(field: &'static str, url: &str) -> Result<()> {
    let rest = url.strip_prefix("https://").or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() => Ok(()),
        _ => exn::bail!(ErrorKind::Invalid { field, reason: "must be an http(s) URL" }),
    }
}

fn check_secret(field: &'static str, secret: &str) -> Result<()> {
    if secret.trim().is_empty() {
        exn::bail!(ErrorKind::Invalid { field, reason: "must not be empty" });
    }
    Ok(())
}
