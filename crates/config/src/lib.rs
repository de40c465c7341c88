//! Layered configuration for the level server.
//!
//! Values are resolved in order, later sources overriding earlier ones:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A config file, in TOML, YAML or JSON (picked by file extension). When
//!    no path is given, `config.toml` in the platform config directory is used
//!    if it exists.
//! 3. Environment variables prefixed with `TRIBE_`, using `__` to separate
//!    nested keys (e.g. `TRIBE_CATALOG__ROWS_PER_PAGE=10`).

pub mod error;
mod storage;

pub use crate::storage::{BackendConfig, StorageConfig};
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "TRIBE_";
const DEFAULT_CONFIG_FILE: &str = "config.toml";
const DEFAULT_DATABASE_FILE: &str = "tribe.db";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "tribe")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub catalog: CatalogConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = project_dirs()
            .map(|dirs| dirs.data_dir().join(DEFAULT_DATABASE_FILE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILE));
        Self { path, max_connections: 5 }
    }
}

/// Search and interaction behaviour of the level catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Page size used when a search doesn't ask for one.
    pub rows_per_page: u32,
    /// Upper bound for a page size requested by a client.
    pub max_rows_per_page: u32,
    /// Keep per-user clear records. Enables the cleared/not-cleared search
    /// filters and deduplicated clears.
    pub record_clears: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { rows_per_page: 5, max_rows_per_page: 50, record_clears: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Levels a regular user may have uploaded at once.
    pub uploads: u32,
    /// Additional uploads granted to boosters.
    pub booster_extra: u32,
    /// Largest accepted level, measured after decoding.
    pub max_payload_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { uploads: 25, booster_extra: 25, max_payload_bytes: 4 * 1024 * 1024 }
    }
}

impl Config {
    /// Platform-specific location of the default config file, if the platform
    /// has a notion of one.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(DEFAULT_CONFIG_FILE))
    }

    /// Build the layered provider without extracting it.
    ///
    /// An explicit `path` must exist; the default path is skipped silently
    /// when absent.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|p| p.is_file()),
        };
        if let Some(file) = file {
            tracing::debug!(path = %file.display(), "Loading config file");
            figment = match file.extension().and_then(|e| e.to_str()) {
                Some("toml") => figment.merge(Toml::file(&file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(&file)),
                Some("json") => figment.merge(Json::file(&file)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(file)),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load and validate the configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(path)?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            exn::bail!(ErrorKind::Invalid { field: "database.max_connections", reason: "must be at least 1" });
        }
        if self.catalog.rows_per_page == 0 {
            exn::bail!(ErrorKind::Invalid { field: "catalog.rows_per_page", reason: "must be at least 1" });
        }
        if self.catalog.rows_per_page > self.catalog.max_rows_per_page {
            exn::bail!(ErrorKind::Invalid {
                field: "catalog.rows_per_page",
                reason: "must not exceed catalog.max_rows_per_page",
            });
        }
        if self.storage.timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid { field: "storage.timeout_secs", reason: "must be at least 1" });
        }
        if self.limits.max_payload_bytes == 0 {
            exn::bail!(ErrorKind::Invalid { field: "limits.max_payload_bytes", reason: "must be at least 1" });
        }
        self.storage.backend.validate()
    }
}
