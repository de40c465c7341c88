//! Opening the catalog database.

use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::time::Duration;
use tracing::instrument;
use tribe_config::DatabaseConfig;

use crate::error::{ErrorKind, Result};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Counter bumps from concurrent requests all queue on the single WAL writer.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// The catalog's connection pool, migrated to the current schema.
///
/// Holds level metadata, interaction records and, when the database storage
/// backend is active, the level content itself.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the database file named by `config`, creating it and its
    /// directory on first start, and bring the schema up to date.
    #[instrument(skip_all, fields(path = %config.path.display()))]
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        if let Some(dir) = config.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).or_raise(|| ErrorKind::Database)?;
        }
        let options = catalog_options().filename(&config.path).create_if_missing(true);
        let db = Self::with_options(options, config.max_connections.max(1)).await?;
        tracing::info!("Opened level catalog");
        Ok(db)
    }

    /// A private, empty catalog that lives as long as the pool.
    ///
    /// Not `#[cfg(test)]` so that other crates can use it in their tests.
    pub async fn in_memory() -> Result<Self> {
        // Each connection to ":memory:" would see its own database.
        Self::with_options(catalog_options().filename(":memory:"), 1).await
    }

    async fn with_options(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        MIGRATOR.run(&pool).await.or_raise(|| ErrorKind::Migration)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Foreign keys must be on for every connection: deleting a level relies on
/// them to drop its interaction records, and a level can't name an unknown
/// author.
fn catalog_options() -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT)
        .optimize_on_close(true, None)
}
