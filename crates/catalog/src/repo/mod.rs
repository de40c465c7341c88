//! Repository over the catalog tables.
//!
//! Every mutation that touches more than one row runs in a transaction, and
//! counters are only ever changed by a single relative `UPDATE`, so concurrent
//! requests can't lose increments. Operations on a level that doesn't exist
//! return `Ok(None)`.

mod content;
mod interactions;
mod levels;
mod users;

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{Level, LevelRow};
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::{SqliteExecutor, SqlitePool};
use tribe_ident::{IdentityIndex, LevelId};

#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(crate) async fn fetch_level<'e, E>(executor: E, id: &LevelId) -> Result<Option<Level>>
    where
        E: SqliteExecutor<'e>,
    {
        let row: Option<LevelRow> = sqlx::query_as(include_str!("../../queries/get_level.sql"))
            .bind(id.as_str())
            .fetch_optional(executor)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Level::try_from).transpose()
    }

    /// Run a single-row `UPDATE` keyed on the level id, then read the level
    /// back inside the same transaction.
    pub(crate) async fn update_level(&self, query: &'static str, id: &LevelId) -> Result<Option<Level>> {
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let affected = sqlx::query(query)
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?
            .rows_affected();
        if affected == 0 {
            return Ok(None);
        }
        let level = Self::fetch_level(&mut *tx, id).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(level)
    }
}

#[async_trait]
impl IdentityIndex for Repository {
    async fn fingerprint(&self, id: &LevelId) -> tribe_ident::Result<Option<String>> {
        sqlx::query_scalar(include_str!("../../queries/get_fingerprint.sql"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
            .or_raise(|| tribe_ident::ErrorKind::Index)
    }
}
