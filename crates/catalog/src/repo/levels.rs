use super::Repository;
use crate::error::{ErrorKind, Result};
use crate::models::{Level, LevelRow, NewLevel};
use crate::search::{Difficulty, push_difficulty};
use exn::{OptionExt, ResultExt};
use sqlx::{QueryBuilder, Sqlite};
use tribe_ident::LevelId;

impl Repository {
    // =========================================================================
    // Insert
    // =========================================================================

    /// Insert a level and count it against its author's uploads.
    ///
    /// Returns [`ErrorKind::Duplicate`] when the level id is already taken,
    /// which is how a lost race between two identical uploads surfaces, and
    /// [`ErrorKind::UploadLimit`] when the author is already at
    /// `upload_limit`. Either way nothing is written.
    pub async fn insert_level(&self, level: &NewLevel) -> Result<Level> {
        let mut tx = self.pool().begin().await.or_raise(|| ErrorKind::Database)?;
        let inserted = sqlx::query(include_str!("../../queries/insert_level.sql"))
            .bind(level.id.as_str())
            .bind(&level.fingerprint)
            .bind(&level.name)
            .bind(i64::from(level.style))
            .bind(i64::from(level.environment))
            .bind(&level.tags[0])
            .bind(&level.tags[1])
            .bind(level.created_at.unix_timestamp())
            .bind(level.author_id)
            .bind(level.non_latin)
            .bind(level.testing_client)
            .bind(level.description.as_deref())
            .execute(&mut *tx)
            .await;
        if let Err(sqlx::Error::Database(e)) = &inserted
            && e.is_unique_violation()
        {
            exn::bail!(ErrorKind::Duplicate(level.id.clone()));
        }
        inserted.or_raise(|| ErrorKind::Database)?;
        let counted = sqlx::query(include_str!("../../queries/increment_uploads.sql"))
            .bind(level.author_id)
            .bind(level.upload_limit.map(i64::from))
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if counted.rows_affected() == 0 {
            // The author row exists (foreign key), so only the limit can refuse it.
            let limit = level.upload_limit.ok_or_raise(|| ErrorKind::Database)?;
            exn::bail!(ErrorKind::UploadLimit(limit));
        }
        let stored = Self::fetch_level(&mut *tx, &level.id).await?.ok_or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(stored)
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    pub async fn get_level(&self, id: &LevelId) -> Result<Option<Level>> {
        Self::fetch_level(self.pool(), id).await
    }

    pub async fn contains_level(&self, id: &LevelId) -> Result<bool> {
        sqlx::query_scalar(include_str!("../../queries/contains_level.sql"))
            .bind(id.as_str())
            .fetch_one(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)
    }

    pub async fn count_levels(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../../queries/count_levels.sql"))
            .fetch_one(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("level count"))
    }

    /// Pick a level uniformly at random, optionally within a difficulty band.
    pub async fn random_level(&self, difficulty: Option<Difficulty>, hide_testing: bool) -> Result<Option<Level>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM level_details WHERE 1 = 1");
        if let Some(difficulty) = difficulty {
            push_difficulty(&mut builder, difficulty);
        }
        if hide_testing {
            builder.push(" AND testing_client = 0");
        }
        builder.push(" ORDER BY RANDOM() LIMIT 1");
        let row: Option<LevelRow> =
            builder.build_query_as().fetch_optional(self.pool()).await.or_raise(|| ErrorKind::Database)?;
        row.map(Level::try_from).transpose()
    }

    // =========================================================================
    // Update
    // =========================================================================

    pub async fn increment_plays(&self, id: &LevelId) -> Result<Option<Level>> {
        self.update_level(include_str!("../../queries/increment_plays.sql"), id).await
    }

    pub async fn increment_deaths(&self, id: &LevelId) -> Result<Option<Level>> {
        self.update_level(include_str!("../../queries/increment_deaths.sql"), id).await
    }

    pub async fn set_featured(&self, id: &LevelId, featured: bool) -> Result<Option<Level>> {
        let mut tx = self.pool().begin().await.or_raise(|| ErrorKind::Database)?;
        let affected = sqlx::query(include_str!("../../queries/set_featured.sql"))
            .bind(featured)
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

    /// Flip the featured flag in a single statement and return the level
    /// with its new state.
    pub async fn toggle_featured(&self, id: &LevelId) -> Result<Option<Level>> {
        self.update_level(include_str!("../../queries/toggle_featured.sql"), id).await
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete a level with its interaction records, and give the author their
    /// upload slot back. Returns the level as it was before deletion.
    pub async fn delete_level(&self, id: &LevelId) -> Result<Option<Level>> {
        let mut tx = self.pool().begin().await.or_raise(|| ErrorKind::Database)?;
        let Some(level) = Self::fetch_level(&mut *tx, id).await? else {
            return Ok(None);
        };
        sqlx::query(include_str!("../../queries/delete_level.sql"))
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../../queries/decrement_uploads.sql"))
            .bind(level.author_id)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(Some(level))
    }
}
