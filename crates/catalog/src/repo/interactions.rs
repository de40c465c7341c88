use super::Repository;
use crate::error::{ErrorKind, Result};
use crate::models::{Interaction, Level};
use exn::ResultExt;
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;
use tribe_ident::LevelId;

#[derive(sqlx::FromRow)]
struct InteractionRow {
    level_id: String,
    liked: bool,
    disliked: bool,
    cleared: bool,
}

impl Repository {
    /// Insert a (level, user) record and, only if it is new, bump the matching
    /// counter. Both happen in one transaction.
    async fn add_reaction(
        &self,
        insert: &'static str,
        increment: &'static str,
        id: &LevelId,
        user_id: i64,
    ) -> Result<Option<Level>> {
        let mut tx = self.pool().begin().await.or_raise(|| ErrorKind::Database)?;
        let inserted = sqlx::query(insert)
            .bind(user_id)
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?
            .rows_affected();
        if inserted > 0 {
            sqlx::query(increment)
                .bind(id.as_str())
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        let level = Self::fetch_level(&mut *tx, id).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(level)
    }

    /// Like a level. Repeated likes by the same user are ignored.
    pub async fn add_like(&self, id: &LevelId, user_id: i64) -> Result<Option<Level>> {
        self.add_reaction(
            include_str!("../../queries/insert_like.sql"),
            include_str!("../../queries/increment_likes.sql"),
            id,
            user_id,
        )
        .await
    }

    /// Dislike a level. Repeated dislikes by the same user are ignored.
    pub async fn add_dislike(&self, id: &LevelId, user_id: i64) -> Result<Option<Level>> {
        self.add_reaction(
            include_str!("../../queries/insert_dislike.sql"),
            include_str!("../../queries/increment_dislikes.sql"),
            id,
            user_id,
        )
        .await
    }

    /// Count a clear, remember that `user_id` cleared the level (when
    /// `record_clear` is set), and take over the record if `time_ms` beats it.
    ///
    /// Every clear bumps the counter; the per-user record is deduplicated.
    /// The record comparison happens inside the `UPDATE`, so two simultaneous
    /// clears can't overwrite a faster time with a slower one.
    pub async fn add_clear(
        &self,
        id: &LevelId,
        user_id: i64,
        time_ms: u64,
        record_clear: bool,
    ) -> Result<Option<Level>> {
        let time_ms = i64::try_from(time_ms).or_raise(|| ErrorKind::InvalidData("clear time"))?;
        let mut tx = self.pool().begin().await.or_raise(|| ErrorKind::Database)?;
        let affected = sqlx::query(include_str!("../../queries/increment_clears.sql"))
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?
            .rows_affected();
        if affected == 0 {
            return Ok(None);
        }
        if record_clear {
            sqlx::query(include_str!("../../queries/insert_clear.sql"))
                .bind(user_id)
                .bind(id.as_str())
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        if time_ms > 0 {
            let updated = sqlx::query(include_str!("../../queries/update_record.sql"))
                .bind(time_ms)
                .bind(user_id)
                .bind(id.as_str())
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?
                .rows_affected();
            if updated > 0 {
                tracing::debug!(%id, user_id, time_ms, "New record");
            }
        }
        let level = Self::fetch_level(&mut *tx, id).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(level)
    }

    /// Look up a user's interaction with each of `ids` in one query.
    ///
    /// Levels the user never touched, and ids that aren't in the catalog, are
    /// absent from the map.
    pub async fn interactions(&self, user_id: i64, ids: &[LevelId]) -> Result<HashMap<LevelId, Interaction>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT l.level_id, EXISTS(SELECT 1 FROM likes WHERE level_pk = l.id AND user_id = ",
        );
        builder.push_bind(user_id);
        builder.push(") AS liked, EXISTS(SELECT 1 FROM dislikes WHERE level_pk = l.id AND user_id = ");
        builder.push_bind(user_id);
        builder.push(") AS disliked, EXISTS(SELECT 1 FROM clears WHERE level_pk = l.id AND user_id = ");
        builder.push_bind(user_id);
        builder.push(") AS cleared FROM levels l WHERE l.level_id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str().to_string());
        }
        separated.push_unseparated(")");
        let rows: Vec<InteractionRow> =
            builder.build_query_as().fetch_all(self.pool()).await.or_raise(|| ErrorKind::Database)?;
        rows.into_iter()
            .filter(|row| row.liked || row.disliked || row.cleared)
            .map(|row| {
                let id = row.level_id.parse::<LevelId>().or_raise(|| ErrorKind::InvalidData("level id"))?;
                Ok((id, Interaction { liked: row.liked, disliked: row.disliked, cleared: row.cleared }))
            })
            .collect()
    }
}
