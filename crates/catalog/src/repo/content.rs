//! Tables owned by storage backends that keep state in the catalog database.

use super::Repository;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use tribe_ident::LevelId;

impl Repository {
    // =========================================================================
    // Level content
    // =========================================================================

    /// Store decoded level content. Re-uploading the same id replaces it.
    pub async fn upsert_blob(&self, id: &LevelId, content: &str, checksum: &str) -> Result<()> {
        sqlx::query(include_str!("../../queries/upsert_blob.sql"))
            .bind(id.as_str())
            .bind(content)
            .bind(checksum)
            .execute(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Returns `(content, checksum)`.
    pub async fn get_blob(&self, id: &LevelId) -> Result<Option<(String, String)>> {
        sqlx::query_as(include_str!("../../queries/get_blob.sql"))
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Returns `false` if there was nothing to delete.
    pub async fn delete_blob(&self, id: &LevelId) -> Result<bool> {
        let result = sqlx::query(include_str!("../../queries/delete_blob.sql"))
            .bind(id.as_str())
            .execute(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Relay attachments
    // =========================================================================

    pub async fn upsert_attachment(&self, id: &LevelId, attachment_id: &str) -> Result<()> {
        sqlx::query(include_str!("../../queries/upsert_attachment.sql"))
            .bind(id.as_str())
            .bind(attachment_id)
            .execute(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    pub async fn get_attachment(&self, id: &LevelId) -> Result<Option<String>> {
        sqlx::query_scalar(include_str!("../../queries/get_attachment.sql"))
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)
    }

    pub async fn delete_attachment(&self, id: &LevelId) -> Result<bool> {
        let result = sqlx::query(include_str!("../../queries/delete_attachment.sql"))
            .bind(id.as_str())
            .execute(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
