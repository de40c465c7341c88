use crate::error::{ErrorKind, Result};
use crate::viewer::Viewer;
use crate::{Stage, from_storage};
use exn::{OptionExt, ResultExt};
use std::ops::Deref;
use tracing::instrument;
use tribe_catalog::Level;
use tribe_ident::LevelId;
use tribe_storage::error::ErrorKind as StorageErrorKind;

impl Stage {
    /// Permission is checked before the level is looked up, so a refusal
    /// says nothing about whether the level exists.
    fn require_moderator(viewer: &Viewer) -> Result<()> {
        if !viewer.role.is_moderator() {
            tracing::warn!(user_id = viewer.user_id, role = ?viewer.role, "Moderation attempt refused");
            exn::bail!(ErrorKind::PermissionDenied);
        }
        Ok(())
    }

    /// Flip the featured flag and return the new state.
    #[instrument(skip(self, viewer), fields(user_id = viewer.user_id))]
    pub async fn toggle_featured(&self, viewer: &Viewer, id: &LevelId) -> Result<bool> {
        self.count_request();
        Self::require_moderator(viewer)?;
        let level = self
            .repo
            .toggle_featured(id)
            .await
            .or_raise(|| ErrorKind::Catalog)?
            .ok_or_raise(|| ErrorKind::LevelNotFound(id.clone()))?;
        tracing::info!(%id, featured = level.featured, "Featured flag toggled");
        Ok(level.featured)
    }

    /// Remove a level: content first, metadata last.
    ///
    /// Content the backend can't find or can't delete is logged as an orphan
    /// and the metadata is removed anyway. A transport failure leaves both in
    /// place.
    #[instrument(skip(self, viewer), fields(user_id = viewer.user_id))]
    pub async fn delete_level(&self, viewer: &Viewer, id: &LevelId) -> Result<Level> {
        self.count_request();
        Self::require_moderator(viewer)?;
        if !self.repo.contains_level(id).await.or_raise(|| ErrorKind::Catalog)? {
            exn::bail!(ErrorKind::LevelNotFound(id.clone()));
        }

        match self.backend.delete(id).await {
            Ok(()) => {},
            Err(e) if matches!(e.deref(), StorageErrorKind::NotFound(_) | StorageErrorKind::Unsupported(_)) => {
                tracing::warn!(%id, backend = self.backend.name(), reason = %*e, "Orphaned level content");
            },
            Err(e) => {
                tracing::warn!(%id, backend = self.backend.name(), error = %*e, "Storage delete failed");
                return from_storage(Err(e));
            },
        }

        let level = self
            .repo
            .delete_level(id)
            .await
            .or_raise(|| ErrorKind::Catalog)?
            .ok_or_raise(|| ErrorKind::LevelNotFound(id.clone()))?;
        tracing::info!(%id, name = %level.name, "Level deleted");
        Ok(level)
    }
}
