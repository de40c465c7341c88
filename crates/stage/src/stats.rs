//! Per-level counters reported by clients after playing.

use crate::Stage;
use crate::error::{ErrorKind, Result};
use crate::viewer::Viewer;
use exn::{OptionExt, ResultExt};
use tracing::instrument;
use tribe_catalog::Level;
use tribe_ident::LevelId;

fn found(id: &LevelId, level: tribe_catalog::error::Result<Option<Level>>) -> Result<Level> {
    level.or_raise(|| ErrorKind::Catalog)?.ok_or_raise(|| ErrorKind::LevelNotFound(id.clone()))
}

impl Stage {
    pub async fn add_play(&self, id: &LevelId) -> Result<Level> {
        self.count_request();
        found(id, self.repo.increment_plays(id).await)
    }

    pub async fn add_death(&self, id: &LevelId) -> Result<Level> {
        self.count_request();
        found(id, self.repo.increment_deaths(id).await)
    }

    /// Like a level. Repeat likes from the same viewer are ignored.
    #[instrument(skip(self, viewer), fields(user_id = viewer.user_id))]
    pub async fn add_like(&self, viewer: &Viewer, id: &LevelId) -> Result<Level> {
        self.count_request();
        found(id, self.repo.add_like(id, viewer.user_id).await)
    }

    #[instrument(skip(self, viewer), fields(user_id = viewer.user_id))]
    pub async fn add_dislike(&self, viewer: &Viewer, id: &LevelId) -> Result<Level> {
        self.count_request();
        found(id, self.repo.add_dislike(id, viewer.user_id).await)
    }

    /// Count a clear and, when `time_ms` is non-zero and beats the current
    /// record, make the viewer the record holder.
    #[instrument(skip(self, viewer), fields(user_id = viewer.user_id))]
    pub async fn add_clear(&self, viewer: &Viewer, id: &LevelId, time_ms: u64) -> Result<Level> {
        self.count_request();
        found(id, self.repo.add_clear(id, viewer.user_id, time_ms, self.catalog.record_clears).await)
    }
}
