//! Client-facing view of a level.

use crate::error::{ErrorKind, Result};
use crate::viewer::Viewer;
use crate::{Stage, from_storage, latin};
use exn::ResultExt;
use serde::Serialize;
use std::ops::Deref;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tribe_catalog::{Interaction, Level};
use tribe_ident::LevelId;
use tribe_storage::error::ErrorKind as StorageErrorKind;

const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[month]/[day]/[year]");
const NO_DESCRIPTION: &str = "Sin descripción";

/// The viewer's vote on a level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Liked,
    Disliked,
    #[default]
    None,
}

impl From<Interaction> for Reaction {
    fn from(interaction: Interaction) -> Self {
        match (interaction.liked, interaction.disliked) {
            (true, _) => Self::Liked,
            (false, true) => Self::Disliked,
            (false, false) => Self::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub holder: String,
    pub holder_id: i64,
    pub time_ms: u64,
}

/// A level as shown to one viewer: names localized, interaction state
/// resolved, and a playable URL attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelSummary {
    pub id: LevelId,
    pub name: String,
    pub style: u8,
    pub environment: u8,
    pub tags: [String; 2],
    pub featured: bool,
    pub plays: u64,
    pub deaths: u64,
    pub clears: u64,
    pub likes: u64,
    pub dislikes: u64,
    pub reaction: Reaction,
    pub cleared: bool,
    /// Upload date, `MM/DD/YYYY`.
    pub date: String,
    pub author: String,
    pub record: Option<RecordSummary>,
    pub url: String,
    pub description: String,
}

impl Stage {
    /// Turn catalog rows into summaries for `viewer`, keeping their order.
    ///
    /// Interaction state for all rows comes from a single lookup. A row whose
    /// content the backend can't locate is still listed, with an empty URL.
    pub(crate) async fn summarize(&self, viewer: &Viewer, levels: Vec<Level>) -> Result<Vec<LevelSummary>> {
        let ids: Vec<LevelId> = levels.iter().map(|level| level.id.clone()).collect();
        let interactions = self.repo.interactions(viewer.user_id, &ids).await.or_raise(|| ErrorKind::Catalog)?;
        let mut summaries = Vec::with_capacity(levels.len());
        for level in levels {
            let interaction = interactions.get(&level.id).copied().unwrap_or_default();
            let url = match self.backend.generate_url(&level.id).await {
                Ok(url) => url,
                Err(e) if matches!(e.deref(), StorageErrorKind::NotFound(_)) => {
                    tracing::warn!(id = %level.id, backend = self.backend.name(), "Level has no playable URL");
                    String::new()
                },
                Err(e) => from_storage(Err(e))?,
            };
            summaries.push(self.summary(viewer, level, interaction, url)?);
        }
        Ok(summaries)
    }

    fn summary(&self, viewer: &Viewer, level: Level, interaction: Interaction, url: String) -> Result<LevelSummary> {
        let name = if viewer.mobile && level.non_latin { latin::latinify(&level.name) } else { level.name };
        let tags = level.tags.map(|code| self.tags.name(&code, viewer.locale).map_or(code.clone(), str::to_string));
        let date = level.created_at.format(DATE_FORMAT).or_raise(|| ErrorKind::Catalog)?;
        Ok(LevelSummary {
            id: level.id,
            name,
            style: level.style,
            environment: level.environment,
            tags,
            featured: level.featured,
            plays: level.plays,
            deaths: level.deaths,
            clears: level.clears,
            likes: level.likes,
            dislikes: level.dislikes,
            reaction: interaction.into(),
            cleared: interaction.cleared,
            date,
            author: level.author_name,
            record: level.record.map(|record| RecordSummary {
                holder: record.username,
                holder_id: record.user_id,
                time_ms: record.time_ms,
            }),
            url,
            description: level.description.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        })
    }
}
