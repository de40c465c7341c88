use crate::Stage;
use crate::error::{ErrorKind, Result};
use crate::summary::LevelSummary;
use crate::viewer::Viewer;
use exn::{OptionExt, ResultExt};
use serde::Serialize;
use std::str::FromStr;
use tracing::instrument;
use tribe_catalog::search::{ClearedFilter, UploadedWithin};
use tribe_catalog::{Difficulty, FeaturedMode, SearchQuery, SortOrder};
use tribe_ident::LevelId;

/// Search filters as sent by a client. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub title: Option<String>,
    pub author: Option<String>,
    pub style: Option<u8>,
    pub environment: Option<u8>,
    /// Days, as `"7"` or `"7d"`.
    pub uploaded_within: Option<String>,
    /// `promising`, `notpromising`, `popular` or `popular_weekly`.
    pub featured: Option<String>,
    /// `recientes`/`newest` or `antiguos`/`oldest`.
    pub sort: Option<String>,
    /// `"0"` (easy) to `"3"` (expert).
    pub difficulty: Option<String>,
    /// Only levels the viewer liked.
    pub liked: bool,
    /// Only levels the viewer disliked.
    pub disliked: bool,
    /// Only levels the viewer has (or hasn't) cleared.
    pub cleared: Option<bool>,
    pub page: i64,
    pub rows_per_page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResponse {
    pub num_rows: u64,
    pub rows_per_page: u32,
    pub pages: u64,
    pub page: u64,
    pub result: Vec<LevelSummary>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_mode<T: FromStr>(value: &Option<String>, unknown: fn(String) -> ErrorKind) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    present(value).map(|v| v.parse::<T>().or_raise(|| unknown(v.to_string()))).transpose()
}

impl Stage {
    /// Build a catalog query for `viewer`, rejecting anything the catalog
    /// would otherwise have to guess at.
    fn query(&self, viewer: &Viewer, params: &SearchParams) -> Result<SearchQuery> {
        let rows_per_page = match params.rows_per_page {
            None => self.catalog.rows_per_page,
            Some(requested) if (1..=self.catalog.max_rows_per_page).contains(&requested) => requested,
            Some(requested) => {
                exn::bail!(ErrorKind::InvalidPageSize { requested, max: self.catalog.max_rows_per_page })
            },
        };
        let cleared = match params.cleared {
            Some(_) if !self.catalog.record_clears => exn::bail!(ErrorKind::FeatureDisabled("cleared filter")),
            Some(cleared) => Some(ClearedFilter { user_id: viewer.user_id, cleared }),
            None => None,
        };
        let uploaded_within = present(&params.uploaded_within)
            .map(|v| {
                v.parse::<UploadedWithin>()
                    .or_raise(|| ErrorKind::InvalidField { field: "uploaded_within", reason: "expected a day count" })
            })
            .transpose()?;
        Ok(SearchQuery {
            title: present(&params.title).map(str::to_string),
            author: present(&params.author).map(str::to_string),
            style: params.style,
            environment: params.environment,
            uploaded_within,
            featured: parse_mode::<FeaturedMode>(&params.featured, ErrorKind::UnknownQueryMode)?,
            sort: parse_mode::<SortOrder>(&params.sort, ErrorKind::UnknownSortMode)?,
            liked_by: params.liked.then_some(viewer.user_id),
            disliked_by: params.disliked.then_some(viewer.user_id),
            cleared,
            difficulty: parse_mode::<Difficulty>(&params.difficulty, ErrorKind::UnknownDifficulty)?,
            hide_testing: !viewer.testing_client,
            page: params.page,
            rows_per_page,
        })
    }

    /// Run a filtered search and summarize the requested page for `viewer`.
    #[instrument(skip_all, fields(user_id = viewer.user_id, page = params.page))]
    pub async fn search(&self, viewer: &Viewer, params: &SearchParams) -> Result<SearchResponse> {
        self.count_request();
        let query = self.query(viewer, params)?;
        let page = self.repo.search(&query).await.or_raise(|| ErrorKind::Catalog)?;
        // A page past the last one is as empty as a search with no matches.
        if page.num_rows == 0 || page.levels.is_empty() {
            exn::bail!(ErrorKind::NoLevelsFound);
        }
        tracing::debug!(num_rows = page.num_rows, pages = page.pages, "Search matched");
        let result = self.summarize(viewer, page.levels).await?;
        Ok(SearchResponse {
            num_rows: page.num_rows,
            rows_per_page: page.rows_per_page,
            pages: page.pages,
            page: page.page,
            result,
        })
    }

    /// Look up one level, summarized for `viewer`.
    pub async fn level(&self, viewer: &Viewer, id: &LevelId) -> Result<LevelSummary> {
        self.count_request();
        let level = self
            .repo
            .get_level(id)
            .await
            .or_raise(|| ErrorKind::Catalog)?
            .ok_or_raise(|| ErrorKind::LevelNotFound(id.clone()))?;
        self.single(viewer, level).await
    }

    /// Pick a random level, optionally within a difficulty band.
    pub async fn random_level(&self, viewer: &Viewer, difficulty: Option<&str>) -> Result<LevelSummary> {
        self.count_request();
        let difficulty = parse_mode::<Difficulty>(&difficulty.map(str::to_string), ErrorKind::UnknownDifficulty)?;
        let level = self
            .repo
            .random_level(difficulty, !viewer.testing_client)
            .await
            .or_raise(|| ErrorKind::Catalog)?
            .ok_or_raise(|| ErrorKind::NoLevelsFound)?;
        self.single(viewer, level).await
    }

    async fn single(&self, viewer: &Viewer, level: tribe_catalog::Level) -> Result<LevelSummary> {
        self.summarize(viewer, vec![level]).await?.pop().ok_or_raise(|| ErrorKind::Catalog)
    }
}
