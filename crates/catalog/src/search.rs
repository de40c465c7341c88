//! Filtered, paginated level search.
//!
//! A [`SearchQuery`] is a conjunction of optional predicates. The same
//! predicates are pushed twice, once for the total count and once for the
//! requested page, so `num_rows` always describes the rows being paged over.

use crate::error::{ErrorKind, Result};
use crate::models::{Level, LevelRow};
use crate::repo::Repository;
use derive_more::{Display, Error};
use exn::ResultExt;
use sqlx::{QueryBuilder, Sqlite};
use std::str::FromStr;
use time::OffsetDateTime;

const SECONDS_PER_DAY: i64 = 86_400;
const WEEK_DAYS: u32 = 7;

/// A filter value that doesn't name any known variant.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

/// Featured-listing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeaturedMode {
    /// Featured levels only.
    Promising,
    /// Everything that isn't featured.
    NotPromising,
    /// Ordered by likes minus dislikes.
    Popular,
    /// Popular, restricted to the last week of uploads.
    PopularWeekly,
}

impl FromStr for FeaturedMode {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "promising" => Ok(Self::Promising),
            "notpromising" => Ok(Self::NotPromising),
            "popular" => Ok(Self::Popular),
            "popular_weekly" => Ok(Self::PopularWeekly),
            _ => Err(UnknownVariant::new("featured mode", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl FromStr for SortOrder {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "recientes" | "newest" => Ok(Self::Newest),
            "antiguos" | "oldest" => Ok(Self::Oldest),
            _ => Err(UnknownVariant::new("sort mode", s)),
        }
    }
}

/// Difficulty band derived from the clear rate `clears / plays`.
///
/// Bands are half-open and cover `[0, ∞)` without gaps, so every level that
/// has been played falls into exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Self; 4] = [Self::Easy, Self::Normal, Self::Hard, Self::Expert];

    /// Inclusive lower and exclusive upper bound on the clear rate.
    pub fn bounds(&self) -> (f64, Option<f64>) {
        match self {
            Self::Easy => (0.8, None),
            Self::Normal => (0.5, Some(0.8)),
            Self::Hard => (0.3, Some(0.5)),
            Self::Expert => (0.0, Some(0.3)),
        }
    }

    /// The band a level falls into, or `None` if it has never been played.
    pub fn classify(clears: u64, plays: u64) -> Option<Self> {
        if plays == 0 {
            return None;
        }
        let rate = clears as f64 / plays as f64;
        Self::ALL.into_iter().find(|d| {
            let (low, high) = d.bounds();
            rate >= low && high.is_none_or(|high| rate < high)
        })
    }
}

impl FromStr for Difficulty {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "0" => Ok(Self::Easy),
            "1" => Ok(Self::Normal),
            "2" => Ok(Self::Hard),
            "3" => Ok(Self::Expert),
            _ => Err(UnknownVariant::new("difficulty", s)),
        }
    }
}

/// "Uploaded within the last N days", written as `7` or `7d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadedWithin(pub u32);

impl FromStr for UploadedWithin {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_suffix('d').unwrap_or(trimmed);
        digits.parse().map(Self).map_err(|_| UnknownVariant::new("day count", s))
    }
}

/// Restrict results by the viewer's clear history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearedFilter {
    pub user_id: i64,
    pub cleared: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Substring of the level name.
    pub title: Option<String>,
    /// Exact author username.
    pub author: Option<String>,
    pub style: Option<u8>,
    pub environment: Option<u8>,
    pub uploaded_within: Option<UploadedWithin>,
    pub featured: Option<FeaturedMode>,
    pub sort: Option<SortOrder>,
    /// Only levels this user has liked.
    pub liked_by: Option<i64>,
    /// Only levels this user has disliked.
    pub disliked_by: Option<i64>,
    pub cleared: Option<ClearedFilter>,
    pub difficulty: Option<Difficulty>,
    /// Exclude levels uploaded from testing clients.
    pub hide_testing: bool,
    /// 1-based; anything below 1 is treated as 1.
    pub page: i64,
    pub rows_per_page: u32,
}

impl SearchQuery {
    pub fn new(rows_per_page: u32) -> Self {
        Self {
            title: None,
            author: None,
            style: None,
            environment: None,
            uploaded_within: None,
            featured: None,
            sort: None,
            liked_by: None,
            disliked_by: None,
            cleared: None,
            difficulty: None,
            hide_testing: false,
            page: 1,
            rows_per_page,
        }
    }

    fn page(&self) -> i64 {
        self.page.max(1)
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    pub levels: Vec<Level>,
    /// Rows matching the filters across all pages.
    pub num_rows: u64,
    pub rows_per_page: u32,
    pub pages: u64,
    pub page: u64,
}

/// Escape `LIKE` wildcards so a title is matched literally.
fn like_pattern(title: &str) -> String {
    let mut pattern = String::with_capacity(title.len() + 2);
    pattern.push('%');
    for c in title.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Append the clear-rate predicate for `difficulty`. Columns are those of
/// `level_details`.
pub(crate) fn push_difficulty(builder: &mut QueryBuilder<'_, Sqlite>, difficulty: Difficulty) {
    let (low, high) = difficulty.bounds();
    builder.push(" AND plays > 0 AND CAST(clears AS REAL) / plays >= ");
    builder.push_bind(low);
    if let Some(high) = high {
        builder.push(" AND CAST(clears AS REAL) / plays < ");
        builder.push_bind(high);
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &SearchQuery, now: OffsetDateTime) {
    builder.push(" WHERE 1 = 1");
    if let Some(title) = &query.title {
        builder.push(" AND name LIKE ");
        builder.push_bind(like_pattern(title));
        builder.push(r" ESCAPE '\'");
    }
    if let Some(author) = &query.author {
        builder.push(" AND author_name = ");
        builder.push_bind(author.clone());
    }
    if let Some(style) = query.style {
        builder.push(" AND style = ");
        builder.push_bind(i64::from(style));
    }
    if let Some(environment) = query.environment {
        builder.push(" AND environment = ");
        builder.push_bind(i64::from(environment));
    }
    let within = match query.featured {
        Some(FeaturedMode::PopularWeekly) => {
            let weekly = WEEK_DAYS;
            Some(query.uploaded_within.map_or(weekly, |w| w.0.min(weekly)))
        },
        _ => query.uploaded_within.map(|w| w.0),
    };
    if let Some(days) = within {
        builder.push(" AND created_at >= ");
        builder.push_bind(now.unix_timestamp().saturating_sub(i64::from(days) * SECONDS_PER_DAY));
    }
    match query.featured {
        Some(FeaturedMode::Promising) => _ = builder.push(" AND featured = 1"),
        Some(FeaturedMode::NotPromising) => _ = builder.push(" AND featured = 0"),
        _ => {},
    }
    if let Some(user_id) = query.liked_by {
        builder.push(" AND id IN (SELECT level_pk FROM likes WHERE user_id = ");
        builder.push_bind(user_id);
        builder.push(")");
    }
    if let Some(user_id) = query.disliked_by {
        builder.push(" AND id IN (SELECT level_pk FROM dislikes WHERE user_id = ");
        builder.push_bind(user_id);
        builder.push(")");
    }
    if let Some(filter) = query.cleared {
        builder.push(if filter.cleared { " AND EXISTS" } else { " AND NOT EXISTS" });
        builder.push(" (SELECT 1 FROM clears WHERE clears.level_pk = level_details.id AND clears.user_id = ");
        builder.push_bind(filter.user_id);
        builder.push(")");
    }
    if let Some(difficulty) = query.difficulty {
        push_difficulty(builder, difficulty);
    }
    if query.hide_testing {
        builder.push(" AND testing_client = 0");
    }
}

fn push_order(builder: &mut QueryBuilder<'_, Sqlite>, query: &SearchQuery) {
    let popular = matches!(query.featured, Some(FeaturedMode::Popular | FeaturedMode::PopularWeekly));
    builder.push(match query.sort.unwrap_or_default() {
        SortOrder::Oldest => " ORDER BY id ASC",
        SortOrder::Newest if popular => " ORDER BY likes - dislikes DESC, id DESC",
        SortOrder::Newest => " ORDER BY id DESC",
    });
}

impl Repository {
    /// Count the matching levels, then fetch the requested page.
    ///
    /// `rows_per_page` is trusted: callers validate it against their
    /// configured bounds. A zero page size yields an empty page.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchPage> {
        let now = OffsetDateTime::now_utc();
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM level_details");
        push_filters(&mut count, query, now);
        let num_rows: i64 = count
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        let num_rows = u64::try_from(num_rows).or_raise(|| ErrorKind::InvalidData("row count"))?;

        let rows_per_page = query.rows_per_page;
        let pages = match rows_per_page {
            0 => 0,
            rpp => num_rows.div_ceil(u64::from(rpp)),
        };
        let page = query.page();
        let levels = if num_rows == 0 || rows_per_page == 0 {
            Vec::new()
        } else {
            let limit = i64::from(rows_per_page);
            let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM level_details");
            push_filters(&mut select, query, now);
            push_order(&mut select, query);
            select.push(" LIMIT ");
            select.push_bind(limit);
            select.push(" OFFSET ");
            select.push_bind((page - 1).saturating_mul(limit));
            let rows: Vec<LevelRow> =
                select.build_query_as().fetch_all(self.pool()).await.or_raise(|| ErrorKind::Database)?;
            rows.into_iter().map(Level::try_from).collect::<Result<Vec<_>>>()?
        };
        Ok(SearchPage {
            levels,
            num_rows,
            rows_per_page,
            pages,
            page: u64::try_from(page).or_raise(|| ErrorKind::InvalidData("page"))?,
        })
    }
}
