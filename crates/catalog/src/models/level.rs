use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use time::OffsetDateTime;
use tribe_ident::LevelId;

/// Best clear of a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Clear duration in milliseconds, always non-zero.
    pub time_ms: u64,
    pub user_id: i64,
    pub username: String,
}

/// A level as stored in the catalog, with author and record holder resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub id: LevelId,
    pub name: String,
    pub style: u8,
    pub environment: u8,
    pub tags: [String; 2],
    pub created_at: OffsetDateTime,
    pub author_id: i64,
    pub author_name: String,
    /// The name contains characters outside the Latin script ranges.
    pub non_latin: bool,
    pub featured: bool,
    /// Uploaded from a testing build of the client; hidden from stable clients.
    pub testing_client: bool,
    pub description: Option<String>,
    pub plays: u64,
    pub deaths: u64,
    pub clears: u64,
    pub likes: u64,
    pub dislikes: u64,
    pub record: Option<Record>,
}

/// Everything needed to insert a level. Counters, flags and record all
/// start out empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLevel {
    pub id: LevelId,
    /// See [`Canonical::fingerprint`](tribe_ident::Canonical::fingerprint).
    pub fingerprint: String,
    pub name: String,
    pub style: u8,
    pub environment: u8,
    pub tags: [String; 2],
    pub created_at: OffsetDateTime,
    pub author_id: i64,
    pub non_latin: bool,
    pub testing_client: bool,
    pub description: Option<String>,
    /// Uploads the author may have once this one is counted. Checked in the
    /// same transaction as the insert.
    pub upload_limit: Option<u32>,
}

/// A viewer's relationship with one level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interaction {
    pub liked: bool,
    pub disliked: bool,
    pub cleared: bool,
}

#[derive(sqlx::FromRow)]
pub(crate) struct LevelRow {
    pub(crate) level_id: String,
    pub(crate) name: String,
    pub(crate) style: i64,
    pub(crate) environment: i64,
    pub(crate) tag_1: String,
    pub(crate) tag_2: String,
    pub(crate) created_at: i64,
    pub(crate) author_id: i64,
    pub(crate) author_name: String,
    pub(crate) non_latin: bool,
    pub(crate) featured: bool,
    pub(crate) testing_client: bool,
    pub(crate) description: Option<String>,
    pub(crate) plays: i64,
    pub(crate) deaths: i64,
    pub(crate) clears: i64,
    pub(crate) likes: i64,
    pub(crate) dislikes: i64,
    pub(crate) record_time: i64,
    pub(crate) record_user_id: Option<i64>,
    pub(crate) record_user_name: Option<String>,
}

fn counter(value: i64, field: &'static str) -> Result<u64, Error> {
    u64::try_from(value).or_raise(|| ErrorKind::InvalidData(field))
}

impl TryFrom<LevelRow> for Level {
    type Error = Error;
    fn try_from(row: LevelRow) -> Result<Self, Self::Error> {
        // A record whose holder was deleted is dropped rather than shown anonymously.
        let record = match (row.record_time, row.record_user_id, row.record_user_name) {
            (0, _, _) => None,
            (time, Some(user_id), Some(username)) => {
                Some(Record { time_ms: counter(time, "record time")?, user_id, username })
            },
            _ => None,
        };
        Ok(Self {
            id: row.level_id.parse::<LevelId>().or_raise(|| ErrorKind::InvalidData("level id"))?,
            name: row.name,
            style: u8::try_from(row.style).or_raise(|| ErrorKind::InvalidData("style"))?,
            environment: u8::try_from(row.environment).or_raise(|| ErrorKind::InvalidData("environment"))?,
            tags: [row.tag_1, row.tag_2],
            created_at: OffsetDateTime::from_unix_timestamp(row.created_at)
                .or_raise(|| ErrorKind::InvalidData("created at"))?,
            author_id: row.author_id,
            author_name: row.author_name,
            non_latin: row.non_latin,
            featured: row.featured,
            testing_client: row.testing_client,
            description: row.description,
            plays: counter(row.plays, "plays")?,
            deaths: counter(row.deaths, "deaths")?,
            clears: counter(row.clears, "clears")?,
            likes: counter(row.likes, "likes")?,
            dislikes: counter(row.dislikes, "dislikes")?,
            record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> LevelRow {
        LevelRow {
            level_id: "0123-4567-89AB-CDEF".into(),
            name: "Castle".into(),
            style: 1,
            environment: 2,
            tag_1: "standard".into(),
            tag_2: "puzzle".into(),
            created_at: 1_700_000_000,
            author_id: 1,
            author_name: "mario".into(),
            non_latin: false,
            featured: true,
            testing_client: false,
            description: None,
            plays: 10,
            deaths: 4,
            clears: 3,
            likes: 2,
            dislikes: 1,
            record_time: 0,
            record_user_id: None,
            record_user_name: None,
        }
    }

    #[test]
    fn test_row_without_record() {
        let level = Level::try_from(row()).unwrap();
        assert_eq!(level.id.as_str(), "0123-4567-89AB-CDEF");
        assert_eq!(level.tags, ["standard".to_string(), "puzzle".to_string()]);
        assert_eq!(level.created_at.unix_timestamp(), 1_700_000_000);
        assert!(level.record.is_none());
    }

    #[test]
    fn test_row_with_record() {
        let level = Level::try_from(LevelRow {
            record_time: 12_345,
            record_user_id: Some(2),
            record_user_name: Some("luigi".into()),
            ..row()
        })
        .unwrap();
        assert_eq!(level.record, Some(Record { time_ms: 12_345, user_id: 2, username: "luigi".into() }));
    }

    #[test]
    fn test_negative_counter_is_invalid() {
        let err = Level::try_from(LevelRow { plays: -1, ..row() }).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("plays")));
    }

    #[test]
    fn test_malformed_level_id_is_invalid() {
        let err = Level::try_from(LevelRow { level_id: "not-a-level".into(), ..row() }).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("level id")));
    }
}
