use crate::error::{Error, ErrorKind};
use exn::ResultExt;

/// The catalog's view of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Levels the user currently has in the catalog.
    pub uploads: u32,
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) uploads: i64,
}

impl TryFrom<UserRow> for User {
    type Error = Error;
    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            username: row.username,
            uploads: u32::try_from(row.uploads).or_raise(|| ErrorKind::InvalidData("uploads"))?,
        })
    }
}
