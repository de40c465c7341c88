use super::Repository;
use crate::error::{ErrorKind, Result};
use crate::models::{User, UserRow};
use exn::ResultExt;

impl Repository {
    /// Register an account with the catalog. Usernames are unique.
    pub async fn insert_user(&self, username: &str) -> Result<User> {
        let row: UserRow = sqlx::query_as(include_str!("../../queries/insert_user.sql"))
            .bind(username)
            .fetch_one(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.try_into()
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(include_str!("../../queries/get_user.sql"))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(User::try_from).transpose()
    }

    pub async fn get_user_by_name(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(include_str!("../../queries/get_user_by_name.sql"))
            .bind(username)
            .fetch_optional(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(User::try_from).transpose()
    }

    pub async fn count_users(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../../queries/count_users.sql"))
            .fetch_one(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("user count"))
    }
}
