//! SQLite level catalog.
//!
//! The catalog is the source of truth for level metadata: identity, display
//! fields, counters, the featured flag, the clear record and per-user
//! interaction records. Level *content* lives with the storage backend, which
//! for the database backend happens to be a table in this same database.
//!
//! # Architecture
//! - [`Database`] opens the connection pool and runs the embedded migrations.
//! - [`Repository`] offers one explicit function per operation
//!   (`increment_plays`, `set_featured`, ...) that returns the updated row, or
//!   `None` when the level doesn't exist.
//! - [`search`] composes filtered, paginated queries.

mod db;
pub mod error;
mod models;
mod repo;
pub mod search;

pub use crate::db::Database;
pub use crate::models::{Interaction, Level, NewLevel, Record, User};
pub use crate::repo::Repository;
pub use crate::search::{Difficulty, FeaturedMode, SearchPage, SearchQuery, SortOrder};
