mod level;
mod user;

pub use self::level::{Interaction, Level, NewLevel, Record};
pub(crate) use self::level::LevelRow;
pub use self::user::User;
pub(crate) use self::user::UserRow;
