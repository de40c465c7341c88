use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;
use tribe_config::LimitsConfig;

/// Display language of a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Es,
    En,
    Zh,
}

impl Locale {
    pub const ALL: [Self; 3] = [Self::Es, Self::En, Self::Zh];
}

impl FromStr for Locale {
    type Err = Infallible;

    /// Accepts bare language codes and region-qualified ones (`es_ES`,
    /// `zh-CN`). Anything unrecognised falls back to Spanish, the game's
    /// source language.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let language = s.split(['_', '-']).next().unwrap_or_default();
        Ok(match language.to_ascii_lowercase().as_str() {
            "en" => Self::En,
            "zh" | "cn" => Self::Zh,
            _ => Self::Es,
        })
    }
}

/// Account role, as reported by the account collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Regular,
    Booster,
    Moderator,
    Admin,
}

impl Role {
    pub fn is_moderator(&self) -> bool {
        *self >= Self::Moderator
    }

    /// How many levels this role may have uploaded at once, or `None` for
    /// no limit.
    pub fn upload_limit(&self, limits: &LimitsConfig) -> Option<u32> {
        match self {
            Self::Regular => Some(limits.uploads),
            Self::Booster => Some(limits.uploads.saturating_add(limits.booster_extra)),
            Self::Moderator | Self::Admin => None,
        }
    }
}

/// The authenticated user a request is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: i64,
    pub locale: Locale,
    /// Mobile clients can't render non-Latin level names.
    pub mobile: bool,
    /// Testing builds see levels uploaded from other testing builds.
    pub testing_client: bool,
    pub role: Role,
}

impl Viewer {
    pub fn new(user_id: i64) -> Self {
        Self { user_id, locale: Locale::default(), mobile: false, testing_client: false, role: Role::default() }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}
