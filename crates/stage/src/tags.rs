//! Level tags and their display names.
//!
//! Levels store language-neutral tag codes. Clients upload and display tags
//! by name in their own language, so every code needs a name in every
//! [`Locale`].

use crate::error::{ErrorKind, Result};
use crate::viewer::Locale;
use exn::OptionExt;
use std::collections::HashMap;

/// `(code, [es, en, zh])`
const BUILTIN: [(&str, [&str; 3]); 14] = [
    ("standard", ["Tradicional", "Standard", "标准"]),
    ("puzzle", ["Puzles", "Puzzle", "解谜"]),
    ("speedrun", ["Contrarreloj", "Speedrun", "计时挑战"]),
    ("autoscroll", ["Autoavance", "Autoscroll", "自卷轴"]),
    ("auto", ["Automatismos", "Auto-mario", "自动图"]),
    ("shortcut", ["Corto pero intenso", "Short and sweet", "一次通过"]),
    ("multiplayer", ["Competitivo", "Multiplayer versus", "对战"]),
    ("themed", ["Tematico", "Themed", "机关"]),
    ("music", ["Música", "Music", "音乐"]),
    ("art", ["Artístico", "Art", "美术"]),
    ("technical", ["Habilidad", "Technical", "技巧"]),
    ("shooter", ["Disparos", "Shooter", "射击"]),
    ("boss", ["Contra jefes", "Boss battle", "BOSS战"]),
    ("single_player", ["En solitario", "Single player", "单人"]),
];

#[derive(Debug, Clone)]
pub struct TagTable {
    names: HashMap<(String, Locale), String>,
    /// Lowercased name in any locale to code.
    codes: HashMap<String, String>,
}

impl TagTable {
    /// Build a table from `(code, locale, name)` entries.
    ///
    /// Fails unless every code has a name in every locale.
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, Locale, &'a str)>) -> Result<Self> {
        let table = Self::from_entries(entries);
        let codes: Vec<&String> = table.names.keys().map(|(code, _)| code).collect();
        for code in codes {
            for locale in Locale::ALL {
                if !table.names.contains_key(&(code.clone(), locale)) {
                    tracing::error!(%code, ?locale, "Tag has no name");
                    exn::bail!(ErrorKind::Config);
                }
            }
        }
        Ok(table)
    }

    fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, Locale, &'a str)>) -> Self {
        let mut names = HashMap::new();
        let mut codes = HashMap::new();
        for (code, locale, name) in entries {
            names.insert((code.to_string(), locale), name.to_string());
            codes.insert(name.to_lowercase(), code.to_string());
        }
        Self { names, codes }
    }

    fn builtin_entries() -> impl Iterator<Item = (&'static str, Locale, &'static str)> {
        BUILTIN.into_iter().flat_map(|(code, names)| Locale::ALL.into_iter().zip(names).map(move |(l, n)| (code, l, n)))
    }

    /// The game's own tags.
    pub fn builtin() -> Self {
        Self::from_entries(Self::builtin_entries())
    }

    /// Display name of a tag, if the code is known.
    pub fn name(&self, code: &str, locale: Locale) -> Option<&str> {
        self.names.get(&(code.to_string(), locale)).map(String::as_str)
    }

    /// Parse an uploaded tag string such as `"Tradicional, Puzles"` into two
    /// codes. Names may be in any locale. A single tag fills both slots.
    pub fn parse(&self, raw: &str) -> Result<[String; 2]> {
        let names: Vec<&str> = raw.split(',').map(str::trim).filter(|n| !n.is_empty()).collect();
        let codes = names
            .iter()
            .map(|name| {
                self.codes.get(&name.to_lowercase()).cloned().ok_or_raise(|| ErrorKind::UnknownTag(name.to_string()))
            })
            .collect::<Result<Vec<String>>>()?;
        match <[String; 2]>::try_from(codes) {
            Ok(pair) => Ok(pair),
            Err(codes) if codes.len() == 1 => Ok([codes[0].clone(), codes[0].clone()]),
            Err(_) => exn::bail!(ErrorKind::InvalidField { field: "tags", reason: "expected one or two tags" }),
        }
    }
}

impl Default for TagTable {
    fn default() -> Self {
        Self::builtin()
    }
}
