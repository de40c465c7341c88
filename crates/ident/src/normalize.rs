//! Canonicalisation of level content.
//!
//! The game writes the save time and date into every level file, so two
//! uploads of the same level made a minute apart differ byte-wise. Blanking
//! those two fields gives content that only changes when the level does.

use crate::error::Result;
use crate::payload::Payload;
use regex::Regex;
use std::sync::LazyLock;

/// Matches a `"time"` or `"date"` key followed by a JSON string value,
/// tolerating arbitrary whitespace around the colon and escaped quotes inside
/// the value. Keys are matched as whole string tokens, so `"datetime"` or
/// `"update"` are left alone.
static VOLATILE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(time|date)"\s*:\s*"(?:[^"\\]|\\.)*""#).unwrap());

/// Level content with volatile fields blanked out; the hashing input for
/// identity generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Canonical(String);

impl Canonical {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<&Payload> for Canonical {
    fn from(payload: &Payload) -> Self {
        Self(canonicalize(payload.content()))
    }
}

/// Blank every volatile field in decoded content.
///
/// Every match is rewritten to the same fixed form (`"time": ""`), which
/// makes the function idempotent.
pub fn canonicalize(content: &str) -> String {
    VOLATILE_FIELD.replace_all(content, r#""$1": """#).into_owned()
}

/// Decode a transport-encoded payload and canonicalise its content.
///
/// Fails with [`MalformedPayload`](crate::error::ErrorKind::MalformedPayload)
/// when the payload can't be decoded and with
/// [`PayloadTooLarge`](crate::error::ErrorKind::PayloadTooLarge) when the
/// decoded content exceeds `max_content_bytes`.
pub fn normalize(raw: &str, max_content_bytes: usize) -> Result<Canonical> {
    let payload = Payload::decode(raw, max_content_bytes)?;
    Ok(Canonical::from(&payload))
}
