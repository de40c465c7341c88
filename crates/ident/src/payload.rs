//! Transport encoding of a level file.
//!
//! Clients send levels as `base64(content) ++ checksum`, where the checksum
//! is the trailing 40 hex characters of a SHA-1 HMAC computed by the game.
//! The server never verifies the checksum (it doesn't know the key), it only
//! carries it around so the file can be reconstructed byte-for-byte.

use crate::error::{ErrorKind, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use exn::ResultExt;

/// Length of the hex checksum trailing every encoded payload.
pub const CHECKSUM_LEN: usize = 40;
/// Default upper bound for decoded level content.
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 4 * 1024 * 1024;

/// A decoded level payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    content: String,
    checksum: String,
}

impl Payload {
    /// Build a payload from already-decoded parts, e.g. when reading a blob
    /// back out of a database row.
    pub fn from_parts(content: impl Into<String>, checksum: impl Into<String>) -> Result<Self> {
        let checksum = checksum.into();
        Self::check_checksum(&checksum)?;
        Ok(Self { content: content.into(), checksum })
    }

    /// Decode a transport-encoded payload.
    ///
    /// The size limit is applied to the decoded content *before* UTF-8
    /// validation, so oversized uploads are rejected without further work.
    /// The encoded length is checked first to avoid decoding a body that
    /// can't possibly fit.
    pub fn decode(raw: &str, max_content_bytes: usize) -> Result<Self> {
        let raw = raw.trim_end();
        if raw.len() < CHECKSUM_LEN {
            exn::bail!(ErrorKind::MalformedPayload("payload shorter than checksum"));
        }
        if !raw.is_char_boundary(raw.len() - CHECKSUM_LEN) {
            exn::bail!(ErrorKind::MalformedPayload("checksum is not ASCII"));
        }
        let (body, checksum) = raw.split_at(raw.len() - CHECKSUM_LEN);
        Self::check_checksum(checksum)?;
        let estimated = body.len() / 4 * 3;
        if estimated > max_content_bytes + 2 {
            exn::bail!(ErrorKind::PayloadTooLarge { size: estimated, limit: max_content_bytes });
        }
        let bytes = BASE64.decode(body).or_raise(|| ErrorKind::MalformedPayload("invalid base64"))?;
        if bytes.len() > max_content_bytes {
            exn::bail!(ErrorKind::PayloadTooLarge { size: bytes.len(), limit: max_content_bytes });
        }
        let content = String::from_utf8(bytes).or_raise(|| ErrorKind::MalformedPayload("content is not UTF-8"))?;
        Ok(Self { content, checksum: checksum.to_string() })
    }

    fn check_checksum(checksum: &str) -> Result<()> {
        if checksum.len() != CHECKSUM_LEN || !checksum.bytes().all(|b| b.is_ascii_hexdigit()) {
            exn::bail!(ErrorKind::MalformedPayload("checksum is not 40 hex characters"));
        }
        Ok(())
    }

    /// Re-encode into the transport form. For any payload produced by
    /// [`decode`](Self::decode) this returns the original string.
    pub fn encode(&self) -> String {
        let mut encoded = BASE64.encode(self.content.as_bytes());
        encoded.push_str(&self.checksum);
        encoded
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn into_parts(self) -> (String, String) {
        (self.content, self.checksum)
    }
}
