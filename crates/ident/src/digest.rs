use crate::error::Result;
use crate::id::{ID_HEX_LEN, LevelId};
use crate::normalize::Canonical;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;

/// Offset of the identity slice within the uppercase hex digest.
const SLICE_START: usize = 8;

/// The digests tried, in order, when deriving a level identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    /// Probe order for identity assignment.
    pub const CHAIN: [Self; 3] = [Self::Md5, Self::Sha1, Self::Sha256];

    fn hex_digest(&self, bytes: &[u8]) -> String {
        match self {
            Self::Md5 => hex::encode_upper(Md5::digest(bytes)),
            Self::Sha1 => hex::encode_upper(Sha1::digest(bytes)),
            Self::Sha256 => hex::encode_upper(Sha256::digest(bytes)),
        }
    }

    /// Derive the identity of canonical content under this digest: hex
    /// characters `[8, 24)` of the uppercase digest, in four groups.
    pub fn identity(&self, canonical: &Canonical) -> Result<LevelId> {
        let digest = self.hex_digest(canonical.as_bytes());
        LevelId::from_hex(&digest[SLICE_START..SLICE_START + ID_HEX_LEN])
    }
}

impl Canonical {
    /// Full SHA-256 of the content in lowercase hex. Stored with each level
    /// so that a taken identity can be told apart from a collision.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.as_bytes()))
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        })
    }
}
