use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of hex characters taken from a digest to build an identity.
pub(crate) const ID_HEX_LEN: usize = 16;
const GROUP_LEN: usize = 4;

/// The content-derived, display-formatted key of a level.
///
/// Always four hyphen-separated groups of four uppercase hex characters, e.g.
/// `1A2B-3C4D-5E6F-7A8B`. Construction goes through [`FromStr`] or
/// [`LevelId::from_hex`], both of which enforce the shape, so holding a
/// `LevelId` means holding a well-formed one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelId(String);

impl LevelId {
    /// Format 16 hex characters as a level identity.
    pub fn from_hex(hex: &str) -> Result<Self, Error> {
        if hex.len() != ID_HEX_LEN || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            exn::bail!(ErrorKind::InvalidLevelId(hex.to_string()));
        }
        let upper = hex.to_ascii_uppercase();
        let groups: Vec<&str> = (0..ID_HEX_LEN).step_by(GROUP_LEN).map(|i| &upper[i..i + GROUP_LEN]).collect();
        Ok(Self(groups.join("-")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name used by storage backends for this level.
    pub fn file_name(&self) -> String {
        format!("{}.swe", self.0)
    }
}

impl FromStr for LevelId {
    type Err = Error;

    /// Parses the display form. Lowercase hex is accepted and normalised to
    /// uppercase, since clients type these in by hand.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('-').collect();
        if parts.len() != ID_HEX_LEN / GROUP_LEN || parts.iter().any(|p| p.len() != GROUP_LEN) {
            exn::bail!(ErrorKind::InvalidLevelId(s.to_string()));
        }
        Self::from_hex(&parts.concat()).map_err(|_| Error::from(ErrorKind::InvalidLevelId(s.to_string())))
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LevelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for LevelId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LevelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|e: Error| serde::de::Error::custom(&*e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_from_hex_groups() {
        let id = LevelId::from_hex("0123456789abcdef").unwrap();
        assert_eq!(id.as_str(), "0123-4567-89AB-CDEF");
        assert_eq!(id.file_name(), "0123-4567-89AB-CDEF.swe");
    }

    #[rstest]
    #[case("0123-4567-89AB-CDEF", "0123-4567-89AB-CDEF")]
    #[case("0123-4567-89ab-cdef", "0123-4567-89AB-CDEF")]
    #[case("  0123-4567-89AB-CDEF ", "0123-4567-89AB-CDEF")]
    fn test_parse_valid(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(input.parse::<LevelId>().unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("0123456789ABCDEF")]
    #[case("0123-4567-89AB")]
    #[case("0123-4567-89AB-CDEG")]
    #[case("012-34567-89AB-CDEF")]
    #[case("0123-4567-89AB-CDEF-0000")]
    fn test_parse_invalid(#[case] input: &str) {
        let err = input.parse::<LevelId>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidLevelId(_)));
    }
}
