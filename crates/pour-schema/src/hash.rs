//! SHA-256 digests and formula checksums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::SchemaError;

/// A validated SHA256 digest (64 lowercase hex characters).
///
/// Validation happens at construction and deserialization time, so an
/// invalid hex string never propagates past the formula parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Create a new `Sha256Digest`, validating the input.
    ///
    /// Accepts strings with or without a `sha256:` prefix, in either case.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidDigest`] if the hex portion is not
    /// exactly 64 ASCII hex characters.
    pub fn new(s: impl Into<String>) -> Result<Self, SchemaError> {
        let s = s.into();
        let hex = s.strip_prefix("sha256:").unwrap_or(&s);

        if hex.len() != 64 {
            return Err(SchemaError::InvalidDigest(format!(
                "expected 64 hex characters, got {} in '{s}'",
                hex.len()
            )));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(SchemaError::InvalidDigest(format!(
                "contains non-hex characters in '{s}'"
            )));
        }

        Ok(Self(hex.to_lowercase()))
    }

    /// Digest of an in-memory buffer.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self::from_hasher(Sha256::new_with_prefix(data))
    }

    /// Finish an incremental hasher.
    pub fn from_hasher(hasher: Sha256) -> Self {
        Self(hex::encode(hasher.finalize()))
    }

    /// Get the digest as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Sha256Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Sha256Digest {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// The checksum a formula declares for one platform artifact.
///
/// Formulas in progress often carry a placeholder such as
/// `PUT_SHA256_HASH_HERE` until the release is cut. Such a value parses as
/// [`Checksum::Pending`] so the formula can still be inspected, but an
/// artifact can never be verified against it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Checksum {
    /// A real digest to verify downloads against.
    Sha256(Sha256Digest),
    /// An upper-case placeholder token.
    Pending(String),
}

impl Checksum {
    /// Parse a checksum string.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidChecksum`] for strings that are neither a
    /// valid digest nor a placeholder token (`[A-Z0-9_]+` with at least one
    /// non-hex character).
    pub fn parse(s: &str) -> Result<Self, SchemaError> {
        if let Ok(digest) = Sha256Digest::new(s) {
            return Ok(Self::Sha256(digest));
        }
        let is_token = !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
            && !s.chars().all(|c| c.is_ascii_hexdigit());
        if is_token {
            Ok(Self::Pending(s.to_string()))
        } else {
            Err(SchemaError::InvalidChecksum(s.to_string()))
        }
    }

    /// The digest, if one has been filled in.
    pub fn digest(&self) -> Option<&Sha256Digest> {
        match self {
            Self::Sha256(d) => Some(d),
            Self::Pending(_) => None,
        }
    }

    /// `true` for placeholder checksums.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256(d) => fmt::Display::fmt(d, f),
            Self::Pending(token) => f.write_str(token),
        }
    }
}

impl Serialize for Checksum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn digest_of_known_input() {
        assert_eq!(Sha256Digest::of_bytes(b"hello world").as_str(), HELLO);
    }

    #[test]
    fn digest_accepts_prefix_and_uppercase() {
        let upper = format!("sha256:{}", HELLO.to_uppercase());
        assert_eq!(Sha256Digest::new(upper).unwrap().as_str(), HELLO);
    }

    #[test]
    fn digest_rejects_wrong_length() {
        assert!(Sha256Digest::new("abc123").is_err());
    }

    #[test]
    fn checksum_placeholder_is_pending() {
        let c = Checksum::parse("PUT_SHA256_HASH_HERE").unwrap();
        assert!(c.is_pending());
        assert!(c.digest().is_none());
        assert_eq!(c.to_string(), "PUT_SHA256_HASH_HERE");
    }

    #[test]
    fn checksum_short_hex_is_an_error() {
        // looks like a truncated digest, not a placeholder
        assert!(matches!(
            Checksum::parse("ABC123"),
            Err(SchemaError::InvalidChecksum(_))
        ));
        assert!(Checksum::parse("not a hash").is_err());
    }

    #[test]
    fn checksum_deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Row {
            sha256: Checksum,
        }
        let row: Row = toml::from_str(&format!("sha256 = \"{HELLO}\"")).unwrap();
        assert_eq!(row.sha256.digest().unwrap().as_str(), HELLO);
    }
}
