//! Canonical record identifier and its sharded storage location.

use crate::{UuidError, UuidResult};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// HIS's canonical UUID representation (32 lowercase hex characters, no hyphens).
///
/// Once constructed, the contained UUID is known to be valid, so path derivation and display
/// are infallible.
///
/// # Construction
/// - [`ShardableUuid::new`] generates a new identifier for a record being created.
/// - [`ShardableUuid::parse`] validates an externally supplied identifier.
///
/// # Display format
/// Always the canonical 32-character lowercase hex form without hyphens.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardableUuid(Uuid);

impl Default for ShardableUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardableUuid {
    /// Shortest prefix accepted by [`ShardableUuid::is_prefix`].
    pub const MIN_PREFIX_LEN: usize = 4;

    /// Generates a new random (v4) identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses a UUID string that must already be in canonical form.
    ///
    /// This does **not** normalise other common UUID forms (for example, hyphenated or uppercase).
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not in canonical form.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if Self::is_canonical(input) {
            return Uuid::parse_str(input)
                .map(Self)
                .map_err(|e| UuidError::InvalidInput(e.to_string()));
        }
        Err(UuidError::InvalidInput(format!(
            "UUID must be 32 lowercase hex characters without hyphens, got: '{}'",
            input
        )))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in canonical UUID form.
    ///
    /// Exactly 32 bytes, each one of `0-9` or `a-f`.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32 && Self::is_lower_hex(input)
    }

    /// Returns true if `input` could be an abbreviated identifier: between
    /// [`Self::MIN_PREFIX_LEN`] and 32 lowercase hex characters.
    pub fn is_prefix(input: &str) -> bool {
        (Self::MIN_PREFIX_LEN..=32).contains(&input.len()) && Self::is_lower_hex(input)
    }

    /// Returns true if the canonical form of this identifier starts with `prefix`.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.to_string().starts_with(prefix)
    }

    fn is_lower_hex(input: &str) -> bool {
        input
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<uuid>/` where `s1`/`s2` are the first two pairs of hex
    /// characters of this identifier.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}

impl fmt::Display for ShardableUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for ShardableUuid {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShardableUuid::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ShardableUuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ShardableUuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ShardableUuid::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_canonical_uuid() {
        let id = ShardableUuid::new();
        let canonical = id.to_string();

        assert_eq!(canonical.len(), 32);
        assert!(ShardableUuid::is_canonical(&canonical));
    }

    #[test]
    fn test_parse_valid_canonical_uuid() {
        let canonical = "550e8400e29b41d4a716446655440000";
        let result = ShardableUuid::parse(canonical);

        assert_eq!(result.unwrap().to_string(), canonical);
    }

    #[test]
    fn test_parse_rejects_hyphenated_uuid() {
        let result = ShardableUuid::parse("550e8400-e29b-41d4-a716-446655440000");

        match result {
            Err(UuidError::InvalidInput(msg)) => {
                assert!(msg.contains("32 lowercase hex characters"));
            }
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn test_parse_rejects_non_canonical_forms() {
        for input in [
            "550E8400E29B41D4A716446655440000",
            "550e8400E29b41d4A716446655440000",
            "550e8400e29b41d4a71644665544000",
            "550e8400e29b41d4a7164466554400000",
            "550e8400e29b41d4a716446655440zzz",
            "",
        ] {
            assert!(ShardableUuid::parse(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_prefix_rules() {
        assert!(ShardableUuid::is_prefix("550e"));
        assert!(ShardableUuid::is_prefix("550e8400e29b41d4a716446655440000"));
        assert!(!ShardableUuid::is_prefix("550"));
        assert!(!ShardableUuid::is_prefix("550E"));
        assert!(!ShardableUuid::is_prefix("550e8400e29b41d4a7164466554400001"));

        let id = ShardableUuid::parse("550e8400e29b41d4a716446655440000").unwrap();
        assert!(id.starts_with("550e84"));
        assert!(!id.starts_with("550f"));
    }

    #[test]
    fn test_sharded_dir_structure() {
        let id = ShardableUuid::parse("550e8400e29b41d4a716446655440000").unwrap();
        let sharded = id.sharded_dir(Path::new("/his_data/cases"));

        assert_eq!(
            sharded,
            PathBuf::from("/his_data/cases/55/0e/550e8400e29b41d4a716446655440000")
        );
    }

    #[test]
    fn test_sharded_dir_different_uuids() {
        let id1 = ShardableUuid::parse("00112233445566778899aabbccddeeff").unwrap();
        let id2 = ShardableUuid::parse("aabbccddeeff00112233445566778899").unwrap();
        let parent = Path::new("/data");

        assert_eq!(
            id1.sharded_dir(parent),
            PathBuf::from("/data/00/11/00112233445566778899aabbccddeeff")
        );
        assert_eq!(
            id2.sharded_dir(parent),
            PathBuf::from("/data/aa/bb/aabbccddeeff00112233445566778899")
        );
    }

    #[test]
    fn test_from_str_requires_canonical_form() {
        let parsed: Result<ShardableUuid, _> = "550e8400e29b41d4a716446655440000".parse();
        assert!(parsed.is_ok());

        let parsed: Result<ShardableUuid, _> = "550e8400-e29b-41d4-a716-446655440000".parse();
        assert!(parsed.is_err());
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = ShardableUuid::parse("550e8400e29b41d4a716446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");

        let back: ShardableUuid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        let bad: Result<ShardableUuid, _> =
            serde_json::from_str("\"550e8400-e29b-41d4-a716-446655440000\"");
        assert!(bad.is_err());
    }
}
