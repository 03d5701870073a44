//! Package identifiers.
//!
//! - `PackageId`: a case-insensitive package id (`Newtonsoft.Json`)
//! - `PackageIdentity`: a package id paired with a concrete version

use crate::version::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

/// A validated, case-insensitive package id.
///
/// The declared spelling is kept for display; equality, hashing and
/// ordering use the lowercase key.
#[derive(Clone)]
pub struct PackageId {
    /// Id as declared.
    display: Arc<str>,
    /// Lowercase comparison key.
    key: Arc<str>,
}

impl PackageId {
    /// Parse a package id.
    ///
    /// Returns `None` for empty ids or ids with characters other than ASCII
    /// letters, digits, `.`, `-` and `_`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty()
            || !s
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'))
        {
            return None;
        }

        Some(Self {
            display: Arc::from(s),
            key: Arc::from(s.to_ascii_lowercase()),
        })
    }

    /// The id as declared.
    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// The lowercase comparison key.
    #[must_use]
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Case-insensitive comparison against a raw string.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.key.eq_ignore_ascii_case(other)
    }
}

impl fmt::Debug for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PackageId").field(&self.display).finish()
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display)
    }
}

impl PartialEq for PackageId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for PackageId {}

impl Hash for PackageId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for PackageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl FromStr for PackageId {
    type Err = PackageIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| PackageIdError(s.to_string()))
    }
}

impl Serialize for PackageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display)
    }
}

impl<'de> Deserialize<'de> for PackageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid package id: {s}")))
    }
}

/// Error when parsing an invalid package id.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid package id: {0}")]
pub struct PackageIdError(pub String);

/// A package id paired with a specific version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageIdentity {
    /// Package id.
    pub id: PackageId,
    /// Concrete version.
    pub version: Version,
}

impl PackageIdentity {
    /// Create a new identity.
    #[must_use]
    pub const fn new(id: PackageId, version: Version) -> Self {
        Self { id, version }
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}
