//! Package versions and allowed-version ranges.
//!
//! Versions follow the `major.minor[.patch[.revision]][-label][+metadata]`
//! shape:
//!
//! - Stable versions: `1.2.3`, `4.0.0.1`
//! - Pre-release versions: `1.0.0-alpha`, `2.0.0-beta.2`, `3.0.0-rc.1`
//! - Build metadata (ignored in comparisons): `1.0.0+sha.5114f85`
//!
//! Ranges use interval notation:
//! - Minimum inclusive: `1.0`
//! - Exact: `[1.0]`
//! - Interval: `[1.0,2.0)`, `(1.0,)`, `(,2.0]`
//! - Floating: `*`, `1.*`, `1.2.*`

use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Bound;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use version_ranges::Ranges;

/// Cache for parsed versions to avoid repeated parsing.
static VERSION_CACHE: LazyLock<RwLock<ahash::AHashMap<Arc<str>, Version>>> =
    LazyLock::new(|| RwLock::new(ahash::AHashMap::with_capacity(1024)));

/// Maximum cache size before eviction.
const MAX_CACHE_SIZE: usize = 8192;

static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^
        (\d+)                                   # major
        (?:\.(\d+))?                            # minor
        (?:\.(\d+))?                            # patch
        (?:\.(\d+))?                            # revision
        (?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?   # release labels
        (?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?  # metadata
        $
        ",
    )
    .expect("valid regex")
});

/// One dot-separated part of a release label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReleaseLabel {
    /// Numeric part (compared numerically).
    Numeric(u64),
    /// Alphanumeric part, stored lowercase (compared case-insensitively).
    Text(Arc<str>),
}

impl ReleaseLabel {
    fn parse(part: &str) -> Self {
        part.parse::<u64>().map_or_else(
            |_| Self::Text(Arc::from(part.to_ascii_lowercase())),
            Self::Numeric,
        )
    }
}

impl PartialOrd for ReleaseLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReleaseLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            // Numeric parts have lower precedence than alphanumeric parts
            (Self::Numeric(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Numeric(_)) => Ordering::Greater,
        }
    }
}

impl fmt::Display for ReleaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A totally ordered package version.
#[derive(Clone)]
pub struct Version {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
    /// Fourth (revision) component.
    pub revision: u64,
    /// Release label parts; empty for stable versions.
    pub release_labels: SmallVec<[ReleaseLabel; 2]>,
    /// Build metadata (ignored in comparisons).
    pub metadata: Option<Arc<str>>,
    /// Original string representation.
    original: Arc<str>,
}

impl Version {
    /// Create a stable version with major.minor.patch components.
    #[must_use]
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: 0,
            release_labels: SmallVec::new(),
            metadata: None,
            original: Arc::from(format!("{major}.{minor}.{patch}")),
        }
    }

    /// Parse a version string.
    ///
    /// # Examples
    ///
    /// ```
    /// use nuresolve_core::Version;
    ///
    /// let v = Version::parse("1.2.3").unwrap();
    /// assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
    ///
    /// let v = Version::parse("2.0.0-beta.1").unwrap();
    /// assert!(v.is_prerelease());
    /// ```
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if let Some(cached) = VERSION_CACHE.read().get(input) {
            return Some(cached.clone());
        }

        let result = Self::parse_uncached(input)?;

        {
            let mut cache = VERSION_CACHE.write();
            if cache.len() >= MAX_CACHE_SIZE {
                // Simple eviction: clear half the cache
                let keys: Vec<_> = cache.keys().take(MAX_CACHE_SIZE / 2).cloned().collect();
                for key in keys {
                    cache.remove(&key);
                }
            }
            cache.insert(Arc::from(input), result.clone());
        }

        Some(result)
    }

    fn parse_uncached(input: &str) -> Option<Self> {
        let caps = VERSION_REGEX.captures(input)?;

        let component = |i: usize| -> Option<u64> {
            caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
        };

        let release_labels = caps
            .get(5)
            .map(|m| m.as_str().split('.').map(ReleaseLabel::parse).collect())
            .unwrap_or_default();

        Some(Self {
            major: caps.get(1)?.as_str().parse().ok()?,
            minor: component(2)?,
            patch: component(3)?,
            revision: component(4)?,
            release_labels,
            metadata: caps.get(6).map(|m| Arc::from(m.as_str())),
            original: Arc::from(input),
        })
    }

    /// Check if this is a pre-release version.
    #[must_use]
    #[inline]
    pub fn is_prerelease(&self) -> bool {
        !self.release_labels.is_empty()
    }

    /// Get the original string representation.
    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.original
    }

    fn numeric(&self) -> (u64, u64, u64, u64) {
        (self.major, self.minor, self.patch, self.revision)
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Version").field(&self.original).finish()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.numeric() == other.numeric() && self.release_labels == other.release_labels
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.numeric().hash(state);
        self.release_labels.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.numeric().cmp(&other.numeric()) {
            Ordering::Equal => {}
            ord => return ord,
        }

        // A version without release labels is greater than one with labels
        match (self.release_labels.is_empty(), other.release_labels.is_empty()) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (true, true) => Ordering::Equal,
            (false, false) => self.release_labels.cmp(&other.release_labels),
        }
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| VersionParseError(s.to_string()))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid version: {s}")))
    }
}

/// Error when parsing a version string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid version string: {0}")]
pub struct VersionParseError(pub String);

/// An allowed-version range.
///
/// This wraps `version_ranges::Ranges` with interval-notation parsing and a
/// flag deciding whether pre-release versions inside the interval are
/// acceptable.
#[derive(Clone)]
pub struct VersionRange {
    /// The version intervals (union of intervals).
    ranges: Ranges<Version>,
    /// Whether pre-release versions satisfy this range.
    include_prerelease: bool,
    /// Original range string.
    original: Arc<str>,
}

impl VersionRange {
    /// The default range: every stable version.
    #[must_use]
    pub fn all_stable() -> Self {
        Self {
            ranges: Ranges::full(),
            include_prerelease: false,
            original: Arc::from("*"),
        }
    }

    /// Every version, pre-releases included.
    #[must_use]
    pub fn all() -> Self {
        Self {
            ranges: Ranges::full(),
            include_prerelease: true,
            original: Arc::from("(,)"),
        }
    }

    /// A range matching exactly one version.
    #[must_use]
    pub fn exact(version: Version) -> Self {
        let original = Arc::from(format!("[{version}]"));
        Self {
            include_prerelease: version.is_prerelease(),
            ranges: Ranges::singleton(version),
            original,
        }
    }

    /// Parse a range string.
    ///
    /// # Examples
    ///
    /// ```
    /// use nuresolve_core::{Version, VersionRange};
    ///
    /// let r = VersionRange::parse("[1.0,2.0)").unwrap();
    /// assert!(r.satisfies(&Version::parse("1.5.0").unwrap()));
    /// assert!(!r.satisfies(&Version::parse("2.0.0").unwrap()));
    /// ```
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if input == "*" {
            return Some(Self::all_stable());
        }

        if let Some(prefix) = input.strip_suffix(".*") {
            return Self::parse_floating(input, prefix);
        }

        if input.starts_with('[') || input.starts_with('(') {
            return Self::parse_interval(input);
        }

        // Bare version = minimum inclusive
        let version = Version::parse(input)?;
        Some(Self {
            ranges: Ranges::higher_than(version),
            include_prerelease: true,
            original: Arc::from(input),
        })
    }

    fn parse_floating(input: &str, prefix: &str) -> Option<Self> {
        let parts = prefix
            .split('.')
            .map(|p| p.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;

        let (lower, upper) = match parts.as_slice() {
            [major] => (
                Version::new(*major, 0, 0),
                Version::new(major.saturating_add(1), 0, 0),
            ),
            [major, minor] => (
                Version::new(*major, *minor, 0),
                Version::new(*major, minor.saturating_add(1), 0),
            ),
            [major, minor, patch] => (
                Version::new(*major, *minor, *patch),
                Version::new(*major, *minor, patch.saturating_add(1)),
            ),
            _ => return None,
        };

        Some(Self {
            ranges: Ranges::between(lower, upper),
            include_prerelease: false,
            original: Arc::from(input),
        })
    }

    fn parse_interval(input: &str) -> Option<Self> {
        let lower_inclusive = input.starts_with('[');
        let upper_inclusive = match input.chars().last()? {
            ']' => true,
            ')' => false,
            _ => return None,
        };
        let inner = input.get(1..input.len() - 1)?.trim();

        let Some((low, high)) = inner.split_once(',') else {
            // Only `[x]` is a valid single-version interval
            if !(lower_inclusive && upper_inclusive) {
                return None;
            }
            let version = Version::parse(inner)?;
            let mut exact = Self::exact(version);
            exact.include_prerelease = true;
            exact.original = Arc::from(input);
            return Some(exact);
        };

        if high.contains(',') {
            return None;
        }

        let lower = match low.trim() {
            "" => Ranges::full(),
            v if lower_inclusive => Ranges::higher_than(Version::parse(v)?),
            v => Ranges::strictly_higher_than(Version::parse(v)?),
        };
        let upper = match high.trim() {
            "" => Ranges::full(),
            v if upper_inclusive => Ranges::lower_than(Version::parse(v)?),
            v => Ranges::strictly_lower_than(Version::parse(v)?),
        };

        let ranges = lower.intersection(&upper);
        if ranges.is_empty() {
            return None;
        }

        Some(Self {
            ranges,
            include_prerelease: true,
            original: Arc::from(input),
        })
    }

    /// Check if a version satisfies this range.
    #[must_use]
    pub fn satisfies(&self, version: &Version) -> bool {
        if version.is_prerelease() && !self.include_prerelease {
            return false;
        }
        self.ranges.contains(version)
    }

    /// Compute the common subset of two ranges.
    ///
    /// Disjoint ranges produce an empty range; that is not an error here.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            ranges: self.ranges.intersection(&other.ranges),
            include_prerelease: self.include_prerelease && other.include_prerelease,
            original: Arc::from(format!("({}) ∩ ({})", self.original, other.original)),
        }
    }

    /// Check if no version can satisfy this range.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The lower bound of the range, if it has one.
    #[must_use]
    pub fn min_version(&self) -> Option<&Version> {
        match self.ranges.bounding_range()?.0 {
            Bound::Included(v) | Bound::Excluded(v) => Some(v),
            Bound::Unbounded => None,
        }
    }

    /// Get the underlying intervals.
    #[must_use]
    pub const fn ranges(&self) -> &Ranges<Version> {
        &self.ranges
    }

    /// Whether pre-release versions are admitted.
    #[must_use]
    pub const fn include_prerelease(&self) -> bool {
        self.include_prerelease
    }

    /// Get the original range string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::all_stable()
    }
}

impl fmt::Debug for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionRange")
            .field("original", &self.original)
            .field("ranges", &self.ranges)
            .field("include_prerelease", &self.include_prerelease)
            .finish()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

impl PartialEq for VersionRange {
    fn eq(&self, other: &Self) -> bool {
        self.ranges == other.ranges && self.include_prerelease == other.include_prerelease
    }
}

impl Eq for VersionRange {}

impl Hash for VersionRange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ranges.hash(state);
        self.include_prerelease.hash(state);
    }
}

impl FromStr for VersionRange {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| RangeParseError(s.to_string()))
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid range: {s}")))
    }
}

/// Error when parsing a range string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid version range: {0}")]
pub struct RangeParseError(pub String);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn r(s: &str) -> VersionRange {
        VersionRange::parse(s).unwrap()
    }

    mod version_parsing {
        use super::*;
        use test_case::test_case;

        #[test]
        fn simple_versions() {
            let ver = v("1.2.3");
            assert_eq!((ver.major, ver.minor, ver.patch), (1, 2, 3));

            let ver = v("1.2");
            assert_eq!((ver.major, ver.minor, ver.patch), (1, 2, 0));

            let ver = v("4.0.0.1");
            assert_eq!(ver.revision, 1);
        }

        #[test]
        fn prerelease_versions() {
            let ver = v("1.0.0-beta.2");
            assert!(ver.is_prerelease());
            assert_eq!(ver.release_labels.len(), 2);
            assert!(!v("1.0.0").is_prerelease());
        }

        #[test]
        fn metadata_is_ignored_for_equality() {
            assert_eq!(v("1.0.0+abc"), v("1.0.0"));
            assert_eq!(v("1.0.0+abc").metadata.as_deref(), Some("abc"));
        }

        #[test_case("" ; "empty")]
        #[test_case("abc" ; "letters")]
        #[test_case("1.0.0-" ; "dangling dash")]
        #[test_case("1..0" ; "double dot")]
        fn invalid(input: &str) {
            assert!(Version::parse(input).is_none());
        }

        #[test]
        fn display_keeps_original() {
            assert_eq!(v("1.0").to_string(), "1.0");
        }
    }

    mod version_ordering {
        use super::*;

        #[test]
        fn numeric_ordering() {
            assert!(v("1.0.0") < v("1.0.1"));
            assert!(v("1.0.1") < v("1.1.0"));
            assert!(v("1.1.0") < v("2.0.0"));
            assert!(v("1.0.0.1") > v("1.0.0"));
            assert_eq!(v("1.0"), v("1.0.0.0"));
        }

        #[test]
        fn prerelease_ordering() {
            assert!(v("1.0.0-alpha") < v("1.0.0-beta"));
            assert!(v("1.0.0-beta") < v("1.0.0-rc.1"));
            assert!(v("1.0.0-rc.1") < v("1.0.0"));
            assert!(v("1.0.0-beta.2") < v("1.0.0-beta.10"));
            assert!(v("1.0.0-1") < v("1.0.0-alpha"));
            assert!(v("1.0.0-beta") < v("1.0.0-beta.1"));
        }

        #[test]
        fn labels_compare_case_insensitively() {
            assert_eq!(v("1.0.0-BETA"), v("1.0.0-beta"));
        }
    }

    mod range_parsing {
        use super::*;
        use test_case::test_case;

        #[test]
        fn minimum_inclusive() {
            let range = r("1.0");
            assert!(range.satisfies(&v("1.0.0")));
            assert!(range.satisfies(&v("9.0.0")));
            assert!(!range.satisfies(&v("0.9.0")));
        }

        #[test]
        fn exact() {
            let range = r("[1.2.0]");
            assert!(range.satisfies(&v("1.2.0")));
            assert!(!range.satisfies(&v("1.2.1")));
        }

        #[test]
        fn half_open() {
            let range = r("[1.0,2.0)");
            assert!(range.satisfies(&v("1.0.0")));
            assert!(range.satisfies(&v("1.9.9")));
            assert!(!range.satisfies(&v("2.0.0")));
        }

        #[test]
        fn open_bounds() {
            let range = r("(,2.0]");
            assert!(range.satisfies(&v("0.1.0")));
            assert!(range.satisfies(&v("2.0.0")));
            assert!(!range.satisfies(&v("2.0.1")));

            let range = r("(1.0,)");
            assert!(!range.satisfies(&v("1.0.0")));
            assert!(range.satisfies(&v("1.0.1")));
        }

        #[test]
        fn floating() {
            let range = r("1.*");
            assert!(range.satisfies(&v("1.9.0")));
            assert!(!range.satisfies(&v("2.0.0")));

            let range = r("1.2.*");
            assert!(range.satisfies(&v("1.2.7")));
            assert!(!range.satisfies(&v("1.3.0")));
        }

        #[test]
        fn star_excludes_prereleases() {
            let range = r("*");
            assert!(range.satisfies(&v("5.0.0")));
            assert!(!range.satisfies(&v("5.0.0-beta")));
            assert_eq!(range, VersionRange::all_stable());
        }

        #[test]
        fn intervals_admit_prereleases() {
            assert!(r("[1.0,3.0)").satisfies(&v("2.0.0-beta")));
        }

        #[test_case("[]" ; "empty brackets")]
        #[test_case("(1.0)" ; "exclusive single")]
        #[test_case("[2.0,1.0]" ; "inverted")]
        #[test_case("[1.0,1.0)" ; "empty interval")]
        #[test_case("[1.0,2.0,3.0]" ; "three bounds")]
        #[test_case("[1.0,2.0" ; "unterminated")]
        fn invalid(input: &str) {
            assert!(VersionRange::parse(input).is_none());
        }
    }

    mod range_operations {
        use super::*;

        #[test]
        fn intersection_of_overlapping_ranges() {
            let merged = r("[1.0,2.0)").intersection(&r("[1.5,3.0)"));
            assert_eq!(merged, r("[1.5,2.0)"));
            assert_eq!(merged.min_version(), Some(&v("1.5")));
        }

        #[test]
        fn intersection_of_disjoint_ranges_is_empty() {
            let merged = r("[1.0,2.0)").intersection(&r("[3.0,4.0)"));
            assert!(merged.is_empty());
            assert!(!merged.satisfies(&v("1.5.0")));
            assert!(!merged.satisfies(&v("3.5.0")));
        }

        #[test]
        fn intersection_with_all_stable_drops_prereleases() {
            let merged = r("[1.0,3.0)").intersection(&VersionRange::all_stable());
            assert!(!merged.satisfies(&v("2.0.0-beta")));
            assert!(merged.satisfies(&v("2.0.0")));
        }

        #[test]
        fn min_version() {
            assert_eq!(r("(1.0,2.0)").min_version(), Some(&v("1.0")));
            assert_eq!(r("(,2.0)").min_version(), None);
            assert_eq!(VersionRange::all_stable().min_version(), None);
        }
    }

    mod serde_support {
        use super::*;

        #[test]
        fn range_serializes_as_string() {
            let json = sonic_rs::to_string(&r("[1.0,2.0)")).unwrap();
            assert_eq!(json, "\"[1.0,2.0)\"");
            let back: VersionRange = sonic_rs::from_str(&json).unwrap();
            assert_eq!(back, r("[1.0,2.0)"));
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn disjoint_ranges_intersect_to_nothing(
                a in 0u64..50, len_a in 1u64..10, gap in 0u64..10, len_b in 1u64..10, probe in 0u64..200,
            ) {
                let b = a + len_a + gap;
                let first = r(&format!("[{a}.0,{}.0)", a + len_a));
                let second = r(&format!("[{b}.0,{}.0)", b + len_b));
                let merged = first.intersection(&second);
                prop_assert!(merged.is_empty());
                prop_assert!(!merged.satisfies(&Version::new(probe / 2, probe % 2, 0)));
            }

            #[test]
            fn ordering_is_total(a in 0u64..5, b in 0u64..5, c in 0u64..5, d in 0u64..5) {
                let x = Version::new(a, b, 0);
                let y = Version::new(c, d, 0);
                prop_assert_eq!(x.cmp(&y), (a, b).cmp(&(c, d)));
            }
        }
    }
}
