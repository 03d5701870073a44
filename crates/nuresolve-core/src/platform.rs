//! Target platform monikers and the compatibility relation between them.
//!
//! Monikers use folder-style short names: `netstandard2.0`, `net45`,
//! `net472`, `netcoreapp3.1`, `net6.0`. The sentinels `any`, `agnostic` and
//! `unsupported` are recognised as such; everything else that cannot be
//! parsed is treated as unsupported.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Four-part platform version.
pub type PlatformVersion = [u32; 4];

/// Platform family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlatformFamily {
    /// .NET Framework (`net45`).
    NetFramework,
    /// .NET Standard (`netstandard2.0`).
    NetStandard,
    /// .NET Core and .NET 5+ (`netcoreapp3.1`, `net6.0`).
    NetCoreApp,
    /// Any other identifier (`uap10.0`), stored lowercase.
    Other(Arc<str>),
}

/// A target platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlatformMoniker {
    /// Matches every platform.
    Any,
    /// Content that does not depend on a platform.
    Agnostic,
    /// A platform that could not be recognised.
    Unsupported,
    /// A concrete platform.
    Specific {
        /// Family.
        family: PlatformFamily,
        /// Version within the family.
        version: PlatformVersion,
    },
}

impl PlatformMoniker {
    /// Create a concrete moniker.
    #[must_use]
    pub const fn specific(family: PlatformFamily, version: PlatformVersion) -> Self {
        Self::Specific { family, version }
    }

    /// Parse a short folder name. Never fails.
    ///
    /// ```
    /// use nuresolve_core::{PlatformFamily, PlatformMoniker};
    ///
    /// assert_eq!(
    ///     PlatformMoniker::parse("net452"),
    ///     PlatformMoniker::specific(PlatformFamily::NetFramework, [4, 5, 2, 0]),
    /// );
    /// assert_eq!(PlatformMoniker::parse("???"), PlatformMoniker::Unsupported);
    /// ```
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let name = input.trim().to_ascii_lowercase();
        match name.as_str() {
            "any" => return Self::Any,
            "agnostic" => return Self::Agnostic,
            "" | "unsupported" => return Self::Unsupported,
            _ => {}
        }

        let split = name
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(name.len());
        let (identifier, version) = name.split_at(split);
        let Some(parsed) = parse_platform_version(version) else {
            return Self::Unsupported;
        };

        let family = match identifier {
            "netstandard" if version.contains('.') => PlatformFamily::NetStandard,
            "netcoreapp" if version.contains('.') => PlatformFamily::NetCoreApp,
            "net" if version.contains('.') && parsed[0] >= 5 => PlatformFamily::NetCoreApp,
            "net" if !version.contains('.') => {
                return digits_version(version).map_or(Self::Unsupported, |v| {
                    Self::specific(PlatformFamily::NetFramework, v)
                });
            }
            "" | "net" | "netstandard" | "netcoreapp" => return Self::Unsupported,
            other => PlatformFamily::Other(Arc::from(other)),
        };

        Self::specific(family, parsed)
    }

    /// Check if this is a concrete platform.
    #[must_use]
    pub const fn is_specific(&self) -> bool {
        matches!(self, Self::Specific { .. })
    }

    fn family(&self) -> Option<&PlatformFamily> {
        match self {
            Self::Specific { family, .. } => Some(family),
            _ => None,
        }
    }

    fn version(&self) -> PlatformVersion {
        match self {
            Self::Specific { version, .. } => *version,
            _ => [0; 4],
        }
    }
}

/// `2.0` / `3.1.2` style version.
fn parse_platform_version(text: &str) -> Option<PlatformVersion> {
    if text.is_empty() {
        return None;
    }
    let mut version = [0u32; 4];
    let parts: Vec<&str> = text.split('.').collect();
    if parts.len() > 4 {
        return None;
    }
    for (slot, part) in version.iter_mut().zip(&parts) {
        *slot = part.parse().ok()?;
    }
    Some(version)
}

/// `452` style version, one digit per component.
fn digits_version(text: &str) -> Option<PlatformVersion> {
    if text.is_empty() || text.len() > 4 {
        return None;
    }
    let mut version = [0u32; 4];
    for (slot, c) in version.iter_mut().zip(text.chars()) {
        *slot = c.to_digit(10)?;
    }
    Some(version)
}

impl fmt::Display for PlatformMoniker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Agnostic => write!(f, "agnostic"),
            Self::Unsupported => write!(f, "unsupported"),
            Self::Specific { family, version } => match family {
                PlatformFamily::NetFramework => {
                    write!(f, "net{}{}", version[0], version[1])?;
                    if version[2] != 0 || version[3] != 0 {
                        write!(f, "{}", version[2])?;
                    }
                    if version[3] != 0 {
                        write!(f, "{}", version[3])?;
                    }
                    Ok(())
                }
                PlatformFamily::NetStandard => {
                    write!(f, "netstandard{}.{}", version[0], version[1])
                }
                PlatformFamily::NetCoreApp if version[0] >= 5 => {
                    write!(f, "net{}.{}", version[0], version[1])
                }
                PlatformFamily::NetCoreApp => {
                    write!(f, "netcoreapp{}.{}", version[0], version[1])
                }
                PlatformFamily::Other(name) => {
                    write!(f, "{name}{}.{}", version[0], version[1])
                }
            },
        }
    }
}

impl FromStr for PlatformMoniker {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for PlatformMoniker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PlatformMoniker {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// Default set of platforms packages may be installed for.
pub const DEFAULT_SUPPORTED_PLATFORMS: &[&str] =
    &["netstandard2.1", "netstandard2.0", "net45", "net452", "net46"];

/// Directional compatibility between a requested platform and a candidate.
#[derive(Debug, Clone)]
pub struct PlatformCompatibility {
    supported: SmallVec<[PlatformMoniker; 8]>,
}

impl Default for PlatformCompatibility {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPORTED_PLATFORMS.iter().map(|s| PlatformMoniker::parse(s)))
    }
}

impl PlatformCompatibility {
    /// Create with an explicit allow-list.
    #[must_use]
    pub fn new(supported: impl IntoIterator<Item = PlatformMoniker>) -> Self {
        Self {
            supported: supported.into_iter().collect(),
        }
    }

    /// The allow-list.
    #[must_use]
    pub fn supported(&self) -> &[PlatformMoniker] {
        &self.supported
    }

    /// Check whether `candidate` can satisfy a request for `requested`.
    ///
    /// The relation is not symmetric.
    #[must_use]
    pub fn is_compatible(&self, requested: &PlatformMoniker, candidate: &PlatformMoniker) -> bool {
        if requested == candidate {
            return true;
        }

        if matches!(requested, PlatformMoniker::Any) || matches!(candidate, PlatformMoniker::Any) {
            return true;
        }

        if !self.supported.contains(candidate) {
            return false;
        }

        if matches!(requested, PlatformMoniker::Unsupported) {
            return true;
        }

        if matches!(candidate, PlatformMoniker::Agnostic) {
            return true;
        }

        !matches!(candidate, PlatformMoniker::Unsupported)
    }

    /// Pick the compatible candidate nearest to `target`.
    ///
    /// Ties go to the earliest candidate. Returns `None` when no candidate is
    /// compatible.
    pub fn reduce<'a, I>(&self, target: &PlatformMoniker, candidates: I) -> Option<&'a PlatformMoniker>
    where
        I: IntoIterator<Item = &'a PlatformMoniker>,
    {
        candidates
            .into_iter()
            .filter(|candidate| self.is_compatible(target, candidate))
            .min_by(|a, b| compare_distance(target, a, b))
    }
}

/// Ranks how far a candidate is from the target; lower is nearer.
fn rank(target: &PlatformMoniker, candidate: &PlatformMoniker) -> u8 {
    if target == candidate {
        return 0;
    }
    match (target.family(), candidate.family()) {
        (Some(tf), Some(cf)) if tf == cf => {
            if candidate.version() <= target.version() {
                1
            } else {
                4
            }
        }
        (tf, Some(PlatformFamily::NetStandard)) if tf != Some(&PlatformFamily::NetStandard) => 2,
        (_, Some(_)) => 3,
        (_, None) => match candidate {
            PlatformMoniker::Agnostic => 5,
            PlatformMoniker::Any => 6,
            _ => 7,
        },
    }
}

fn compare_distance(target: &PlatformMoniker, a: &PlatformMoniker, b: &PlatformMoniker) -> Ordering {
    let (rank_a, rank_b) = (rank(target, a), rank(target, b));
    rank_a.cmp(&rank_b).then_with(|| {
        if rank_a == 4 {
            // Newer than the target: the smallest step up is nearest
            a.version().cmp(&b.version())
        } else {
            b.version().cmp(&a.version())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn p(s: &str) -> PlatformMoniker {
        PlatformMoniker::parse(s)
    }

    mod parsing {
        use super::*;

        #[rstest]
        #[case("net45", PlatformFamily::NetFramework, [4, 5, 0, 0])]
        #[case("net452", PlatformFamily::NetFramework, [4, 5, 2, 0])]
        #[case("netstandard2.0", PlatformFamily::NetStandard, [2, 0, 0, 0])]
        #[case("NetStandard2.1", PlatformFamily::NetStandard, [2, 1, 0, 0])]
        #[case("netcoreapp3.1", PlatformFamily::NetCoreApp, [3, 1, 0, 0])]
        #[case("net6.0", PlatformFamily::NetCoreApp, [6, 0, 0, 0])]
        fn short_names(
            #[case] input: &str,
            #[case] family: PlatformFamily,
            #[case] version: PlatformVersion,
        ) {
            assert_eq!(p(input), PlatformMoniker::specific(family, version));
        }

        #[rstest]
        #[case("net45")]
        #[case("net452")]
        #[case("netstandard2.0")]
        #[case("netcoreapp3.1")]
        #[case("net6.0")]
        #[case("any")]
        fn display_round_trips(#[case] input: &str) {
            assert_eq!(p(input).to_string(), input);
        }

        #[rstest]
        #[case("")]
        #[case("netstandard")]
        #[case("net")]
        #[case("12345")]
        #[case("net4.x")]
        fn unrecognised_is_unsupported(#[case] input: &str) {
            assert_eq!(p(input), PlatformMoniker::Unsupported);
        }

        #[test]
        fn sentinels() {
            assert_eq!(p("ANY"), PlatformMoniker::Any);
            assert_eq!(p("agnostic"), PlatformMoniker::Agnostic);
        }
    }

    mod compatibility {
        use super::*;

        #[test]
        fn identical_is_compatible() {
            let compat = PlatformCompatibility::new([]);
            assert!(compat.is_compatible(&p("net6.0"), &p("net6.0")));
        }

        #[test]
        fn any_on_either_side_is_compatible() {
            let compat = PlatformCompatibility::default();
            assert!(compat.is_compatible(&PlatformMoniker::Any, &p("net6.0")));
            assert!(compat.is_compatible(&p("net6.0"), &PlatformMoniker::Any));
        }

        #[test]
        fn candidate_outside_allow_list_is_incompatible() {
            let compat = PlatformCompatibility::default();
            assert!(!compat.is_compatible(&p("netstandard2.0"), &p("net6.0")));
        }

        #[test]
        fn unsupported_request_degrades_gracefully() {
            let compat = PlatformCompatibility::default();
            assert!(compat.is_compatible(&PlatformMoniker::Unsupported, &p("net45")));
        }

        #[test]
        fn relation_is_directional() {
            let compat = PlatformCompatibility::default();
            assert!(compat.is_compatible(&p("net6.0"), &p("netstandard2.0")));
            assert!(!compat.is_compatible(&p("netstandard2.0"), &p("net6.0")));
        }

        #[test]
        fn unsupported_candidate_in_allow_list_is_still_incompatible() {
            let compat = PlatformCompatibility::new([PlatformMoniker::Unsupported]);
            assert!(!compat.is_compatible(&p("net45"), &PlatformMoniker::Unsupported));
        }
    }

    mod reduce {
        use super::*;

        #[test]
        fn prefers_same_family_not_newer() {
            let compat = PlatformCompatibility::default();
            let candidates = [p("netstandard2.0"), p("net45"), p("net46"), p("net452")];
            let nearest = compat.reduce(&p("net452"), &candidates);
            assert_eq!(nearest, Some(&p("net452")));

            let nearest = compat.reduce(&p("net472"), &candidates);
            assert_eq!(nearest, Some(&p("net46")));
        }

        #[test]
        fn netstandard_for_other_families() {
            let compat = PlatformCompatibility::default();
            let candidates = [p("net46"), p("netstandard2.0"), p("netstandard2.1")];
            assert_eq!(
                compat.reduce(&p("net6.0"), &candidates),
                Some(&p("netstandard2.1"))
            );
        }

        #[test]
        fn nothing_compatible() {
            let compat = PlatformCompatibility::default();
            let candidates = [p("net6.0")];
            assert_eq!(compat.reduce(&p("netstandard2.0"), &candidates), None);
        }

        #[test]
        fn ties_go_to_first_declared() {
            let compat = PlatformCompatibility::new([]);
            let candidates = [PlatformMoniker::Any, PlatformMoniker::Any];
            let nearest = compat.reduce(&p("net45"), &candidates);
            assert!(std::ptr::eq(nearest.unwrap(), &candidates[0]));
        }
    }
}
