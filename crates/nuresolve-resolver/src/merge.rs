//! Merging requirement sets declared in different places.

use crate::selector::best_version;
use nuresolve_core::{PlatformCompatibility, PlatformMoniker, RequirementEntry, RequirementSet, Version};
use tracing::debug;

/// Merges requirement sets left to right.
#[derive(Debug, Clone, Default)]
pub struct RequirementMerger {
    compatibility: PlatformCompatibility,
}

impl RequirementMerger {
    /// Create a merger using `compatibility` to reduce platforms.
    #[must_use]
    pub const fn new(compatibility: PlatformCompatibility) -> Self {
        Self { compatibility }
    }

    /// Merge every set, left to right.
    #[must_use]
    pub fn merge_all(&self, sets: impl IntoIterator<Item = RequirementSet>) -> RequirementSet {
        sets.into_iter()
            .fold(RequirementSet::new(), |acc, set| self.merge_sets(acc, &set))
    }

    /// Merge `other` into `base`.
    ///
    /// Ids new to `base` are appended in `other`'s order. Global ignores are
    /// concatenated.
    #[must_use]
    pub fn merge_sets(&self, mut base: RequirementSet, other: &RequirementSet) -> RequirementSet {
        for entry in &other.packages {
            match base.packages.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => {
                    *existing = self.merge_entries(existing, entry);
                    debug!(package = %existing.id, range = %existing.allowed_versions, "merged requirement");
                }
                None => base.packages.push(entry.clone()),
            }
        }
        base.ignores.extend(other.ignores.iter().cloned());
        base
    }

    /// Merge two requirements for the same id.
    ///
    /// Disjoint ranges merge into an empty range; that is reported when the
    /// package is resolved, not here.
    #[must_use]
    pub fn merge_entries(&self, a: &RequirementEntry, b: &RequirementEntry) -> RequirementEntry {
        let allowed_versions = a.allowed_versions.intersection(&b.allowed_versions);

        let pins: Vec<&Version> = a.version.iter().chain(b.version.iter()).collect();
        let version = best_version(pins.iter().copied(), &allowed_versions)
            .or_else(|| pins.iter().copied().min())
            .cloned();

        let platform = match (&a.platform, &b.platform) {
            (Some(first), Some(second)) => Some(self.reduce_platform(first, second)),
            (first, second) => first.clone().or_else(|| second.clone()),
        };

        let mut ignores = a.ignores.clone();
        ignores.extend(b.ignores.iter().cloned());

        RequirementEntry {
            id: a.id.clone(),
            version,
            platform,
            development: a.development && b.development,
            allowed_versions,
            ignores,
        }
    }

    /// The second platform if it can stand in for the first, else the first.
    fn reduce_platform(&self, first: &PlatformMoniker, second: &PlatformMoniker) -> PlatformMoniker {
        self.compatibility
            .reduce(first, std::iter::once(second))
            .unwrap_or(first)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nuresolve_core::{IgnoreMatcher, PackageId, VersionRange};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn entry(id: &str, range: &str) -> RequirementEntry {
        RequirementEntry::new(PackageId::parse(id).unwrap())
            .with_allowed_versions(VersionRange::parse(range).unwrap())
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn merger() -> RequirementMerger {
        RequirementMerger::default()
    }

    mod entries {
        use super::*;

        #[test]
        fn range_intersection_and_dev_and() {
            let a = entry("X", "[1.0,2.0)").with_development(true);
            let b = entry("X", "[1.5,3.0)").with_development(false);
            let merged = merger().merge_entries(&a, &b);
            assert_eq!(merged.allowed_versions, VersionRange::parse("[1.5,2.0)").unwrap());
            assert!(!merged.development);
        }

        #[test]
        fn dev_only_when_both_agree() {
            let a = entry("X", "*").with_development(true);
            let b = entry("X", "*").with_development(true);
            assert!(merger().merge_entries(&a, &b).development);
        }

        #[test]
        fn single_pin_is_kept() {
            let a = entry("X", "*").with_version(v("1.2.0"));
            let b = entry("X", "*");
            assert_eq!(merger().merge_entries(&a, &b).version, Some(v("1.2.0")));
            assert_eq!(merger().merge_entries(&b, &a).version, Some(v("1.2.0")));
        }

        #[test]
        fn pins_prefer_in_range_then_stable_then_highest() {
            let a = entry("X", "[1.0,2.0)").with_version(v("1.5.0"));
            let b = entry("X", "[1.0,3.0)").with_version(v("2.5.0"));
            assert_eq!(merger().merge_entries(&a, &b).version, Some(v("1.5.0")));

            let a = entry("X", "[1.0,2.0)").with_version(v("1.9.0-beta"));
            let b = entry("X", "[1.0,2.0)").with_version(v("1.1.0"));
            assert_eq!(merger().merge_entries(&a, &b).version, Some(v("1.1.0")));

            let a = entry("X", "[1.0,2.0)").with_version(v("1.2.0"));
            let b = entry("X", "[1.0,2.0)").with_version(v("1.4.0"));
            assert_eq!(merger().merge_entries(&a, &b).version, Some(v("1.4.0")));
        }

        #[test]
        fn pins_outside_merged_range_fall_back_to_lowest() {
            let a = entry("X", "[1.0,2.0)").with_version(v("3.0.0"));
            let b = entry("X", "[1.0,2.0)").with_version(v("2.5.0"));
            assert_eq!(merger().merge_entries(&a, &b).version, Some(v("2.5.0")));
        }

        #[test]
        fn platforms_reduce() {
            let a = entry("X", "*").with_platform(PlatformMoniker::parse("net46"));
            let b = entry("X", "*").with_platform(PlatformMoniker::parse("net45"));
            let merged = merger().merge_entries(&a, &b);
            assert_eq!(merged.platform, Some(PlatformMoniker::parse("net45")));

            let only = entry("X", "*");
            let merged = merger().merge_entries(&only, &b);
            assert_eq!(merged.platform, Some(PlatformMoniker::parse("net45")));
        }

        #[test]
        fn incompatible_platform_keeps_first() {
            let a = entry("X", "*").with_platform(PlatformMoniker::parse("net46"));
            let b = entry("X", "*").with_platform(PlatformMoniker::parse("net472"));
            let merged = merger().merge_entries(&a, &b);
            assert_eq!(merged.platform, Some(PlatformMoniker::parse("net46")));
        }

        #[test]
        fn ignores_concatenate() {
            let a = entry("X", "*").with_ignore(IgnoreMatcher::new("X.A"));
            let b = entry("X", "*")
                .with_ignore(IgnoreMatcher::new("X.A"))
                .with_ignore(IgnoreMatcher::new("X.B"));
            let merged = merger().merge_entries(&a, &b);
            assert_eq!(merged.ignores.len(), 3);
        }

        proptest! {
            #[test]
            fn disjoint_ranges_merge_to_empty(lo in 0u64..50, gap in 1u64..10, width in 1u64..10) {
                let first = format!("[{lo}.0,{}.0)", lo + width);
                let start = lo + width + gap;
                let second = format!("[{start}.0,{}.0)", start + width);
                let merged = merger().merge_entries(&entry("X", &first), &entry("X", &second));
                prop_assert!(merged.allowed_versions.is_empty());
                for major in 0..(start + width + 1) {
                    prop_assert!(!merged.allowed_versions.satisfies(&Version::new(major, 0, 0)));
                }
            }
        }
    }

    mod sets {
        use super::*;

        #[test]
        fn new_ids_append_in_order_and_globals_concatenate() {
            let first = RequirementSet::new()
                .with_package(entry("A", "*"))
                .with_package(entry("B", "*"))
                .with_ignore(IgnoreMatcher::new("System.*"));
            let second = RequirementSet::new()
                .with_package(entry("C", "*"))
                .with_package(entry("a", "[1.0,2.0)"))
                .with_ignore(IgnoreMatcher::new("Microsoft.*"));

            let merged = merger().merge_all([first, second]);
            let ids: Vec<_> = merged.packages.iter().map(|e| e.id.to_string()).collect();
            assert_eq!(ids, vec!["A", "B", "C"]);
            assert_eq!(
                merged.packages[0].allowed_versions,
                VersionRange::parse("[1.0,2.0)").unwrap()
            );
            assert_eq!(merged.ignores.len(), 2);
        }

        #[test]
        fn merge_all_of_nothing_is_empty() {
            assert!(merger().merge_all(Vec::new()).is_empty());
        }
    }
}
