//! Declared package requirements.

use crate::ignore::IgnoreMatcher;
use crate::package::PackageId;
use crate::platform::PlatformMoniker;
use crate::version::{Version, VersionRange};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One declared root package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementEntry {
    /// Package id.
    pub id: PackageId,
    /// Pinned version, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    /// Platform override, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformMoniker>,
    /// Only needed for development.
    #[serde(default)]
    pub development: bool,
    /// Allowed versions.
    #[serde(default)]
    pub allowed_versions: VersionRange,
    /// Ignore rules scoped to this requirement's subtree.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignores: Vec<IgnoreMatcher>,
}

impl RequirementEntry {
    /// Create a requirement with defaults: no pin, all stable versions.
    #[must_use]
    pub fn new(id: PackageId) -> Self {
        Self {
            id,
            version: None,
            platform: None,
            development: false,
            allowed_versions: VersionRange::all_stable(),
            ignores: Vec::new(),
        }
    }

    /// Set the pinned version.
    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Set the allowed range.
    #[must_use]
    pub fn with_allowed_versions(mut self, range: VersionRange) -> Self {
        self.allowed_versions = range;
        self
    }

    /// Set the platform override.
    #[must_use]
    pub fn with_platform(mut self, platform: PlatformMoniker) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Set the development-only flag.
    #[must_use]
    pub const fn with_development(mut self, development: bool) -> Self {
        self.development = development;
        self
    }

    /// Add a scoped ignore rule.
    #[must_use]
    pub fn with_ignore(mut self, ignore: IgnoreMatcher) -> Self {
        self.ignores.push(ignore);
        self
    }

    /// Whether the pin, when present, lies outside the allowed range.
    #[must_use]
    pub fn pin_outside_range(&self) -> bool {
        self.version
            .as_ref()
            .is_some_and(|v| !self.allowed_versions.satisfies(v))
    }
}

impl fmt::Display for RequirementEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.allowed_versions)?;
        if let Some(version) = &self.version {
            write!(f, " (pinned {version})")?;
        }
        if self.development {
            write!(f, " [dev]")?;
        }
        Ok(())
    }
}

/// Requirements from one declaration source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementSet {
    /// Root requirements, in declaration order.
    #[serde(default)]
    pub packages: Vec<RequirementEntry>,
    /// Ignore rules applying to every tree.
    #[serde(default)]
    pub ignores: Vec<IgnoreMatcher>,
}

impl RequirementSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a requirement.
    #[must_use]
    pub fn with_package(mut self, entry: RequirementEntry) -> Self {
        self.packages.push(entry);
        self
    }

    /// Add a global ignore rule.
    #[must_use]
    pub fn with_ignore(mut self, ignore: IgnoreMatcher) -> Self {
        self.ignores.push(ignore);
        self
    }

    /// Find the requirement for an id.
    #[must_use]
    pub fn get(&self, id: &PackageId) -> Option<&RequirementEntry> {
        self.packages.iter().find(|p| &p.id == id)
    }

    /// Number of root requirements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Check if there are no root requirements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
