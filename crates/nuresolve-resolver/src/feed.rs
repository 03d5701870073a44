//! Local JSON feeds.
//!
//! A feed file lists packages, their versions and per-platform dependency
//! groups:
//!
//! ```json
//! {
//!   "packages": [
//!     {
//!       "id": "A",
//!       "versions": [
//!         {
//!           "version": "1.0.0",
//!           "dependencyGroups": [
//!             { "targetFramework": "netstandard2.0",
//!               "dependencies": [ { "id": "C", "range": "[1.0,2.0)" } ] }
//!           ]
//!         },
//!         { "version": "2.0.0", "dependencies": [ { "id": "C", "range": "1.0" } ] }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! `dependencies` directly on a version is a group for every platform.

use crate::repository::{
    DependencyGroup, MemoryRepository, Repository, RepositoryError, RepositoryFuture,
};
use crate::types::{AvailablePackageInfo, PackageDependency};
use nuresolve_core::{
    PackageId, PackageIdentity, PlatformCompatibility, PlatformMoniker, Version, VersionRange,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct FeedFile {
    #[serde(default)]
    packages: Vec<FeedPackage>,
}

#[derive(Debug, Deserialize)]
struct FeedPackage {
    id: String,
    #[serde(default)]
    versions: Vec<FeedVersion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedVersion {
    version: String,
    #[serde(default)]
    dependencies: Option<Vec<FeedDependency>>,
    #[serde(default)]
    dependency_groups: Vec<FeedGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedGroup {
    #[serde(default)]
    target_framework: Option<String>,
    #[serde(default)]
    dependencies: Vec<FeedDependency>,
}

#[derive(Debug, Deserialize)]
struct FeedDependency {
    id: String,
    #[serde(default)]
    range: Option<String>,
}

/// A repository backed by a local JSON feed file.
#[derive(Debug)]
pub struct FeedRepository {
    path: PathBuf,
    inner: MemoryRepository,
}

impl FeedRepository {
    /// Load a feed file. The repository is named after the file stem.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a valid feed.
    pub async fn load(path: impl AsRef<Path>, compatibility: PlatformCompatibility) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RepositoryError::Io {
                source_name: name.clone(),
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let inner = parse_feed(&name, &content, compatibility)?;
        info!(feed = %name, packages = inner.len(), "loaded feed");

        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    /// Build a feed from JSON text.
    ///
    /// # Errors
    /// Returns error if the text is not a valid feed.
    pub fn from_json(name: &str, content: &str, compatibility: PlatformCompatibility) -> Result<Self, RepositoryError> {
        Ok(Self {
            path: PathBuf::from(name),
            inner: parse_feed(name, content, compatibility)?,
        })
    }

    /// Path the feed was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of packages in the feed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the feed is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Repository for FeedRepository {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn all_versions<'a>(
        &'a self,
        id: &'a PackageId,
    ) -> RepositoryFuture<'a, Option<Vec<Version>>> {
        self.inner.all_versions(id)
    }

    fn dependency_info<'a>(
        &'a self,
        identity: &'a PackageIdentity,
        platform: &'a PlatformMoniker,
    ) -> RepositoryFuture<'a, Option<AvailablePackageInfo>> {
        self.inner.dependency_info(identity, platform)
    }
}

fn parse_feed(
    name: &str,
    content: &str,
    compatibility: PlatformCompatibility,
) -> Result<MemoryRepository, RepositoryError> {
    let invalid = |message: String| RepositoryError::InvalidFeed {
        source_name: name.to_string(),
        message,
    };

    let feed: FeedFile =
        sonic_rs::from_str(content).map_err(|e| invalid(format!("invalid JSON: {e}")))?;

    let repo = MemoryRepository::with_compatibility(Arc::<str>::from(name), compatibility);
    for package in feed.packages {
        let id = PackageId::parse(&package.id)
            .ok_or_else(|| invalid(format!("invalid package id '{}'", package.id)))?;

        for entry in package.versions {
            let version = Version::parse(&entry.version).ok_or_else(|| {
                invalid(format!("invalid version '{}' of '{id}'", entry.version))
            })?;

            let mut groups = Vec::with_capacity(entry.dependency_groups.len() + 1);
            if let Some(deps) = entry.dependencies {
                groups.push(DependencyGroup::any(convert_dependencies(deps).map_err(&invalid)?));
            }
            for group in entry.dependency_groups {
                let dependencies = convert_dependencies(group.dependencies).map_err(&invalid)?;
                groups.push(DependencyGroup {
                    platform: group.target_framework.as_deref().map(PlatformMoniker::parse),
                    dependencies,
                });
            }

            debug!(feed = name, package = %id, version = %version, groups = groups.len(), "feed entry");
            repo.add_package(PackageIdentity::new(id.clone(), version), groups);
        }
    }

    Ok(repo)
}

fn convert_dependencies(deps: Vec<FeedDependency>) -> Result<Vec<PackageDependency>, String> {
    deps.into_iter()
        .map(|dep| {
            let id = PackageId::parse(&dep.id)
                .ok_or_else(|| format!("invalid dependency id '{}'", dep.id))?;
            let range = match dep.range.as_deref() {
                None => VersionRange::all_stable(),
                Some(text) => VersionRange::parse(text)
                    .ok_or_else(|| format!("invalid range '{text}' for dependency '{id}'"))?,
            };
            Ok(PackageDependency::new(id, range))
        })
        .collect()
}
