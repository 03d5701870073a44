//! Package repositories.
//!
//! A repository answers two questions: which versions of a package exist,
//! and what a given version depends on for a given platform. "Unknown" is
//! `Ok(None)`; only transport or data failures are errors.

use crate::types::{AvailablePackageInfo, PackageDependency};
use ahash::AHashMap;
use nuresolve_core::{
    PackageId, PackageIdentity, PlatformCompatibility, PlatformMoniker, Version, VersionRange,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Boxed future returned by repository queries.
pub type RepositoryFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, RepositoryError>> + Send + 'a>>;

/// Errors raised by a repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backing data could not be read.
    #[error("failed to read {path}: {message}")]
    Io {
        /// Repository name.
        source_name: String,
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// The backing data is not a valid feed.
    #[error("invalid feed {source_name}: {message}")]
    InvalidFeed {
        /// Repository name.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// The repository cannot answer queries.
    #[error("repository {source_name} unavailable: {message}")]
    Unavailable {
        /// Repository name.
        source_name: String,
        /// Error message.
        message: String,
    },
}

impl RepositoryError {
    /// Name of the failing repository.
    #[must_use]
    pub fn source_name(&self) -> &str {
        match self {
            Self::Io { source_name, .. }
            | Self::InvalidFeed { source_name, .. }
            | Self::Unavailable { source_name, .. } => source_name,
        }
    }
}

/// An ordered source of package metadata.
pub trait Repository: Send + Sync {
    /// Repository name, used in diagnostics and the plan.
    fn name(&self) -> &str;

    /// Every known version of `id`, ascending, or `None` if the id is unknown.
    fn all_versions<'a>(&'a self, id: &'a PackageId)
    -> RepositoryFuture<'a, Option<Vec<Version>>>;

    /// Dependencies of `identity` for `platform`, or `None` if unknown.
    fn dependency_info<'a>(
        &'a self,
        identity: &'a PackageIdentity,
        platform: &'a PlatformMoniker,
    ) -> RepositoryFuture<'a, Option<AvailablePackageInfo>>;
}

impl std::fmt::Debug for dyn Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Repository").field(&self.name()).finish()
    }
}

/// Dependencies declared for one platform. A group without a platform
/// applies to any platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGroup {
    /// Platform the group targets.
    pub platform: Option<PlatformMoniker>,
    /// Declared dependencies.
    pub dependencies: Vec<PackageDependency>,
}

impl DependencyGroup {
    /// A group that applies to every platform.
    #[must_use]
    pub const fn any(dependencies: Vec<PackageDependency>) -> Self {
        Self {
            platform: None,
            dependencies,
        }
    }

    /// A group for one platform.
    #[must_use]
    pub const fn for_platform(platform: PlatformMoniker, dependencies: Vec<PackageDependency>) -> Self {
        Self {
            platform: Some(platform),
            dependencies,
        }
    }
}

type VersionMap = BTreeMap<Version, Vec<DependencyGroup>>;

/// Thread-safe in-memory repository.
#[derive(Debug)]
pub struct MemoryRepository {
    name: Arc<str>,
    compatibility: PlatformCompatibility,
    packages: RwLock<AHashMap<PackageId, VersionMap>>,
}

impl MemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::with_compatibility(name, PlatformCompatibility::default())
    }

    /// Create an empty repository with an explicit platform allow-list.
    #[must_use]
    pub fn with_compatibility(name: impl Into<Arc<str>>, compatibility: PlatformCompatibility) -> Self {
        Self {
            name: name.into(),
            compatibility,
            packages: RwLock::new(AHashMap::new()),
        }
    }

    /// Add a package version with its dependency groups, replacing any
    /// existing entry for the same identity.
    pub fn add_package(&self, identity: PackageIdentity, groups: Vec<DependencyGroup>) {
        trace!(repository = %self.name, package = %identity, "adding package");
        self.packages
            .write()
            .entry(identity.id)
            .or_default()
            .insert(identity.version, groups);
    }

    /// Add a version whose dependencies apply to every platform.
    ///
    /// # Panics
    ///
    /// Panics if an id, version or range string does not parse.
    pub fn add_version(&self, id: &str, version: &str, deps: Vec<(&str, &str)>) {
        let identity = PackageIdentity::new(
            PackageId::parse(id).expect("valid package id"),
            Version::parse(version).expect("valid version"),
        );
        let dependencies = deps
            .into_iter()
            .map(|(dep, range)| {
                PackageDependency::new(
                    PackageId::parse(dep).expect("valid package id"),
                    VersionRange::parse(range).expect("valid range"),
                )
            })
            .collect();
        self.add_package(identity, vec![DependencyGroup::any(dependencies)]);
    }

    /// Number of known package ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.read().len()
    }

    /// Check if the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.read().is_empty()
    }

    /// Check if a package id is known.
    #[must_use]
    pub fn contains(&self, id: &PackageId) -> bool {
        self.packages.read().contains_key(id)
    }

    /// Known versions of `id`, ascending.
    #[must_use]
    pub fn versions(&self, id: &PackageId) -> Option<Vec<Version>> {
        self.packages
            .read()
            .get(id)
            .map(|versions| versions.keys().cloned().collect())
    }

    /// Dependencies of `identity` for the group nearest to `platform`.
    ///
    /// A version with no groups has no dependencies; a version whose groups
    /// are all incompatible reports none either.
    #[must_use]
    pub fn lookup(
        &self,
        identity: &PackageIdentity,
        platform: &PlatformMoniker,
    ) -> Option<AvailablePackageInfo> {
        let packages = self.packages.read();
        let groups = packages.get(&identity.id)?.get(&identity.version)?;

        let dependencies = self
            .nearest_group(groups, platform)
            .map(|group| group.dependencies.clone())
            .unwrap_or_default();

        Some(AvailablePackageInfo {
            identity: identity.clone(),
            platform: platform.clone(),
            dependencies,
            source: Arc::clone(&self.name),
        })
    }

    fn nearest_group<'g>(
        &self,
        groups: &'g [DependencyGroup],
        platform: &PlatformMoniker,
    ) -> Option<&'g DependencyGroup> {
        let monikers: Vec<PlatformMoniker> = groups
            .iter()
            .map(|g| g.platform.clone().unwrap_or(PlatformMoniker::Any))
            .collect();
        let nearest = self.compatibility.reduce(platform, &monikers)?;
        let position = monikers.iter().position(|m| std::ptr::eq(m, nearest))?;
        groups.get(position)
    }
}

impl Repository for MemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn all_versions<'a>(
        &'a self,
        id: &'a PackageId,
    ) -> RepositoryFuture<'a, Option<Vec<Version>>> {
        Box::pin(async move { Ok(self.versions(id)) })
    }

    fn dependency_info<'a>(
        &'a self,
        identity: &'a PackageIdentity,
        platform: &'a PlatformMoniker,
    ) -> RepositoryFuture<'a, Option<AvailablePackageInfo>> {
        Box::pin(async move { Ok(self.lookup(identity, platform)) })
    }
}
