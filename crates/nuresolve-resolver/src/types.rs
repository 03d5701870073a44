//! Core types for dependency resolution.
//!
//! - `ResolvedReference`: a package identity plus the flags it was reached with
//! - `AvailablePackageInfo`: dependency metadata reported by a repository
//! - `AvailablePackages`: the per-pass accumulator of that metadata
//! - `ResolutionResult`: the outcome of a successful pass
//! - `ResolveError`: errors that abort a pass

use crate::repository::RepositoryError;
use crate::solver::SolverError;
use crate::tree::DependencyNode;
use ahash::AHashMap;
use nuresolve_core::{PackageId, PackageIdentity, PlatformMoniker, Version, VersionRange};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A declared dependency of a package version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PackageDependency {
    /// Dependency id.
    pub id: PackageId,
    /// Versions the dependent accepts.
    pub range: VersionRange,
}

impl PackageDependency {
    /// Create a dependency.
    #[must_use]
    pub const fn new(id: PackageId, range: VersionRange) -> Self {
        Self { id, range }
    }
}

impl fmt::Display for PackageDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.range)
    }
}

/// Dependency metadata for one package identity, as a repository reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailablePackageInfo {
    /// Package identity.
    pub identity: PackageIdentity,
    /// Platform the metadata was requested for.
    pub platform: PlatformMoniker,
    /// Dependencies of the nearest dependency group.
    pub dependencies: Vec<PackageDependency>,
    /// Name of the repository that reported it.
    pub source: Arc<str>,
}

/// A package identity reached during graph building, with the flags it
/// inherited on the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedReference {
    /// Package identity.
    pub identity: PackageIdentity,
    /// Effective platform.
    pub platform: PlatformMoniker,
    /// Requested by the user rather than pulled in by the resolver.
    pub user_installed: bool,
    /// Only needed for development.
    pub development: bool,
    /// Must be reinstalled even if present.
    pub requires_reinstall: bool,
    /// Range the version was chosen from.
    pub allowed_versions: VersionRange,
}

impl ResolvedReference {
    /// Reference for a declared root.
    #[must_use]
    pub const fn root(
        identity: PackageIdentity,
        platform: PlatformMoniker,
        development: bool,
        allowed_versions: VersionRange,
    ) -> Self {
        Self {
            identity,
            platform,
            user_installed: true,
            development,
            requires_reinstall: false,
            allowed_versions,
        }
    }

    /// Reference for a dependency of `self`, carrying this reference's
    /// platform and flags.
    #[must_use]
    pub fn child(&self, identity: PackageIdentity, allowed_versions: VersionRange) -> Self {
        Self {
            identity,
            platform: self.platform.clone(),
            user_installed: self.user_installed,
            development: self.development,
            requires_reinstall: self.requires_reinstall,
            allowed_versions,
        }
    }

    /// Package id.
    #[must_use]
    pub const fn id(&self) -> &PackageId {
        &self.identity.id
    }
}

/// Shared accumulator of dependency metadata for one resolution pass.
///
/// Keyed by package identity, insert-if-absent, insertion order preserved.
#[derive(Debug, Default)]
pub struct AvailablePackages {
    inner: Mutex<AvailableInner>,
}

#[derive(Debug, Default)]
struct AvailableInner {
    index: AHashMap<PackageIdentity, usize>,
    entries: Vec<Arc<AvailablePackageInfo>>,
}

impl AvailablePackages {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `info` unless its identity is already present.
    ///
    /// Returns `true` if it was added.
    pub fn insert(&self, info: AvailablePackageInfo) -> bool {
        let mut inner = self.inner.lock();
        if inner.index.contains_key(&info.identity) {
            return false;
        }
        let position = inner.entries.len();
        inner.index.insert(info.identity.clone(), position);
        inner.entries.push(Arc::new(info));
        true
    }

    /// Check whether an identity has been recorded.
    #[must_use]
    pub fn contains(&self, identity: &PackageIdentity) -> bool {
        self.inner.lock().index.contains_key(identity)
    }

    /// Get the recorded metadata for an identity.
    #[must_use]
    pub fn get(&self, identity: &PackageIdentity) -> Option<Arc<AvailablePackageInfo>> {
        let inner = self.inner.lock();
        inner
            .index
            .get(identity)
            .map(|&i| Arc::clone(&inner.entries[i]))
    }

    /// Copy out every record in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<AvailablePackageInfo>> {
        self.inner.lock().entries.clone()
    }

    /// Number of recorded identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Check if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A non-fatal problem found during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    /// No repository knows a declared root.
    RootNotFound {
        /// Root id.
        id: PackageId,
    },
    /// No repository knows a transitive dependency.
    TransitiveNotFound {
        /// Dependency id.
        id: PackageId,
        /// Version the dependency was looked up at, if one could be chosen.
        version: Option<Version>,
        /// Package declaring the dependency.
        parent: PackageIdentity,
    },
    /// The merged allowed range of a root matches no version.
    UnsatisfiableRange {
        /// Root id.
        id: PackageId,
        /// The empty range.
        range: VersionRange,
    },
    /// A pinned version lies outside the declared range; the pin was used.
    PinOutsideRange {
        /// Root id.
        id: PackageId,
        /// Pinned version.
        pin: Version,
        /// Declared range.
        range: VersionRange,
    },
    /// The solver chose a package that is only reachable through ignored
    /// subtrees; it is left out of the plan.
    IgnoredButResolved {
        /// The resolved identity.
        identity: PackageIdentity,
    },
}

impl Diagnostic {
    /// Package id the diagnostic is about.
    #[must_use]
    pub const fn id(&self) -> &PackageId {
        match self {
            Self::RootNotFound { id }
            | Self::TransitiveNotFound { id, .. }
            | Self::UnsatisfiableRange { id, .. }
            | Self::PinOutsideRange { id, .. } => id,
            Self::IgnoredButResolved { identity } => &identity.id,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound { id } => write!(f, "package '{id}' not found in any source"),
            Self::TransitiveNotFound {
                id,
                version: Some(version),
                parent,
            } => write!(f, "dependency '{id}@{version}' of {parent} not found in any source"),
            Self::TransitiveNotFound {
                id,
                version: None,
                parent,
            } => write!(f, "no version of dependency '{id}' of {parent} found in any source"),
            Self::UnsatisfiableRange { id, range } => {
                write!(f, "no version of '{id}' satisfies constraints ({range})")
            }
            Self::PinOutsideRange { id, pin, range } => {
                write!(f, "pinned version {pin} of '{id}' is outside {range}; using the pin")
            }
            Self::IgnoredButResolved { identity } => {
                write!(f, "{identity} was resolved but is ignored")
            }
        }
    }
}

/// A package in the installation plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedPackage {
    /// Package identity.
    pub identity: PackageIdentity,
    /// Install as development-only.
    pub development: bool,
    /// Repository that reported the package.
    pub source: Arc<str>,
    /// Declared dependencies.
    pub dependencies: Vec<PackageDependency>,
}

/// Result of a resolution pass.
#[derive(Debug, Clone)]
pub struct ResolutionResult {
    /// Surviving packages, sorted by id.
    pub packages: Vec<PlannedPackage>,
    /// One dependency tree per found root, in declaration order.
    pub trees: Vec<DependencyNode>,
    /// Every tree node's reference in pre-order.
    pub references: Vec<ResolvedReference>,
    /// Non-fatal problems.
    pub diagnostics: Vec<Diagnostic>,
    /// Dependency metadata the solver reasoned over.
    pub available: Vec<Arc<AvailablePackageInfo>>,
    /// Time taken.
    pub duration: Duration,
}

impl ResolutionResult {
    /// Number of planned packages.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.packages.len()
    }

    /// Check if nothing is planned.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Get a planned package by id (case-insensitive).
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PlannedPackage> {
        self.packages.iter().find(|p| p.identity.id.matches(id))
    }

    /// Planned runtime packages.
    pub fn runtime(&self) -> impl Iterator<Item = &PlannedPackage> {
        self.packages.iter().filter(|p| !p.development)
    }

    /// Planned development-only packages.
    pub fn development(&self) -> impl Iterator<Item = &PlannedPackage> {
        self.packages.iter().filter(|p| p.development)
    }
}

/// Errors that abort a resolution pass.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A root package is unknown to every repository (strict mode).
    #[error("package not found: {id}")]
    PackageNotFound {
        /// Root id.
        id: String,
    },

    /// The solver found no consistent assignment.
    #[error("dependency conflict:\n{explanation}")]
    Unsatisfiable {
        /// The solver's explanation.
        explanation: String,
        /// Root ids handed to the solver.
        roots: Vec<String>,
    },

    /// A package version transitively depends on itself.
    #[error("circular dependency: {cycle}")]
    CircularDependency {
        /// The cycle, first identity repeated at the end.
        cycle: String,
    },

    /// The dependency tree is deeper than allowed.
    #[error("dependency depth limit {max_depth} exceeded: {path}")]
    DepthExceeded {
        /// Path from the root.
        path: String,
        /// Configured limit.
        max_depth: usize,
    },

    /// A repository failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The pass was cancelled.
    #[error("resolution cancelled")]
    Cancelled,

    /// An invariant of the resolver was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SolverError> for ResolveError {
    fn from(err: SolverError) -> Self {
        match err {
            SolverError::Unsatisfiable { explanation, roots } => {
                Self::Unsatisfiable { explanation, roots }
            }
            SolverError::UnknownPackage { id } => Self::PackageNotFound { id },
            SolverError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<ResolveError> for nuresolve_core::Error {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::PackageNotFound { id } => Self::package_not_found(id),
            ResolveError::Unsatisfiable { explanation, roots } => {
                Self::resolution(explanation, roots)
            }
            ResolveError::CircularDependency { cycle } => Self::circular_dependency(cycle),
            ResolveError::DepthExceeded { path, max_depth } => {
                Self::depth_exceeded(path, max_depth)
            }
            ResolveError::Repository(e) => Self::repository(e.source_name(), e.to_string()),
            ResolveError::Cancelled => Self::Cancelled,
            ResolveError::Internal(message) => {
                Self::resolution(format!("internal error: {message}"), Vec::new())
            }
        }
    }
}
