//! Constraint solving over the collected dependency metadata.
//!
//! The resolver hands the solver every reference it found and every package
//! identity a repository reported; the solver picks one version per package.
//! [`PubGrubSolver`] is the default implementation.

use crate::types::{AvailablePackageInfo, PackageDependency, ResolvedReference};
use ahash::{AHashMap, AHashSet};
use nuresolve_core::{PackageId, PackageIdentity, Version, VersionRange};
use pubgrub::{
    DefaultStringReporter, Dependencies, DependencyConstraints, DependencyProvider,
    PackageResolutionStatistics, PubGrubError, Reporter, resolve,
};
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use version_ranges::Ranges;

/// Input to a solver.
#[derive(Debug, Clone, Copy)]
pub struct SolveRequest<'a> {
    /// Root ids that must be part of the solution.
    pub targets: &'a [PackageId],
    /// Every reference found while building the trees.
    pub references: &'a [ResolvedReference],
    /// Versions chosen for the roots.
    pub preferred: &'a [PackageIdentity],
    /// Dependency metadata of every reported identity.
    pub available: &'a [Arc<AvailablePackageInfo>],
    /// Repository names in lookup order.
    pub sources: &'a [Arc<str>],
}

/// Errors raised by a solver.
#[derive(Debug, Error)]
pub enum SolverError {
    /// No assignment satisfies every constraint.
    #[error("no solution:\n{explanation}")]
    Unsatisfiable {
        /// Best-effort explanation of the conflict.
        explanation: String,
        /// Root ids involved.
        roots: Vec<String>,
    },

    /// The solver needed a package it has no metadata for.
    #[error("no metadata for package {id}")]
    UnknownPackage {
        /// Package id.
        id: String,
    },

    /// The solver failed for another reason.
    #[error("{0}")]
    Internal(String),
}

/// Picks one version per package so that every constraint holds.
pub trait ConstraintSolver: Send + Sync {
    /// Solve `request`, returning the chosen identities.
    ///
    /// # Errors
    /// Returns error if no consistent assignment exists.
    fn solve(&self, request: &SolveRequest<'_>) -> Result<Vec<PackageIdentity>, SolverError>;
}

/// Solver backed by `PubGrub`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PubGrubSolver;

impl ConstraintSolver for PubGrubSolver {
    fn solve(&self, request: &SolveRequest<'_>) -> Result<Vec<PackageIdentity>, SolverError> {
        let provider = SolverProvider::new(request);
        debug!(
            targets = request.targets.len(),
            packages = provider.candidates.len(),
            sources = request.sources.len(),
            "running solver"
        );

        let roots = || -> Vec<String> { request.targets.iter().map(ToString::to_string).collect() };

        let solution = match resolve(&provider, SolverPackage::Root, root_version()) {
            Ok(solution) => solution,
            Err(PubGrubError::NoSolution(mut tree)) => {
                tree.collapse_no_versions();
                return Err(SolverError::Unsatisfiable {
                    explanation: DefaultStringReporter::report(&tree),
                    roots: roots(),
                });
            }
            Err(PubGrubError::ErrorChoosingVersion { package, .. }) => {
                return Err(SolverError::UnknownPackage {
                    id: package.to_string(),
                });
            }
            Err(_) => return Err(SolverError::Internal("solver aborted".to_string())),
        };

        let mut chosen: Vec<PackageIdentity> = solution
            .into_iter()
            .filter_map(|(package, version)| match package {
                SolverPackage::Root => None,
                SolverPackage::Package(id) => Some(PackageIdentity::new(id, version)),
            })
            .collect();
        chosen.sort();

        info!(packages = chosen.len(), "solver finished");
        Ok(chosen)
    }
}

fn root_version() -> Version {
    Version::new(1, 0, 0)
}

/// Package as seen by the solver: a synthetic root or a real id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SolverPackage {
    Root,
    Package(PackageId),
}

impl fmt::Display for SolverPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("the declared packages"),
            Self::Package(id) => write!(f, "{id}"),
        }
    }
}

struct Candidate {
    version: Version,
    dependencies: Vec<PackageDependency>,
}

struct SolverProvider {
    candidates: AHashMap<PackageId, Vec<Candidate>>,
    /// Ids with any reported metadata, before range filtering.
    known: AHashSet<PackageId>,
    preferred: AHashMap<PackageId, Version>,
    root_deps: DependencyConstraints<SolverPackage, Ranges<Version>>,
}

impl SolverProvider {
    fn new(request: &SolveRequest<'_>) -> Self {
        // Every reference to an id constrains it
        let mut constraints: AHashMap<PackageId, VersionRange> = AHashMap::new();
        for reference in request.references {
            constraints
                .entry(reference.id().clone())
                .and_modify(|range| *range = range.intersection(&reference.allowed_versions))
                .or_insert_with(|| reference.allowed_versions.clone());
        }

        let mut candidates: AHashMap<PackageId, Vec<Candidate>> = AHashMap::new();
        let mut known = AHashSet::new();
        for info in request.available {
            let id = &info.identity.id;
            known.insert(id.clone());
            let admitted = constraints
                .get(id)
                .is_none_or(|range| range.satisfies(&info.identity.version));
            if admitted {
                candidates.entry(id.clone()).or_default().push(Candidate {
                    version: info.identity.version.clone(),
                    dependencies: info.dependencies.clone(),
                });
            }
        }

        let mut root_deps = DependencyConstraints::default();
        for target in request.targets {
            let range = constraints
                .get(target)
                .map_or_else(Ranges::full, |r| r.ranges().clone());
            root_deps.insert(SolverPackage::Package(target.clone()), range);
        }

        let preferred = request
            .preferred
            .iter()
            .map(|identity| (identity.id.clone(), identity.version.clone()))
            .collect();

        Self {
            candidates,
            known,
            preferred,
            root_deps,
        }
    }

    fn matching<'a>(
        &'a self,
        id: &PackageId,
        range: &'a Ranges<Version>,
    ) -> impl Iterator<Item = &'a Candidate> + 'a {
        self.candidates
            .get(id)
            .into_iter()
            .flatten()
            .filter(move |c| range.contains(&c.version))
    }
}

impl DependencyProvider for SolverProvider {
    type P = SolverPackage;
    type V = Version;
    type VS = Ranges<Version>;
    type M = String;
    type Err = Infallible;
    type Priority = std::cmp::Reverse<usize>;

    fn prioritize(
        &self,
        pkg: &SolverPackage,
        range: &Ranges<Version>,
        _: &PackageResolutionStatistics,
    ) -> Self::Priority {
        let count = match pkg {
            SolverPackage::Root => 1,
            SolverPackage::Package(id) => self.matching(id, range).count(),
        };
        std::cmp::Reverse(count)
    }

    fn choose_version(
        &self,
        pkg: &SolverPackage,
        range: &Ranges<Version>,
    ) -> Result<Option<Version>, Infallible> {
        let id = match pkg {
            SolverPackage::Root => {
                let v = root_version();
                return Ok(if range.contains(&v) { Some(v) } else { None });
            }
            SolverPackage::Package(id) => id,
        };

        if let Some(preferred) = self.preferred.get(id)
            && self.matching(id, range).any(|c| &c.version == preferred)
        {
            return Ok(Some(preferred.clone()));
        }

        let best = self.matching(id, range).max_by(|a, b| {
            (!a.version.is_prerelease())
                .cmp(&!b.version.is_prerelease())
                .then_with(|| a.version.cmp(&b.version))
        });
        Ok(best.map(|c| c.version.clone()))
    }

    fn get_dependencies(
        &self,
        pkg: &SolverPackage,
        ver: &Version,
    ) -> Result<Dependencies<SolverPackage, Ranges<Version>, String>, Infallible> {
        let id = match pkg {
            SolverPackage::Root => return Ok(Dependencies::Available(self.root_deps.clone())),
            SolverPackage::Package(id) => id,
        };

        let Some(candidate) = self
            .candidates
            .get(id)
            .and_then(|all| all.iter().find(|c| &c.version == ver))
        else {
            return Ok(Dependencies::Available(DependencyConstraints::default()));
        };

        let mut deps: DependencyConstraints<SolverPackage, Ranges<Version>> =
            DependencyConstraints::default();
        for dep in &candidate.dependencies {
            // Reported as missing while building the trees
            if !self.known.contains(&dep.id) {
                continue;
            }
            let key = SolverPackage::Package(dep.id.clone());
            let range = match deps.get(&key) {
                Some(existing) => existing.intersection(dep.range.ranges()),
                None => dep.range.ranges().clone(),
            };
            deps.insert(key, range);
        }

        Ok(Dependencies::Available(deps))
    }
}
