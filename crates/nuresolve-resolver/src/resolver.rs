//! Resolution orchestration.
//!
//! A pass runs in three phases:
//!
//! 1. Choose a version for every root and build its dependency tree.
//! 2. Hand every reference and the collected metadata to the solver.
//! 3. Keep the solver's choices that are reachable through a non-ignored
//!    path, and classify each as runtime or development-only.
//!
//! # Example
//!
//! ```rust,ignore
//! use nuresolve_resolver::{MemoryRepository, Resolver, ResolverConfig};
//!
//! let resolver = Resolver::new(vec![Arc::new(repo)], ResolverConfig::default());
//! let result = resolver.resolve(&requirements, &CancellationToken::new()).await?;
//! ```

use crate::graph::{DEFAULT_MAX_DEPTH, GraphBuilder};
use crate::progress::{ProgressCallback, ProgressSegment, ProgressSink};
use crate::repository::Repository;
use crate::selector::select_preferred_version;
use crate::solver::{ConstraintSolver, PubGrubSolver, SolveRequest};
use crate::tree::{DependencyNode, flatten};
use crate::types::{
    AvailablePackages, Diagnostic, PlannedPackage, ResolutionResult, ResolveError,
    ResolvedReference,
};
use ahash::{AHashMap, AHashSet};
use nuresolve_core::{
    PackageId, PackageIdentity, PlatformMoniker, RequirementEntry,
    RequirementSet, VersionRange,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Resolver statistics for monitoring and debugging.
#[derive(Debug, Default)]
pub struct ResolverStats {
    /// Repository queries issued.
    pub repository_queries: AtomicU64,
    /// Distinct package identities recorded.
    pub packages_recorded: AtomicU64,
    /// Tree nodes built from repository metadata.
    pub nodes_built: AtomicU64,
    /// Time spent building trees (ms).
    pub graph_time_ms: AtomicU64,
    /// Time spent in the solver (ms).
    pub solver_time_ms: AtomicU64,
}

/// Resolver configuration.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Fail when a root is unknown to every repository.
    pub strict: bool,
    /// Limit on tree depth.
    pub max_depth: usize,
    /// Platform roots are resolved for unless they override it.
    pub target_platform: PlatformMoniker,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strict: false,
            max_depth: DEFAULT_MAX_DEPTH,
            target_platform: PlatformMoniker::parse("netstandard2.0"),
        }
    }
}

/// The resolution orchestrator.
pub struct Resolver<S: ConstraintSolver = PubGrubSolver> {
    repositories: Vec<Arc<dyn Repository>>,
    solver: S,
    config: ResolverConfig,
    progress: ProgressSink,
    stats: Arc<ResolverStats>,
}

impl<S: ConstraintSolver> std::fmt::Debug for Resolver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("repositories", &self.repositories)
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Create a resolver over ordered repositories with the default solver.
    #[must_use]
    pub fn new(repositories: Vec<Arc<dyn Repository>>, config: ResolverConfig) -> Self {
        Self::with_solver(repositories, PubGrubSolver, config)
    }
}

impl<S: ConstraintSolver> Resolver<S> {
    /// Create a resolver with a custom solver.
    #[must_use]
    pub fn with_solver(repositories: Vec<Arc<dyn Repository>>, solver: S, config: ResolverConfig) -> Self {
        Self {
            repositories,
            solver,
            config,
            progress: ProgressSink::default(),
            stats: Arc::new(ResolverStats::default()),
        }
    }

    /// Report progress to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = ProgressSink::new(Some(callback));
        self
    }

    /// Get resolver statistics.
    #[must_use]
    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a merged requirement set.
    ///
    /// # Errors
    /// Returns error if a root is unknown in strict mode, on a dependency
    /// cycle, if the depth limit is exceeded, if a repository fails, if the
    /// solver finds no solution, or on cancellation.
    pub async fn resolve(
        &self,
        requirements: &RequirementSet,
        cancel: &CancellationToken,
    ) -> Result<ResolutionResult, ResolveError> {
        let start = Instant::now();
        let available = Arc::new(AvailablePackages::new());
        let builder = GraphBuilder::new(self.repositories.clone(), Arc::clone(&available))
            .with_ignores(requirements.ignores.clone())
            .with_max_depth(self.config.max_depth)
            .with_cancellation(cancel.clone())
            .with_stats(Arc::clone(&self.stats));

        // Phase 1: trees
        let graph_start = Instant::now();
        let mut diagnostics = Vec::new();
        let mut trees = Vec::new();
        let total = requirements.packages.len();
        self.progress
            .report(ProgressSegment::DEPENDENCIES, 0.0, "Read dependencies...");

        for (index, entry) in requirements.packages.iter().enumerate() {
            self.progress.report(
                ProgressSegment::DEPENDENCIES,
                index as f32 / total as f32,
                format!("Read dependencies ({}/{total}): {}", index + 1, entry.id),
            );
            if cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }

            let Some(reference) = self.root_reference(entry, cancel, &mut diagnostics).await? else {
                continue;
            };

            let range = reference.allowed_versions.clone();
            match builder.build_tree(reference, &entry.ignores).await? {
                Some(tree) => trees.push(tree),
                None => {
                    self.unresolved_root(&entry.id, range, cancel, &mut diagnostics)
                        .await?;
                }
            }
        }
        diagnostics.extend(builder.take_diagnostics());
        self.stats
            .graph_time_ms
            .store(graph_start.elapsed().as_millis() as u64, Ordering::Relaxed);

        info!(
            roots = trees.len(),
            packages = available.len(),
            queries = self.stats.repository_queries.load(Ordering::Relaxed),
            graph_ms = graph_start.elapsed().as_millis(),
            "dependency trees built"
        );

        // Phase 2: solve
        let references: Vec<ResolvedReference> =
            flatten(&trees).map(|node| node.reference.clone()).collect();
        if references.is_empty() && !trees.is_empty() {
            return Err(ResolveError::Internal(
                "dependency trees produced no references".to_string(),
            ));
        }

        let snapshot = available.snapshot();
        let packages = if trees.is_empty() {
            Vec::new()
        } else {
            self.progress
                .report(ProgressSegment::SOLVE, 0.0, "Resolve packages...");
            if cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }

            let mut targets: Vec<PackageId> = Vec::with_capacity(trees.len());
            for tree in &trees {
                if !targets.contains(&tree.identity().id) {
                    targets.push(tree.identity().id.clone());
                }
            }
            let preferred: Vec<PackageIdentity> =
                trees.iter().map(|tree| tree.identity().clone()).collect();
            let sources: Vec<Arc<str>> = self
                .repositories
                .iter()
                .map(|r| Arc::from(r.name()))
                .collect();

            let solver_start = Instant::now();
            let chosen = self.solver.solve(&SolveRequest {
                targets: &targets,
                references: &references,
                preferred: &preferred,
                available: &snapshot,
                sources: &sources,
            })?;
            self.stats
                .solver_time_ms
                .store(solver_start.elapsed().as_millis() as u64, Ordering::Relaxed);

            // Phase 3: filter and classify
            plan(chosen, &trees, &references, &available, &mut diagnostics)
        };

        self.progress.report(ProgressSegment::SOLVE, 1.0, "Resolved");
        info!(
            packages = packages.len(),
            diagnostics = diagnostics.len(),
            total_ms = start.elapsed().as_millis(),
            "resolution complete"
        );

        Ok(ResolutionResult {
            packages,
            trees,
            references,
            diagnostics,
            available: snapshot,
            duration: start.elapsed(),
        })
    }

    /// Choose the version of a root and build its reference.
    ///
    /// A pin wins even outside the declared range; the range then narrows to
    /// the pin. Without a pin the best version from the first repository that
    /// knows the package is used, then the range minimum. A root that gets no
    /// reference has already been reported.
    async fn root_reference(
        &self,
        entry: &RequirementEntry,
        cancel: &CancellationToken,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Option<ResolvedReference>, ResolveError> {
        let platform = entry
            .platform
            .clone()
            .unwrap_or_else(|| self.config.target_platform.clone());
        let mut range = entry.allowed_versions.clone();

        let version = if let Some(pin) = &entry.version {
            if !range.satisfies(pin) {
                warn!(package = %entry.id, pin = %pin, range = %range, "pinned version outside allowed range");
                diagnostics.push(Diagnostic::PinOutsideRange {
                    id: entry.id.clone(),
                    pin: pin.clone(),
                    range: range.clone(),
                });
                range = VersionRange::exact(pin.clone());
            }
            pin.clone()
        } else {
            self.stats.repository_queries.fetch_add(1, Ordering::Relaxed);
            let selected = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ResolveError::Cancelled),
                selected = select_preferred_version(&entry.id, &range, &self.repositories) => selected?,
            };

            match selected.or_else(|| range.min_version().cloned()) {
                Some(version) => version,
                None if range.is_empty() => {
                    warn!(package = %entry.id, range = %range, "no version satisfies constraints");
                    diagnostics.push(Diagnostic::UnsatisfiableRange {
                        id: entry.id.clone(),
                        range,
                    });
                    return Ok(None);
                }
                None => {
                    self.unresolved_root(&entry.id, range, cancel, diagnostics)
                        .await?;
                    return Ok(None);
                }
            }
        };

        debug!(package = %entry.id, version = %version, platform = %platform, "root version chosen");
        Ok(Some(ResolvedReference::root(
            PackageIdentity::new(entry.id.clone(), version),
            platform,
            entry.development,
            range,
        )))
    }

    /// Report a root whose chosen version no repository publishes.
    ///
    /// A root that some repository knows has an unsatisfiable range, which
    /// never aborts the pass. Only an id unknown everywhere is not found.
    async fn unresolved_root(
        &self,
        id: &PackageId,
        range: VersionRange,
        cancel: &CancellationToken,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(), ResolveError> {
        if !self.is_known(id, cancel).await? {
            return self.root_not_found(id, diagnostics);
        }
        warn!(package = %id, range = %range, "no published version satisfies constraints");
        diagnostics.push(Diagnostic::UnsatisfiableRange {
            id: id.clone(),
            range,
        });
        Ok(())
    }

    async fn is_known(
        &self,
        id: &PackageId,
        cancel: &CancellationToken,
    ) -> Result<bool, ResolveError> {
        for repository in &self.repositories {
            self.stats.repository_queries.fetch_add(1, Ordering::Relaxed);
            let versions = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ResolveError::Cancelled),
                versions = repository.all_versions(id) => versions?,
            };
            if versions.is_some_and(|versions| !versions.is_empty()) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn root_not_found(&self, id: &PackageId, diagnostics: &mut Vec<Diagnostic>) -> Result<(), ResolveError> {
        if self.config.strict {
            return Err(ResolveError::PackageNotFound { id: id.to_string() });
        }
        warn!(package = %id, "package not found in any source");
        diagnostics.push(Diagnostic::RootNotFound { id: id.clone() });
        Ok(())
    }
}

/// Keep chosen packages reachable through a non-ignored path and classify
/// them. A package is development-only if every reference to it is.
fn plan(
    chosen: Vec<PackageIdentity>,
    trees: &[DependencyNode],
    references: &[ResolvedReference],
    available: &AvailablePackages,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<PlannedPackage> {
    let reachable: AHashSet<&PackageId> = flatten(trees)
        .filter(|node| !node.ignored)
        .map(|node| &node.identity().id)
        .collect();

    let mut development: AHashMap<&PackageId, bool> = AHashMap::new();
    for reference in references {
        development
            .entry(reference.id())
            .and_modify(|dev| *dev &= reference.development)
            .or_insert(reference.development);
    }

    let mut packages = Vec::with_capacity(chosen.len());
    for identity in chosen {
        if !reachable.contains(&identity.id) {
            debug!(package = %identity, "ignoring resolved package");
            diagnostics.push(Diagnostic::IgnoredButResolved { identity });
            continue;
        }

        let info = available.get(&identity);
        packages.push(PlannedPackage {
            development: development.get(&identity.id).copied().unwrap_or(false),
            source: info
                .as_ref()
                .map_or_else(|| Arc::from(""), |i| Arc::clone(&i.source)),
            dependencies: info.map(|i| i.dependencies.clone()).unwrap_or_default(),
            identity,
        });
    }
    packages
}
