//! Dependency graph building.
//!
//! Each root requirement is expanded into a tree of its transitive
//! dependencies. Every package a repository reports is recorded once in the
//! shared [`AvailablePackages`] set; tree shape is kept even for packages
//! that were already recorded, so the same identity may appear in several
//! places.
//!
//! Ignore status flows top-down: a node is ignored if its parent is, or if a
//! global or requirement-scoped ignore rule matches its id.

use crate::repository::{Repository, RepositoryError};
use crate::resolver::ResolverStats;
use crate::selector::select_preferred_version;
use crate::tree::DependencyNode;
use crate::types::{AvailablePackages, Diagnostic, PackageDependency, ResolveError, ResolvedReference};
use futures::future::{BoxFuture, try_join_all};
use nuresolve_core::{IgnoreMatcher, PackageId, PackageIdentity, any_match};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Default limit on tree depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Expands root requirements into dependency trees.
pub struct GraphBuilder {
    repositories: Vec<Arc<dyn Repository>>,
    global_ignores: Vec<IgnoreMatcher>,
    max_depth: usize,
    cancel: CancellationToken,
    available: Arc<AvailablePackages>,
    diagnostics: Mutex<Vec<Diagnostic>>,
    stats: Arc<ResolverStats>,
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("repositories", &self.repositories)
            .field("max_depth", &self.max_depth)
            .field("available", &self.available.len())
            .finish_non_exhaustive()
    }
}

impl GraphBuilder {
    /// Create a builder over ordered repositories, recording metadata into
    /// `available`.
    #[must_use]
    pub fn new(repositories: Vec<Arc<dyn Repository>>, available: Arc<AvailablePackages>) -> Self {
        Self {
            repositories,
            global_ignores: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            cancel: CancellationToken::new(),
            available,
            diagnostics: Mutex::new(Vec::new()),
            stats: Arc::new(ResolverStats::default()),
        }
    }

    /// Ignore rules that apply to every tree.
    #[must_use]
    pub fn with_ignores(mut self, ignores: Vec<IgnoreMatcher>) -> Self {
        self.global_ignores = ignores;
        self
    }

    /// Limit on the number of levels in a tree.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Observe `cancel` at every repository call.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Count work in `stats`.
    #[must_use]
    pub fn with_stats(mut self, stats: Arc<ResolverStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Non-fatal problems found so far, draining them.
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock())
    }

    /// Build the tree of `root`, trying repositories in order until one
    /// knows it.
    ///
    /// Returns `None` if no repository knows the root.
    ///
    /// # Errors
    /// Returns error on a dependency cycle, when the depth limit is exceeded,
    /// on cancellation, or if a repository fails.
    pub async fn build_tree(
        &self,
        root: ResolvedReference,
        scoped_ignores: &[IgnoreMatcher],
    ) -> Result<Option<DependencyNode>, ResolveError> {
        for repository in &self.repositories {
            let tree = self
                .expand(repository, root.clone(), false, scoped_ignores, Vec::new())
                .await?;
            if tree.is_some() {
                return Ok(tree);
            }
            trace!(package = %root.identity, repository = repository.name(), "root not in repository");
        }
        Ok(None)
    }

    fn expand<'a>(
        &'a self,
        repository: &'a Arc<dyn Repository>,
        reference: ResolvedReference,
        inherited_ignore: bool,
        scoped_ignores: &'a [IgnoreMatcher],
        mut path: Vec<PackageIdentity>,
    ) -> BoxFuture<'a, Result<Option<DependencyNode>, ResolveError>> {
        Box::pin(async move {
            if self.cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }
            self.check_path(&path, &reference.identity)?;

            self.stats.repository_queries.fetch_add(1, Ordering::Relaxed);
            let Some(info) = self
                .cancellable(repository.dependency_info(&reference.identity, &reference.platform))
                .await?
            else {
                return Ok(None);
            };

            let ignored = inherited_ignore || self.is_ignored(reference.id(), scoped_ignores);
            let dependencies = info.dependencies.clone();
            if self.available.insert(info) {
                self.stats.packages_recorded.fetch_add(1, Ordering::Relaxed);
            }
            debug!(
                package = %reference.identity,
                repository = repository.name(),
                depth = path.len(),
                dependencies = dependencies.len(),
                ignored,
                "expanding package"
            );

            path.push(reference.identity.clone());
            let children = try_join_all(dependencies.iter().map(|dependency| {
                self.expand_child(repository, &reference, dependency, ignored, scoped_ignores, &path)
            }))
            .await?;

            self.stats.nodes_built.fetch_add(1, Ordering::Relaxed);
            Ok(Some(DependencyNode {
                reference,
                ignored,
                children: children.into_iter().flatten().collect(),
            }))
        })
    }

    async fn expand_child(
        &self,
        repository: &Arc<dyn Repository>,
        parent: &ResolvedReference,
        dependency: &PackageDependency,
        ignored: bool,
        scoped_ignores: &[IgnoreMatcher],
        path: &[PackageIdentity],
    ) -> Result<Option<DependencyNode>, ResolveError> {
        self.stats.repository_queries.fetch_add(1, Ordering::Relaxed);
        let selected = self
            .cancellable(select_preferred_version(
                &dependency.id,
                &dependency.range,
                std::slice::from_ref(repository),
            ))
            .await?;

        let Some(version) = selected.or_else(|| dependency.range.min_version().cloned()) else {
            warn!(package = %dependency.id, parent = %parent.identity, "no version of dependency found");
            self.report(Diagnostic::TransitiveNotFound {
                id: dependency.id.clone(),
                version: None,
                parent: parent.identity.clone(),
            });
            return Ok(None);
        };

        let identity = PackageIdentity::new(dependency.id.clone(), version);
        let reference = parent.child(identity, dependency.range.clone());

        for candidate in &self.repositories {
            let node = self
                .expand(candidate, reference.clone(), ignored, scoped_ignores, path.to_vec())
                .await?;
            if node.is_some() {
                return Ok(node);
            }
        }

        warn!(package = %reference.identity, parent = %parent.identity, "dependency not found in any source");
        self.report(Diagnostic::TransitiveNotFound {
            id: dependency.id.clone(),
            version: Some(reference.identity.version.clone()),
            parent: parent.identity.clone(),
        });
        let leaf_ignored = ignored || self.is_ignored(reference.id(), scoped_ignores);
        Ok(Some(DependencyNode::leaf(reference, leaf_ignored)))
    }

    /// Fail on a cycle or when the tree gets too deep.
    fn check_path(&self, path: &[PackageIdentity], next: &PackageIdentity) -> Result<(), ResolveError> {
        if let Some(start) = path.iter().position(|p| p == next) {
            return Err(ResolveError::CircularDependency {
                cycle: render_path(&path[start..], next),
            });
        }
        if path.len() >= self.max_depth {
            return Err(ResolveError::DepthExceeded {
                path: render_path(path, next),
                max_depth: self.max_depth,
            });
        }
        Ok(())
    }

    fn is_ignored(&self, id: &PackageId, scoped_ignores: &[IgnoreMatcher]) -> bool {
        any_match(&self.global_ignores, id.as_str()) || any_match(scoped_ignores, id.as_str())
    }

    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().push(diagnostic);
    }

    async fn cancellable<T>(
        &self,
        future: impl Future<Output = Result<T, RepositoryError>>,
    ) -> Result<T, ResolveError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ResolveError::Cancelled),
            result = future => result.map_err(ResolveError::from),
        }
    }
}

fn render_path(path: &[PackageIdentity], last: &PackageIdentity) -> String {
    path.iter()
        .chain(std::iter::once(last))
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
