//! Dependency graph building and resolution for nuresolve.
//!
//! - **Repositories** answer which versions of a package exist and what a
//!   specific version depends on for a platform ([`Repository`]).
//! - **Merging** folds requirement sets from several declaration files into
//!   one ([`RequirementMerger`]).
//! - **Graph building** walks each root's dependencies and records every
//!   package seen ([`GraphBuilder`]).
//! - **Solving** picks one version per package with `PubGrub`
//!   ([`PubGrubSolver`]).
//! - **Orchestration** ties it together and applies ignore rules and
//!   development classification ([`Resolver`]).

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod feed;
mod graph;
mod merge;
mod progress;
mod repository;
mod resolver;
mod selector;
mod solver;
mod tree;
mod types;

pub use feed::FeedRepository;
pub use graph::{DEFAULT_MAX_DEPTH, GraphBuilder};
pub use merge::RequirementMerger;
pub use progress::{ProgressCallback, ProgressReport, ProgressSegment};
pub use repository::{
    DependencyGroup, MemoryRepository, Repository, RepositoryError, RepositoryFuture,
};
pub use resolver::{Resolver, ResolverConfig, ResolverStats};
pub use selector::{best_version, select_preferred_version};
pub use solver::{ConstraintSolver, PubGrubSolver, SolveRequest, SolverError};
pub use tree::{DependencyNode, PreOrder, flatten, render_trees};
pub use types::{
    AvailablePackageInfo, AvailablePackages, Diagnostic, PackageDependency, PlannedPackage,
    ResolutionResult, ResolveError, ResolvedReference,
};

// Re-export the cancellation token so callers need not depend on tokio-util.
pub use tokio_util::sync::CancellationToken;
