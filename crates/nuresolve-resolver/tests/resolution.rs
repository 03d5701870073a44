//! End-to-end resolution through repositories, merging and the solver.

use nuresolve_core::{
    IgnoreMatcher, PackageId, PlatformCompatibility, PlatformMoniker, RequirementEntry,
    RequirementSet, Version, VersionRange,
};
use nuresolve_resolver::{
    CancellationToken, Diagnostic, FeedRepository, MemoryRepository, Repository,
    RequirementMerger, ResolutionResult, ResolveError, Resolver, ResolverConfig, render_trees,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const FEED: &str = r#"{
  "packages": [
    { "id": "A", "versions": [
        { "version": "1.0.0", "dependencies": [ { "id": "C", "range": "[1.0,2.0)" } ] },
        { "version": "1.2.0", "dependencies": [ { "id": "C", "range": "[1.0,2.0)" } ] },
        { "version": "2.0.0-beta", "dependencies": [] }
    ] },
    { "id": "B", "versions": [
        { "version": "1.0.0" },
        { "version": "2.0.0", "dependencies": [ { "id": "C", "range": "[1.5,3.0)" } ] }
    ] },
    { "id": "C", "versions": [
        { "version": "1.0.0" },
        { "version": "1.6.0" },
        { "version": "1.8.0" },
        { "version": "2.5.0" }
    ] }
  ]
}"#;

fn id(s: &str) -> PackageId {
    PackageId::parse(s).unwrap()
}

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

fn range(s: &str) -> VersionRange {
    VersionRange::parse(s).unwrap()
}

fn feed() -> Arc<dyn Repository> {
    Arc::new(FeedRepository::from_json("feed", FEED, PlatformCompatibility::default()).unwrap())
}

fn planned(result: &ResolutionResult) -> Vec<String> {
    result
        .packages
        .iter()
        .map(|p| p.identity.to_string())
        .collect()
}

async fn resolve(
    repositories: Vec<Arc<dyn Repository>>,
    requirements: &RequirementSet,
) -> Result<ResolutionResult, ResolveError> {
    Resolver::new(repositories, ResolverConfig::default())
        .resolve(requirements, &CancellationToken::new())
        .await
}

#[tokio::test]
async fn shared_dependency_lands_in_merged_range() {
    let requirements = RequirementSet::new()
        .with_package(RequirementEntry::new(id("A")))
        .with_package(RequirementEntry::new(id("B")).with_version(v("2.0.0")));

    let result = resolve(vec![feed()], &requirements).await.unwrap();

    assert_eq!(planned(&result), vec!["A@1.2.0", "B@2.0.0", "C@1.8.0"]);
    assert!(result.diagnostics.is_empty());

    // Both paths to C reach the solver
    let c_ranges: Vec<String> = result
        .references
        .iter()
        .filter(|r| r.id().matches("C"))
        .map(|r| r.allowed_versions.to_string())
        .collect();
    assert_eq!(c_ranges, vec!["[1.0,2.0)", "[1.5,3.0)"]);

    let c = result.get("C").unwrap();
    assert!(range("[1.5,2.0)").satisfies(&c.identity.version));
    assert_eq!(&*c.source, "feed");
}

#[tokio::test]
async fn trees_render_per_root() {
    let requirements = RequirementSet::new()
        .with_package(RequirementEntry::new(id("A")))
        .with_package(RequirementEntry::new(id("B")).with_version(v("2.0.0")));

    let result = resolve(vec![feed()], &requirements).await.unwrap();
    assert_eq!(
        render_trees(&result.trees),
        "A@1.2.0\n\tC@1.8.0\nB@2.0.0\n\tC@2.5.0\n"
    );
}

#[tokio::test]
async fn stable_preferred_over_higher_prerelease() {
    let requirements = RequirementSet::new()
        .with_package(RequirementEntry::new(id("A")).with_allowed_versions(VersionRange::all()));

    let result = resolve(vec![feed()], &requirements).await.unwrap();
    assert_eq!(result.get("A").unwrap().identity.version, v("1.2.0"));
}

#[tokio::test]
async fn merged_declarations_resolve_together() {
    let first = RequirementSet::new()
        .with_package(RequirementEntry::new(id("C")).with_allowed_versions(range("[1.0,2.0)")))
        .with_package(RequirementEntry::new(id("A")).with_development(true));
    let second = RequirementSet::new()
        .with_package(RequirementEntry::new(id("C")).with_allowed_versions(range("[1.5,3.0)")))
        .with_package(RequirementEntry::new(id("A")).with_development(false));

    let merged = RequirementMerger::default().merge_all([first, second]);
    assert!(!merged.get(&id("A")).unwrap().development);

    let result = resolve(vec![feed()], &merged).await.unwrap();
    assert_eq!(planned(&result), vec!["A@1.2.0", "C@1.8.0"]);
    assert_eq!(result.development().count(), 0);
}

#[tokio::test]
async fn disjoint_declarations_report_unsatisfiable_range() {
    let first = RequirementSet::new()
        .with_package(RequirementEntry::new(id("C")).with_allowed_versions(range("[1.0,2.0)")));
    let second = RequirementSet::new()
        .with_package(RequirementEntry::new(id("C")).with_allowed_versions(range("[3.0,4.0)")))
        .with_package(RequirementEntry::new(id("B")).with_version(v("1.0.0")));

    let merged = RequirementMerger::default().merge_all([first, second]);
    let result = resolve(vec![feed()], &merged).await.unwrap();

    assert_eq!(planned(&result), vec!["B@1.0.0"]);
    assert!(matches!(
        result.diagnostics.as_slice(),
        [Diagnostic::UnsatisfiableRange { id, .. }] if id.matches("C")
    ));
}

#[tokio::test]
async fn merged_range_without_published_version_is_unsatisfiable() {
    let repo = MemoryRepository::new("main");
    repo.add_version("X", "1.2.0", vec![]);
    repo.add_version("X", "2.5.0", vec![]);
    repo.add_version("Y", "1.0.0", vec![]);
    let first = RequirementSet::new()
        .with_package(RequirementEntry::new(id("X")).with_allowed_versions(range("[1.0,2.0)")));
    let second = RequirementSet::new()
        .with_package(RequirementEntry::new(id("X")).with_allowed_versions(range("[1.5,3.0)")))
        .with_package(RequirementEntry::new(id("Y")));
    let merged = RequirementMerger::default().merge_all([first, second]);
    let repository: Arc<dyn Repository> = Arc::new(repo);

    for strict in [false, true] {
        let config = ResolverConfig {
            strict,
            ..Default::default()
        };
        let result = Resolver::new(vec![Arc::clone(&repository)], config)
            .resolve(&merged, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(planned(&result), vec!["Y@1.0.0"], "strict: {strict}");
        match result.diagnostics.as_slice() {
            [diagnostic @ Diagnostic::UnsatisfiableRange { id, .. }] => {
                assert!(id.matches("X"));
                assert!(diagnostic.to_string().starts_with("no version of 'X' satisfies"));
            }
            other => panic!("expected an unsatisfiable range, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn conflicting_transitive_ranges_fail() {
    let repo = MemoryRepository::new("main");
    repo.add_version("A", "1.0.0", vec![("C", "[1.0,2.0)")]);
    repo.add_version("B", "1.0.0", vec![("C", "[3.0,4.0)")]);
    repo.add_version("C", "1.0.0", vec![]);
    repo.add_version("C", "3.0.0", vec![]);
    let requirements = RequirementSet::new()
        .with_package(RequirementEntry::new(id("A")))
        .with_package(RequirementEntry::new(id("B")));

    let err = resolve(vec![Arc::new(repo)], &requirements)
        .await
        .unwrap_err();
    match err {
        ResolveError::Unsatisfiable { roots, .. } => assert_eq!(roots, vec!["A", "B"]),
        other => panic!("expected unsatisfiable, got {other:?}"),
    }
}

#[tokio::test]
async fn cycle_is_fatal() {
    let repo = MemoryRepository::new("main");
    repo.add_version("A", "1.0.0", vec![("B", "1.0")]);
    repo.add_version("B", "1.0.0", vec![("A", "1.0")]);
    let requirements = RequirementSet::new().with_package(RequirementEntry::new(id("A")));

    let err = resolve(vec![Arc::new(repo)], &requirements)
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::CircularDependency { .. }));
    let core: nuresolve_core::Error = err.into();
    assert!(core.to_string().contains("A@1.0.0 -> B@1.0.0 -> A@1.0.0"));
}

#[tokio::test]
async fn scoped_ignore_excludes_only_that_subtree() {
    let repo = MemoryRepository::new("main");
    repo.add_version("App", "1.0.0", vec![("Logging", "1.0"), ("Json", "1.0")]);
    repo.add_version("Tool", "1.0.0", vec![("Json", "1.0")]);
    repo.add_version("Logging", "1.0.0", vec![]);
    repo.add_version("Json", "1.0.0", vec![]);
    let requirements = RequirementSet::new()
        .with_package(RequirementEntry::new(id("App")).with_ignore(IgnoreMatcher::new("Json")))
        .with_package(RequirementEntry::new(id("Tool")));

    let result = resolve(vec![Arc::new(repo)], &requirements).await.unwrap();
    assert_eq!(
        planned(&result),
        vec!["App@1.0.0", "Json@1.0.0", "Logging@1.0.0", "Tool@1.0.0"]
    );
}

#[tokio::test]
async fn sources_are_tried_in_order() {
    let company = MemoryRepository::new("company");
    company.add_version("Internal", "1.0.0", vec![("Public", "1.0")]);
    let public = MemoryRepository::new("public");
    public.add_version("Public", "1.0.0", vec![]);
    public.add_version("Public", "1.1.0", vec![]);
    public.add_version("Internal", "9.0.0", vec![]);
    let requirements = RequirementSet::new().with_package(RequirementEntry::new(id("Internal")));

    let result = resolve(vec![Arc::new(company), Arc::new(public)], &requirements)
        .await
        .unwrap();

    // Public is unknown to the parent's source, so the range minimum is used
    // and its subtree comes from the next source.
    assert_eq!(planned(&result), vec!["Internal@1.0.0", "Public@1.0"]);
    assert_eq!(&*result.get("Internal").unwrap().source, "company");
    assert_eq!(&*result.get("Public").unwrap().source, "public");
    assert!(result.diagnostics.is_empty());
}

#[tokio::test]
async fn platform_groups_follow_the_target() {
    let feed = r#"{
      "packages": [
        { "id": "Http", "versions": [
            { "version": "1.0.0", "dependencyGroups": [
                { "targetFramework": "net45", "dependencies": [ { "id": "Legacy", "range": "1.0" } ] },
                { "targetFramework": "netstandard2.0", "dependencies": [] }
            ] }
        ] },
        { "id": "Legacy", "versions": [ { "version": "1.0.0" } ] }
      ]
    }"#;
    let repo: Arc<dyn Repository> = Arc::new(
        FeedRepository::from_json("feed", feed, PlatformCompatibility::default()).unwrap(),
    );

    let modern = RequirementSet::new().with_package(RequirementEntry::new(id("Http")));
    let result = resolve(vec![Arc::clone(&repo)], &modern).await.unwrap();
    assert_eq!(planned(&result), vec!["Http@1.0.0"]);

    let legacy = RequirementSet::new().with_package(
        RequirementEntry::new(id("Http")).with_platform(PlatformMoniker::parse("net46")),
    );
    let result = resolve(vec![repo], &legacy).await.unwrap();
    assert_eq!(planned(&result), vec!["Http@1.0.0", "Legacy@1.0.0"]);
}
