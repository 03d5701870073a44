//! Benchmarks for graph building and solving.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use nuresolve_core::{PackageId, RequirementEntry, RequirementSet, Version, VersionRange};
use nuresolve_resolver::{
    CancellationToken, MemoryRepository, Repository, RequirementMerger, Resolver, ResolverConfig,
    best_version,
};
use std::sync::Arc;

/// Generate a layered repository: package `i` depends only on packages with
/// a higher index, so the graph is acyclic.
fn generate_repository(num_packages: usize, versions_per_package: usize, deps_per_version: usize) -> MemoryRepository {
    let repo = MemoryRepository::new("bench");
    let names: Vec<String> = (0..num_packages).map(|i| format!("Bench.Package{i}")).collect();

    for (index, name) in names.iter().enumerate() {
        let deps: Vec<(&str, &str)> = (1..=deps_per_version)
            .map(|step| index + step * 7)
            .filter(|&dep| dep < num_packages)
            .map(|dep| (names[dep].as_str(), "[1.0,)"))
            .collect();
        for v in 0..versions_per_package {
            repo.add_version(name, &format!("1.{v}.0"), deps.clone());
        }
    }
    repo
}

fn roots(count: usize) -> RequirementSet {
    (0..count).fold(RequirementSet::new(), |set, i| {
        set.with_package(RequirementEntry::new(
            PackageId::parse(&format!("Bench.Package{i}")).unwrap(),
        ))
    })
}

/// Create a tokio runtime for async benchmarks.
fn create_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Benchmark range parsing.
fn bench_range_parsing(c: &mut Criterion) {
    let ranges = ["1.0", "[1.0,2.0)", "(,3.0]", "[1.0.0-beta,)", "*", "[2.1.0]"];

    c.bench_function("range_parse", |b| {
        b.iter(|| {
            for r in &ranges {
                black_box(VersionRange::parse(r));
            }
        });
    });
}

/// Benchmark preferred version selection.
fn bench_best_version(c: &mut Criterion) {
    let versions: Vec<Version> = (0..100)
        .map(|i| Version::parse(&format!("{}.{}.0", i / 10, i % 10)).unwrap())
        .collect();
    let range = VersionRange::parse("[2.0,8.0)").unwrap();

    c.bench_function("best_version_100", |b| {
        b.iter(|| black_box(best_version(&versions, &range)));
    });
}

/// Benchmark merging many declarations of the same packages.
fn bench_merge(c: &mut Criterion) {
    let sets: Vec<RequirementSet> = (0..20).map(|_| roots(50)).collect();
    let merger = RequirementMerger::default();

    c.bench_function("merge_20x50", |b| {
        b.iter(|| black_box(merger.merge_all(sets.clone())));
    });
}

/// Benchmark resolution with different graph sizes.
fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    for size in [10, 50, 100] {
        let repo: Arc<dyn Repository> = Arc::new(generate_repository(size, 5, 2));
        let resolver = Resolver::new(vec![repo], ResolverConfig::default());
        let requirements = roots(3);
        let rt = create_runtime();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("packages", size), &size, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    black_box(resolver.resolve(&requirements, &CancellationToken::new()).await)
                })
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_range_parsing,
    bench_best_version,
    bench_merge,
    bench_resolution,
);
criterion_main!(benches);
