//! Resolve command implementation.

use super::{Cli, load_project, resolve_project};
use crate::output;
use anyhow::{Context as _, Result};
use clap::Args;
use nuresolve_resolver::{Diagnostic, PlannedPackage, ResolutionResult, render_trees};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

/// Arguments for the resolve command.
#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Write the dependency trees to this file
    #[arg(long, value_name = "FILE")]
    pub tree_output: Option<PathBuf>,

    /// Leave development-only packages out of the plan
    #[arg(long)]
    pub no_dev: bool,

    /// Exit with an error if any warning was reported
    #[arg(long)]
    pub fail_on_warnings: bool,
}

/// Plan as printed with `--format json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanReport<'a> {
    packages: Vec<&'a PlannedPackage>,
    diagnostics: &'a [Diagnostic],
    duration_ms: u128,
}

/// Run the resolve command.
pub async fn run(cli: &Cli, args: &ResolveArgs) -> Result<ExitCode> {
    info!("running resolve command");
    output::header("Resolving declared packages...");

    let project = load_project(cli, args.tree_output.clone())?;
    let result = resolve_project(&project).await?;

    if let Some(path) = &project.settings.tree_output {
        write_trees(path, &result)?;
    }

    let packages: Vec<&PlannedPackage> = result
        .packages
        .iter()
        .filter(|p| !(args.no_dev && p.development))
        .collect();

    if output::json::is_enabled() {
        output::json::print_result(PlanReport {
            packages,
            diagnostics: &result.diagnostics,
            duration_ms: result.duration.as_millis(),
        });
    } else {
        report_diagnostics(&result.diagnostics);
        if !packages.is_empty() {
            println!("{}", output::table::plan_table(packages.iter().copied()));
        }
        output::success(&summary(&packages, result.duration));
    }

    if args.fail_on_warnings && result.diagnostics.iter().any(is_warning) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Print each diagnostic that needs attention as a warning.
pub fn report_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        if is_warning(diagnostic) {
            output::warning(&diagnostic.to_string());
        } else {
            info!("{diagnostic}");
        }
    }
}

/// Summary of the packages actually printed.
fn summary(packages: &[&PlannedPackage], duration: Duration) -> String {
    format!(
        "Resolved {} packages ({} development) in {}",
        packages.len(),
        packages.iter().filter(|p| p.development).count(),
        output::format_duration(duration)
    )
}

/// Ignored packages are expected; everything else is worth a warning.
const fn is_warning(diagnostic: &Diagnostic) -> bool {
    !matches!(diagnostic, Diagnostic::IgnoredButResolved { .. })
}

/// Write the rendered trees, creating parent directories.
pub fn write_trees(path: &Path, result: &ResolutionResult) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    std::fs::write(path, render_trees(&result.trees))
        .with_context(|| format!("cannot write dependency trees to {}", path.display()))?;
    info!(path = %path.display(), "wrote dependency trees");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nuresolve_core::{PackageId, PackageIdentity, Version};
    use std::sync::Arc;

    fn package(id: &str, development: bool) -> PlannedPackage {
        PlannedPackage {
            identity: PackageIdentity::new(
                PackageId::parse(id).unwrap(),
                Version::parse("1.0.0").unwrap(),
            ),
            development,
            source: Arc::from("feed"),
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn summary_counts_printed_packages() {
        let runtime = package("App", false);
        let tools = package("Tools", true);

        let all = summary(&[&runtime, &tools], Duration::from_millis(5));
        assert!(all.starts_with("Resolved 2 packages (1 development)"));

        let without_dev = summary(&[&runtime], Duration::from_millis(5));
        assert!(without_dev.starts_with("Resolved 1 packages (0 development)"));
    }
}
