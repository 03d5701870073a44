//! Validate command implementation.

use super::{Cli, compatibility, load_settings, open_repositories};
use crate::output;
use anyhow::Result;
use clap::Args;
use nuresolve_config::{discover_declarations, read_declaration_file};
use nuresolve_core::RequirementSet;
use nuresolve_resolver::RequirementMerger;
use serde::Serialize;
use std::process::ExitCode;
use tracing::info;

/// Arguments for the validate command.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Also load every configured feed
    #[arg(long)]
    pub check_sources: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateReport {
    declarations: Vec<String>,
    errors: Vec<String>,
    merged: RequirementSet,
}

/// Run the validate command.
pub async fn run(cli: &Cli, args: &ValidateArgs) -> Result<ExitCode> {
    info!("running validate command");
    output::header("Validating declarations...");

    let settings = load_settings(cli, None)?;
    let paths = discover_declarations(&settings.project_dir, &settings.declaration_pattern)
        .map_err(nuresolve_core::Error::from)?;

    let mut errors = Vec::new();
    let mut sets = Vec::with_capacity(paths.len());
    for path in &paths {
        match read_declaration_file(path) {
            Ok(set) => sets.push(set),
            Err(e) => errors.push(nuresolve_core::Error::from(e).to_string()),
        }
    }

    if args.check_sources
        && let Err(e) = open_repositories(&settings).await
    {
        errors.push(format!("{e:#}"));
    }

    let merged = RequirementMerger::new(compatibility(&settings)).merge_all(sets);

    if output::json::is_enabled() {
        let failed = !errors.is_empty();
        output::json::print_result(ValidateReport {
            declarations: paths.iter().map(|p| p.display().to_string()).collect(),
            errors,
            merged,
        });
        return Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS });
    }

    for path in &paths {
        info!(path = %path.display(), "declaration");
    }
    if paths.is_empty() {
        output::warning("no declaration files found");
    }
    if !merged.is_empty() {
        println!("{}", output::table::requirements_table(&merged));
    }
    if !merged.ignores.is_empty() {
        let patterns: Vec<&str> = merged.ignores.iter().map(|i| i.pattern()).collect();
        println!("Ignored everywhere: {}", patterns.join(", "));
    }

    if errors.is_empty() {
        output::success(&format!(
            "{} declaration files, {} packages",
            paths.len(),
            merged.len()
        ));
        Ok(ExitCode::SUCCESS)
    } else {
        for error in &errors {
            output::error(error);
        }
        output::error("Validation failed");
        Ok(ExitCode::FAILURE)
    }
}
