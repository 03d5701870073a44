//! Tree command implementation.

use super::resolve::{report_diagnostics, write_trees};
use super::{Cli, load_project, resolve_project};
use crate::output;
use anyhow::Result;
use clap::Args;
use nuresolve_resolver::render_trees;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// Arguments for the tree command.
#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    /// Also write the trees to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Run the tree command.
pub async fn run(cli: &Cli, args: &TreeArgs) -> Result<ExitCode> {
    info!("running tree command");

    let project = load_project(cli, args.output.clone())?;
    let result = resolve_project(&project).await?;

    if let Some(path) = &project.settings.tree_output {
        write_trees(path, &result)?;
    }

    if output::json::is_enabled() {
        output::json::print_result(&result.trees);
    } else {
        report_diagnostics(&result.diagnostics);
        print!("{}", render_trees(&result.trees));
    }
    Ok(ExitCode::SUCCESS)
}
