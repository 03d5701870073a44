//! CLI commands for nuresolve.

pub mod resolve;
pub mod tree;
pub mod validate;

use crate::output;
use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nuresolve_config::{CliOverrides, Declaration, ResolvedSettings, SettingsLoader, load_declarations};
use nuresolve_core::{PlatformCompatibility, PlatformMoniker, RequirementSet};
use nuresolve_resolver::{
    CancellationToken, FeedRepository, Repository, RequirementMerger, ResolutionResult, Resolver,
    ResolverConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// nuresolve - resolve declared package requirements into an installation
/// plan
#[derive(Parser, Debug)]
#[command(name = "nuresolve")]
#[command(author = "nuresolve Contributors")]
#[command(version)]
#[command(about = "Resolve declared package requirements into an installation plan", long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
#[command(styles = get_styles())]
pub struct Cli {
    /// Do not output any message
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Display timing information
    #[arg(long, global = true)]
    pub profile: bool,

    /// Use the specified directory as project directory
    #[arg(short = 'd', long = "working-dir", global = true, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Feed file to resolve against (repeatable, tried in order)
    #[arg(short = 's', long = "source", global = true, value_name = "FILE")]
    pub sources: Vec<PathBuf>,

    /// Platform to resolve for (e.g. netstandard2.0, net46)
    #[arg(long, global = true, value_name = "PLATFORM", value_parser = parse_platform)]
    pub target_platform: Option<PlatformMoniker>,

    /// Fail when a declared package is not found in any source
    #[arg(long, global = true)]
    pub strict: bool,

    /// Maximum dependency tree depth
    #[arg(long, global = true, value_name = "DEPTH")]
    pub max_depth: Option<usize>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Increase the verbosity of messages: -v for verbose, -vv for debug, -vvv for trace
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve declarations and print the installation plan
    #[command(visible_alias = "r")]
    Resolve(resolve::ResolveArgs),

    /// Resolve declarations and print the dependency trees
    Tree(tree::TreeArgs),

    /// Check settings and declarations and print the merged requirements
    Validate(validate::ValidateArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

const fn get_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Green.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Green.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default())
        .placeholder(clap::builder::styling::AnsiColor::Yellow.on_default())
}

fn parse_platform(value: &str) -> std::result::Result<PlatformMoniker, String> {
    match PlatformMoniker::parse(value) {
        PlatformMoniker::Unsupported => Err(format!("unrecognised platform '{value}'")),
        platform => Ok(platform),
    }
}

/// Settings and declarations of one project.
#[derive(Debug)]
pub struct Project {
    pub settings: ResolvedSettings,
    pub declarations: Vec<Declaration>,
    pub requirements: RequirementSet,
}

impl Cli {
    fn overrides(&self, tree_output: Option<PathBuf>) -> CliOverrides {
        CliOverrides {
            sources: self.sources.clone(),
            target_platform: self.target_platform.clone(),
            strict: self.strict,
            max_depth: self.max_depth,
            tree_output,
        }
    }

    fn project_dir(&self) -> Result<PathBuf> {
        match &self.working_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("cannot determine working directory"),
        }
    }
}

/// Resolve settings: `nuresolve.json`, then environment, then flags.
pub fn load_settings(cli: &Cli, tree_output: Option<PathBuf>) -> Result<ResolvedSettings> {
    let dir = cli.project_dir()?;
    let mut settings = SettingsLoader::new(&dir)
        .resolve()
        .map_err(nuresolve_core::Error::from)?;
    cli.overrides(tree_output)
        .apply_to(&mut settings)
        .map_err(nuresolve_core::Error::from)?;
    debug!(?settings, "resolved settings");
    Ok(settings)
}

/// Load settings and every declaration, and merge the declarations.
pub fn load_project(cli: &Cli, tree_output: Option<PathBuf>) -> Result<Project> {
    let settings = load_settings(cli, tree_output)?;
    let declarations = load_declarations(&settings.project_dir, &settings.declaration_pattern)
        .map_err(nuresolve_core::Error::from)?;

    let merger = RequirementMerger::new(compatibility(&settings));
    let requirements = merger.merge_all(declarations.iter().map(|d| d.requirements.clone()));
    info!(
        declarations = declarations.len(),
        packages = requirements.len(),
        "merged declarations"
    );

    Ok(Project {
        settings,
        declarations,
        requirements,
    })
}

/// Open every configured feed, in order.
pub async fn open_repositories(settings: &ResolvedSettings) -> Result<Vec<Arc<dyn Repository>>> {
    let mut repositories: Vec<Arc<dyn Repository>> = Vec::with_capacity(settings.sources.len());
    for path in &settings.sources {
        let feed = FeedRepository::load(path, compatibility(settings))
            .await
            .map_err(|e| nuresolve_core::Error::repository(e.source_name(), e.to_string()))?;
        repositories.push(Arc::new(feed));
    }
    Ok(repositories)
}

/// Resolve a loaded project, showing progress and cancelling on Ctrl-C.
pub async fn resolve_project(project: &Project) -> Result<ResolutionResult> {
    let settings = &project.settings;
    let repositories = open_repositories(settings).await?;
    if repositories.is_empty() && !project.requirements.is_empty() {
        output::warning("no sources configured; every package will be reported as not found");
    }

    let config = ResolverConfig {
        strict: settings.strict,
        max_depth: settings.max_depth,
        target_platform: settings.target_platform.clone(),
    };

    let progress = output::progress::ResolveProgress::new();
    let resolver = Resolver::new(repositories, config).with_progress(progress.callback());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let result = resolver.resolve(&project.requirements, &cancel).await;
    interrupt.abort();
    progress.finish();

    Ok(result.map_err(nuresolve_core::Error::from)?)
}

fn compatibility(settings: &ResolvedSettings) -> PlatformCompatibility {
    PlatformCompatibility::new(settings.supported_platforms.iter().cloned())
}
