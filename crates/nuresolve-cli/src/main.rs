//! nuresolve CLI - resolve declared package requirements into an
//! installation plan.
//!
//! Declarations are discovered under the project directory, merged, and
//! resolved against the configured feeds.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod output;

use clap::Parser;
use commands::{Cli, Commands};
use mimalloc::MiMalloc;
use std::process::ExitCode;
use std::time::Instant;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> ExitCode {
    let start = Instant::now();
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 if cli.quiet => Level::ERROR,
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    if matches!(cli.format, commands::OutputFormat::Json) {
        output::json::enable();
    }
    output::init(cli.quiet);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            output::json::print_error(&anyhow::anyhow!("failed to create runtime: {e}"));
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run_command(&cli));

    if cli.profile && !output::json::is_enabled() {
        eprintln!(
            "\n[profile] Total time: {}",
            output::format_duration(start.elapsed())
        );
    }

    match result {
        Ok(code) => code,
        Err(e) => {
            output::json::print_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run_command(cli: &Cli) -> anyhow::Result<ExitCode> {
    match &cli.command {
        Commands::Resolve(args) => commands::resolve::run(cli, args).await,
        Commands::Tree(args) => commands::tree::run(cli, args).await,
        Commands::Validate(args) => commands::validate::run(cli, args).await,
    }
}
