//! depush - propagates released versions into dependent repositories
//!
//! Rewrites version fields in place across:
//! - Maven POMs
//! - npm package.json
//! - Helm requirements.yaml
//! - Homebrew formulae
//! - Jenkins plugin lists
//! - gradle.properties and Dockerfiles

use anyhow::Context;
use clap::Parser;
use depush::cli::CliArgs;
use depush::orchestrator::Orchestrator;
use depush::output::{create_formatter, OutputConfig};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(args.verbose);

    // Run the main logic and handle errors
    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; RUST_LOG overrides the verbosity default
fn init_tracing(verbose: bool) {
    let default = if verbose { "depush=debug" } else { "depush=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let cwd = std::env::current_dir().context("cannot determine the current directory")?;
    let plan = args.to_plan(&cwd)?;

    if args.verbose {
        eprintln!("depush v{}", env!("CARGO_PKG_VERSION"));
        for repository in &plan.repositories {
            eprintln!("Target: {}", repository.path.display());
        }
        if plan.dry_run {
            eprintln!("Mode: dry-run");
        }
    }

    let orchestrator = Orchestrator::new(plan)?;
    let result = orchestrator.run(!args.quiet && !args.json).await?;

    let output_config = OutputConfig::from_cli(args.json, args.verbose, args.quiet, args.dry_run);
    let formatter = create_formatter(output_config);

    let mut stdout = io::stdout().lock();
    formatter.format(&result, &mut stdout)?;
    stdout.flush()?;

    // Partial success - some repositories were aborted
    if result.report.has_errors() {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
