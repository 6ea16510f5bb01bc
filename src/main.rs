//! kite-runner - Matrix test runner for multi-client tuples
//!
//! Runs one test execution per tuple of client configurations on a bounded
//! worker pool. A test can ask to be run again, in which case it joins the
//! next round; rounds repeat until nothing asks for a retry, the optional
//! round limit is hit, or the run is interrupted by its timeout or Ctrl-C.
//!
//! ## Usage
//!
//! ```bash
//! # Write an example config
//! kite-runner init --output kite.yaml
//!
//! # Check it
//! kite-runner validate --config kite.yaml
//!
//! # Run with 4 workers and a 10 minute timeout
//! kite-runner run --config kite.yaml --threads 4 --timeout 600
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod cli;
mod config;
mod error;
mod executor;
mod models;
mod output;
mod results;
mod utils;

use cli::Args;
use config::{EnvConfig, RunnerConfig};
use executor::{CommandUnitFactory, MatrixRunner};
use models::RunSummary;
use output::{OutputFormat, ResultFormatter};
use results::{name_with_timestamp, SuiteReport};
use utils::{init_logger, resolve_level, FileLogSinkFactory};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(resolve_level(args.log_level.as_deref(), args.verbose));

    match args.command {
        cli::Command::Run(run_args) => run_matrix(run_args).await?,
        cli::Command::Validate(validate_args) => validate_config(validate_args)?,
        cli::Command::Init(init_args) => init_config(init_args)?,
    }

    Ok(())
}

fn load_config(args: &cli::RunArgs, env: &EnvConfig) -> Result<RunnerConfig> {
    let path = args
        .config
        .clone()
        .or_else(|| env.config_file.clone().map(Into::into))
        .context("No config file given (use --config or KITE_RUNNER_CONFIG)")?;

    let mut config = RunnerConfig::load(&path)?;
    config.apply_env(env);

    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = Some(timeout);
    }
    if let Some(max_rounds) = args.max_rounds {
        config.max_rounds = Some(max_rounds);
    }
    if let Some(name) = &args.name {
        config.name = name.clone();
    }
    if let Some(request_id) = &args.request_id {
        config.request_id = Some(request_id.clone());
    }
    if let Some(parent) = &args.parent_suite {
        config.parent_suite = Some(parent.clone());
    }
    if let Some(dir) = &args.report_dir {
        config.report_dir = dir.clone();
    }
    if let Some(dir) = &args.log_dir {
        config.log_dir = dir.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn run_matrix(args: cli::RunArgs) -> Result<()> {
    let env = EnvConfig::load();
    let mut config = load_config(&args, &env)?;
    let format = OutputFormat::from_str(&args.format)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {}", args.format))?;

    let command = config
        .command
        .clone()
        .context("Config has no `command` section to run")?;
    let tuples = std::mem::take(&mut config.tuples);

    info!(
        "Running {} ({} tuple(s), {} worker(s), timeout {})",
        config.name,
        tuples.len(),
        config.threads,
        config
            .timeout_secs
            .map(|s| format!("{s}s"))
            .unwrap_or_else(|| "none".to_string())
    );

    let report = Arc::new(
        SuiteReport::new(name_with_timestamp(&config.name), &config.report_dir)
            .with_parent_suite(config.parent_suite.clone()),
    );
    let runner = Arc::new(MatrixRunner::new(
        config.clone(),
        tuples,
        CommandUnitFactory::new(command, Arc::clone(&report)),
        report,
        Arc::new(FileLogSinkFactory::new(&config.log_dir)),
    ));

    let mut watchers = Vec::new();
    if let Some(secs) = config.timeout_secs {
        let runner = Arc::clone(&runner);
        watchers.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            warn!("Timeout of {secs}s reached, interrupting run");
            runner.interrupt();
        }));
    }
    {
        let runner = Arc::clone(&runner);
        watchers.push(tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C received, interrupting run");
                runner.interrupt();
            }
        }));
    }

    let (results, stats) = runner.run_with_stats().await;
    for watcher in watchers {
        watcher.abort();
    }

    let summary = RunSummary::new(&config.name, stats, results);
    println!("{}", ResultFormatter::new(format).format_summary(&summary));

    if let Some(path) = &args.output {
        output::write_summary_to_file(path, &summary, format)?;
        info!("Summary saved to {path}");
    }

    if !summary.is_all_passed() {
        anyhow::bail!(
            "{} of {} tuple(s) did not pass",
            summary.stats.requested - summary.passed,
            summary.stats.requested
        );
    }
    Ok(())
}

fn validate_config(args: cli::ValidateArgs) -> Result<()> {
    let config = RunnerConfig::load(&args.config)?;
    config.validate()?;

    println!(
        "{}: {} tuple(s) of {} client(s), {} worker(s){}",
        args.config.display(),
        config.tuples.len(),
        config.tuples.first().map(|t| t.len()).unwrap_or(0),
        config.threads,
        if config.command.is_some() {
            ""
        } else {
            " (no command configured)"
        }
    );
    Ok(())
}

fn init_config(args: cli::InitArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            args.output.display()
        );
    }

    RunnerConfig::example()
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!("Example config written to {}", args.output.display());
    Ok(())
}
