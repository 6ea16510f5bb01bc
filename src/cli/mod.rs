//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run a matrix of client tuples with retries and a bounded worker pool
#[derive(Parser, Debug)]
#[command(name = "kite-runner")]
#[command(version)]
#[command(about = "Run client-tuple test matrices with bounded concurrency")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every tuple in the config
    Run(RunArgs),

    /// Check a config file without running it
    Validate(ValidateArgs),

    /// Write an example config file
    Init(InitArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Config file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Worker pool size
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Interrupt the run after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Stop retrying after this many rounds
    #[arg(long)]
    pub max_rounds: Option<u32>,

    /// Test name (overrides the config)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Request identifier used in the log path
    #[arg(long)]
    pub request_id: Option<String>,

    /// Parent suite recorded in the report
    #[arg(long)]
    pub parent_suite: Option<String>,

    /// Report directory
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Log directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Output format (table, json, json-pretty, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Save the summary to a file
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Config file (YAML or JSON)
    #[arg(short, long)]
    pub config: PathBuf,
}

/// Arguments for the init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Where to write the example config
    #[arg(short, long, default_value = "kite.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args() {
        let args = Args::parse_from([
            "kite-runner",
            "run",
            "--config",
            "kite.yaml",
            "--threads",
            "8",
            "--timeout",
            "120",
            "--max-rounds",
            "4",
        ]);
        match args.command {
            Command::Run(run_args) => {
                assert_eq!(run_args.config, Some(PathBuf::from("kite.yaml")));
                assert_eq!(run_args.threads, Some(8));
                assert_eq!(run_args.timeout, Some(120));
                assert_eq!(run_args.max_rounds, Some(4));
                assert_eq!(run_args.format, "table");
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = Args::parse_from([
            "kite-runner",
            "validate",
            "-c",
            "kite.json",
            "--verbose",
            "--log-level",
            "warn",
        ]);
        assert!(args.verbose);
        assert_eq!(args.log_level.as_deref(), Some("warn"));
        assert!(matches!(args.command, Command::Validate(_)));
    }

    #[test]
    fn test_init_defaults() {
        let args = Args::parse_from(["kite-runner", "init"]);
        match args.command {
            Command::Init(init_args) => {
                assert_eq!(init_args.output, PathBuf::from("kite.yaml"));
                assert!(!init_args.force);
            }
            _ => panic!("Expected Init command"),
        }
    }
}
