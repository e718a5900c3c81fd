//! CLI argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::commands::{
    config::ConfigCommands, generate::GenerateCommands, run::RunCommands, test::TestCommands,
};
use crate::output::OutputFormat;

/// hypogen CLI
///
/// Generates falsifiable hypotheses from an exploratory summary, scores them
/// against a dataset and runs the matching statistical tests.
#[derive(Parser, Debug)]
#[command(name = "hypogen")]
#[command(version)]
#[command(about = "Hypothesis generation and statistical testing", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (table, json)
    #[arg(short, long, global = true, default_value = "table", env = "HYPOGEN_OUTPUT")]
    pub output: OutputFormat,

    /// Engine configuration file (JSON)
    #[arg(short = 'c', long = "config", global = true, env = "HYPOGEN_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Log line format
    #[arg(long, global = true, default_value = "text", env = "HYPOGEN_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate and rank hypotheses from an exploratory summary
    #[command(alias = "gen")]
    Generate(GenerateCommands),

    /// Execute test specifications against a dataset
    Test(TestCommands),

    /// Generate, validate, test and correct in one pass
    Run(RunCommands),

    /// Inspect engine configuration
    #[command(alias = "cfg")]
    Config(ConfigCommands),
}
