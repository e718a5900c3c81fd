//! hypogen CLI
//!
//! Command-line interface for generating hypotheses from an exploratory
//! summary, scoring them against a dataset and running statistical tests.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod context;
mod output;

use cli::{Cli, Commands, LogFormat};
use context::Context;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output
    let level = if cli.verbose { "hypogen=debug" } else { "hypogen=info" };
    let filter = EnvFilter::from_default_env()
        .add_directive(level.parse()?)
        .add_directive("warn".parse()?);
    match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }

    // Create context
    let ctx = Context::new(&cli)?;

    // Execute command
    match cli.command {
        Commands::Generate(cmd) => commands::generate::execute(&ctx, cmd),
        Commands::Test(cmd) => commands::test::execute(&ctx, cmd),
        Commands::Run(cmd) => commands::run::execute(&ctx, cmd),
        Commands::Config(cmd) => commands::config::execute(&ctx, cmd),
    }
}
