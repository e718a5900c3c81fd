//! Shared command context

use anyhow::{Context as _, Result};
use hypogen_engine::EngineConfig;

use crate::cli::Cli;
use crate::output::Output;

/// State shared by every command.
pub struct Context {
    pub config: EngineConfig,
    pub output: Output,
}

impl Context {
    pub fn new(cli: &Cli) -> Result<Self> {
        if cli.no_color {
            colored::control::set_override(false);
        }

        let config = EngineConfig::load(cli.config_file.as_deref()).with_context(|| {
            match &cli.config_file {
                Some(path) => format!("Failed to load configuration from {}", path.display()),
                None => "Failed to load configuration from environment".to_string(),
            }
        })?;

        Ok(Self {
            config,
            output: Output::new(cli.output, cli.verbose),
        })
    }
}
