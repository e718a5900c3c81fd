//! `config`: inspect the effective engine configuration

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};

use crate::context::Context;
use crate::output::{print_field, print_section};

#[derive(Debug, Args)]
pub struct ConfigCommands {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show the configuration after file and environment overrides
    Show,
}

/// Execute config commands
pub fn execute(ctx: &Context, cmd: ConfigCommands) -> Result<()> {
    match cmd.command {
        ConfigSubcommand::Show => show(ctx),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    if ctx.output.is_json() {
        let json = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        println!("{}", json);
        return Ok(());
    }

    let focus: Vec<String> = config.focus_areas.iter().map(ToString::to_string).collect();

    print_section("Engine Configuration");
    print_field("max_hypotheses", &config.max_hypotheses.to_string());
    print_field("min_confidence", &config.min_confidence.to_string());
    print_field("focus_areas", &focus.join(", "));
    print_field("alpha_level", &config.alpha_level.to_string());
    print_field("min_sample_size", &config.min_sample_size.to_string());
    print_field("power_threshold", &config.power_threshold.to_string());
    print_field("correction_method", config.correction_method.as_str());
    print_field("validate_hypotheses", &config.validate_hypotheses.to_string());
    print_field("ljung_box_lags", &config.ljung_box_lags.to_string());
    print_field("shapiro_max_samples", &config.shapiro_max_samples.to_string());
    print_field("random_seed", &config.random_seed.to_string());
    print_field("parallel", &config.parallel.to_string());

    Ok(())
}
