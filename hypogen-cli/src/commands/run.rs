//! `run`: the full pipeline
//!
//! Generates and ranks hypotheses, validates them against the dataset,
//! executes the testable ones and applies the configured correction.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;

use hypogen_engine::HypothesisPipeline;

use super::{load_dataset, load_summary};
use crate::context::Context;
use crate::output::{
    display_failures, display_hypotheses, display_results, display_skipped, print_field,
    print_section, write_file,
};

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunCommands {
    /// Exploratory summary file (JSON)
    #[arg(short, long)]
    pub summary: Option<PathBuf>,

    /// Read the summary from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Dataset (CSV or JSON)
    #[arg(short, long)]
    pub data: PathBuf,

    /// Write the pipeline report to a file
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Execute the run command
pub fn execute(ctx: &Context, cmd: RunCommands) -> Result<()> {
    let summary = load_summary(cmd.summary.as_ref(), cmd.stdin)?;
    let dataset = load_dataset(&cmd.data)?;

    let report = HypothesisPipeline::with_config(ctx.config.clone())
        .run(&summary, &dataset)
        .context("Pipeline run failed")?;
    let rendered = report.to_json_pretty().context("Failed to serialize pipeline report")?;

    if let Some(path) = &cmd.out {
        write_file(path, &rendered)?;
        ctx.output.success(&format!("Report written to {}", path.display()));
    }

    if ctx.output.is_json() {
        if cmd.out.is_none() {
            println!("{}", rendered);
        }
        return Ok(());
    }

    println!("{}", "hypogen pipeline run".bold().cyan());
    print_field("Run ID", &report.run_id.to_string());

    let hypotheses = &report.hypotheses;
    display_hypotheses(&hypotheses.hypotheses, hypotheses.validations.as_deref());
    display_skipped(&report.skipped);
    display_results(&report.tests.test_results, report.tests.metadata.alpha_level);
    display_failures(&report.tests.failures);

    let significant = report.tests.significant().count();
    print_section("Summary");
    print_field("Hypotheses", &hypotheses.hypotheses.len().to_string());
    print_field("Tests executed", &report.tests.metadata.total_tests_executed.to_string());
    if report.tests.metadata.total_tests_failed > 0 {
        print_field(
            "Tests failed",
            &report.tests.metadata.total_tests_failed.to_string().red().to_string(),
        );
    }
    print_field("Correction", report.tests.metadata.correction_method.as_str());
    print_field("Significant", &significant.to_string().green().to_string());

    Ok(())
}
