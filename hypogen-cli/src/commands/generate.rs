//! `generate`: ranked hypotheses from an exploratory summary
//!
//! ```bash
//! hypogen generate --summary eda.json --data sales.csv --validate
//! cat eda.json | hypogen generate --stdin --format csv --out hypotheses.csv
//! ```

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Args, ValueEnum};

use hypogen_engine::contracts::compute_inputs_hash;
use hypogen_engine::{HypothesisExport, HypothesisGenerator, HypothesisValidator};

use super::{load_dataset, load_summary};
use crate::context::Context;
use crate::output::{display_hypotheses, display_validation_summary, write_file};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

/// Arguments for the generate command
#[derive(Args, Debug)]
pub struct GenerateCommands {
    /// Exploratory summary file (JSON)
    #[arg(short, long)]
    pub summary: Option<PathBuf>,

    /// Read the summary from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Dataset used for testability scoring and prediction hypotheses (CSV or JSON)
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Attach a feasibility validation to every hypothesis
    #[arg(long)]
    pub validate: bool,

    /// Export format
    #[arg(long, value_enum, default_value = "json")]
    pub format: ExportFormat,

    /// Write the export to a file
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Execute the generate command
pub fn execute(ctx: &Context, cmd: GenerateCommands) -> Result<()> {
    let summary = load_summary(cmd.summary.as_ref(), cmd.stdin)?;
    let dataset = cmd.data.as_deref().map(load_dataset).transpose()?;
    if dataset.is_none() {
        ctx.output
            .info("No dataset given; testability defaults apply and prediction hypotheses are skipped");
    }

    let hypotheses = HypothesisGenerator::with_config(ctx.config.clone()).generate(&summary, dataset.as_ref());
    let inputs_hash =
        compute_inputs_hash(&(&summary, &ctx.config)).context("Failed to hash generation inputs")?;

    let mut export = HypothesisExport::new(hypotheses, &ctx.config, inputs_hash);
    if cmd.validate {
        let validations = HypothesisValidator::with_config(ctx.config.clone())
            .validate_all(&export.hypotheses, dataset.as_ref());
        export = export.with_validations(validations);
    }

    let rendered = match cmd.format {
        ExportFormat::Json => export.to_json_pretty().context("Failed to serialize hypotheses")?,
        ExportFormat::Csv => export.to_csv().context("Failed to write hypotheses as CSV")?,
    };

    match &cmd.out {
        Some(path) => {
            write_file(path, &rendered)?;
            ctx.output.success(&format!(
                "{} hypotheses written to {}",
                export.hypotheses.len(),
                path.display()
            ));
            if !ctx.output.is_json() {
                display(&export);
            }
        }
        None if ctx.output.is_json() || cmd.format == ExportFormat::Csv => println!("{}", rendered),
        None => display(&export),
    }

    Ok(())
}

fn display(export: &HypothesisExport) {
    display_hypotheses(&export.hypotheses, export.validations.as_deref());
    if let Some(summary) = &export.validation_summary {
        display_validation_summary(summary);
    }
}
