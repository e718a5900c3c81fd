//! CLI command implementations

pub mod config;
pub mod generate;
pub mod run;

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use hypogen_engine::{Dataset, ExploratorySummary};

/// Read input from file or stdin
fn read_input(file: Option<&Path>, use_stdin: bool) -> Result<String> {
    if use_stdin {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else if let Some(path) = file {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))
    } else {
        anyhow::bail!("Either --summary or --stdin must be provided")
    }
}

/// Parse the exploratory summary from `--summary` or `--stdin`.
fn load_summary(file: Option<&PathBuf>, use_stdin: bool) -> Result<ExploratorySummary> {
    let json = read_input(file.map(PathBuf::as_path), use_stdin)?;
    serde_json::from_str(&json).context("Failed to parse exploratory summary JSON")
}

fn load_dataset(path: &Path) -> Result<Dataset> {
    let dataset = Dataset::load(path)
        .with_context(|| format!("Failed to load dataset from {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        rows = dataset.row_count(),
        columns = dataset.column_count(),
        "Loaded dataset"
    );
    Ok(dataset)
}
