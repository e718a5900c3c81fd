//! Terminal rendering
//!
//! Status messages go to stderr so that `--output json` leaves stdout as a
//! single JSON document.

use std::path::Path;

use anyhow::{Context as _, Result};
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Cell, Color, Table};

use hypogen_engine::contracts::{Priority, TestFailure, ValidationSummary};
use hypogen_engine::{Hypothesis, HypothesisValidation, SkippedHypothesis, TestResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Message sink for commands.
pub struct Output {
    pub format: OutputFormat,
    pub verbose: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green().bold(), message);
    }

    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "!".yellow().bold(), message);
    }

    pub fn info(&self, message: &str) {
        if self.verbose {
            eprintln!("{}", message.dimmed());
        }
    }
}

pub fn print_section(title: &str) {
    println!("\n{}", title.bold().cyan());
    println!("{}", "=".repeat(50));
}

pub fn print_field(name: &str, value: &str) {
    println!("  {:<24} {}", format!("{}:", name).bold(), value);
}

/// Write `contents` to `path`.
pub fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write output to {}", path.display()))
}

fn header(names: &[&str]) -> Vec<Cell> {
    names.iter().map(|n| Cell::new(n).fg(Color::Cyan)).collect()
}

fn format_p(p: Option<f64>) -> String {
    match p {
        Some(p) if p < 1e-4 => format!("{:.2e}", p),
        Some(p) => format!("{:.4}", p),
        None => "-".to_string(),
    }
}

fn priority_cell(priority: Option<Priority>) -> Cell {
    match priority {
        Some(Priority::High) => Cell::new("high").fg(Color::Green),
        Some(Priority::Medium) => Cell::new("medium").fg(Color::Yellow),
        Some(Priority::Low) => Cell::new("low").fg(Color::Red),
        None => Cell::new("-"),
    }
}

pub fn display_hypotheses(hypotheses: &[Hypothesis], validations: Option<&[HypothesisValidation]>) {
    print_section("Hypotheses");

    let mut table = Table::new();
    let mut columns = vec!["ID", "Test", "Confidence", "Testability", "Priority"];
    if validations.is_some() {
        columns.extend(["Feasibility", "Testable"]);
    }
    table.set_header(header(&columns));

    for hypothesis in hypotheses {
        let mut row = vec![
            Cell::new(&hypothesis.id),
            Cell::new(hypothesis.statistical_test.as_str()),
            Cell::new(format!("{:.2}", hypothesis.confidence)),
            Cell::new(
                hypothesis
                    .testability_score
                    .map(|t| format!("{:.2}", t))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            priority_cell(hypothesis.priority),
        ];
        if let Some(validations) = validations {
            match validations.iter().find(|v| v.hypothesis_id == hypothesis.id) {
                Some(v) => {
                    row.push(Cell::new(format!("{:.2}", v.feasibility_score)));
                    row.push(if v.is_testable {
                        Cell::new("yes").fg(Color::Green)
                    } else {
                        Cell::new("no").fg(Color::Red)
                    });
                }
                None => row.extend([Cell::new("-"), Cell::new("-")]),
            }
        }
        table.add_row(row);
    }

    println!("{}", table);
}

pub fn display_validation_summary(summary: &ValidationSummary) {
    print_section("Validation Summary");
    print_field("Validated", &summary.total_validated.to_string());
    print_field("Testable", &summary.testable_count.to_string());
    print_field("High feasibility", &summary.high_feasibility_count.to_string());
}

pub fn display_results(results: &[TestResult], alpha: f64) {
    print_section("Test Results");

    let mut table = Table::new();
    table.set_header(header(&[
        "Test",
        "Variables",
        "Statistic",
        "p",
        "Corrected p",
        "Effect",
        "Significant",
    ]));

    for result in results {
        let significant = match result.is_significant(alpha) {
            Some(true) => Cell::new("yes").fg(Color::Green),
            Some(false) => Cell::new("no"),
            None => Cell::new("-"),
        };
        table.add_row(vec![
            Cell::new(&result.test_name),
            Cell::new(result.variables.join(", ")),
            Cell::new(format!("{:.4}", result.statistic)),
            Cell::new(format_p(result.p_value)),
            Cell::new(format_p(result.corrected_p_value)),
            Cell::new(
                result
                    .effect_size
                    .map(|e| format!("{:.3}", e))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            significant,
        ]);
    }

    println!("{}", table);
}

pub fn display_failures(failures: &[TestFailure]) {
    if failures.is_empty() {
        return;
    }
    print_section("Failed Tests");

    let mut table = Table::new();
    table.set_header(header(&["#", "Test", "Variables", "Kind", "Error"]));
    for failure in failures {
        table.add_row(vec![
            Cell::new(failure.index),
            Cell::new(&failure.test),
            Cell::new(failure.variables.join(", ")),
            Cell::new(failure.kind.to_string()).fg(Color::Red),
            Cell::new(&failure.error),
        ]);
    }

    println!("{}", table);
}

pub fn display_skipped(skipped: &[SkippedHypothesis]) {
    if skipped.is_empty() {
        return;
    }
    print_section("Skipped Hypotheses");
    for entry in skipped {
        println!("  {} - {}", entry.hypothesis_id.yellow(), entry.reason);
    }
}
