//! Hypothesis Generation Engine
//!
//! Turns the output of an exploratory data pass into ranked, falsifiable
//! statistical hypotheses, scores each one for feasibility against the data
//! actually on hand, executes the matching statistical procedures and corrects
//! the resulting p-values for multiple comparisons.
//!
//! # Stages
//!
//! 1. [`generator`]: correlation, comparison, prediction and causal
//!    hypotheses from an [`ExploratorySummary`], filtered and ranked
//! 2. [`validator`]: testability and feasibility scoring, power estimate,
//!    recommendations
//! 3. [`executor`]: dispatch over [`StatisticalTest`] with per-test failure
//!    isolation
//! 4. [`correction`]: Benjamini-Hochberg, Bonferroni or Holm
//!
//! [`pipeline::HypothesisPipeline`] chains the stages. Every component takes
//! an explicit [`EngineConfig`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use hypogen_engine::{Dataset, EngineConfig, ExploratorySummary, HypothesisPipeline};
//!
//! let summary: ExploratorySummary = serde_json::from_str(&summary_json)?;
//! let dataset = Dataset::load("sales.csv")?;
//!
//! let report = HypothesisPipeline::with_config(EngineConfig::load(None)?)
//!     .run(&summary, &dataset)?;
//!
//! for result in report.tests.significant() {
//!     println!("{}: {:?}", result.test_name, result.corrected_p_value);
//! }
//! ```
//!
//! # Modules
//!
//! - [`dataset`]: column-addressable tabular data with missing values
//! - [`contracts`]: hypotheses, validations, specifications, results, exports
//! - [`stats`]: numeric kernels behind the executor
//! - [`config`]: [`EngineConfig`] with file and environment loading
//! - [`telemetry`]: tracing events and metrics counters

#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod contracts;
pub mod correction;
pub mod dataset;
pub mod executor;
pub mod generator;
pub mod pipeline;
pub mod stats;
pub mod telemetry;
pub mod validator;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig, FocusArea};
pub use contracts::{
    ExploratorySummary, Hypothesis, HypothesisExport, HypothesisValidation, StatisticalTest,
    TestBatchExport, TestFailure, TestOutcome, TestResult, TestSpecification,
};
pub use correction::{apply_correction, CorrectionMethod};
pub use dataset::{Column, ColumnType, Dataset, DatasetError};
pub use executor::{TestError, TestExecutor};
pub use generator::HypothesisGenerator;
pub use pipeline::{HypothesisPipeline, PipelineError, PipelineReport, SkippedHypothesis};
pub use telemetry::PipelineTelemetry;
pub use validator::HypothesisValidator;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
