//! Pipeline Orchestrator
//!
//! Runs generate → rank → validate → execute → correct over one summary and
//! one dataset, and packages the outcome as a [`PipelineReport`].
//!
//! Only configuration problems and an empty dataset abort a run. Every other
//! failure is confined to one hypothesis (recorded in
//! [`PipelineReport::skipped`]) or one test (recorded in
//! [`TestBatchExport::failures`]).

use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::config::{ConfigError, EngineConfig};
use crate::contracts::{
    compute_inputs_hash, partition_outcomes, ExploratorySummary, Hypothesis, HypothesisExport,
    HypothesisValidation, TestBatchExport, TestSpecification,
};
use crate::correction::apply_correction;
use crate::dataset::{Dataset, DatasetError};
use crate::executor::TestExecutor;
use crate::generator::HypothesisGenerator;
use crate::telemetry::PipelineTelemetry;
use crate::validator::HypothesisValidator;

/// Errors that abort a whole pipeline call.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Dataset has no rows")]
    EmptyDataset,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<validator::ValidationErrors> for PipelineError {
    fn from(err: validator::ValidationErrors) -> Self {
        PipelineError::Config(ConfigError::from(err))
    }
}

/// A ranked hypothesis that was not turned into a test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedHypothesis {
    pub hypothesis_id: String,
    pub reason: String,
}

/// Output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub hypotheses: HypothesisExport,
    pub tests: TestBatchExport,
    #[serde(default)]
    pub skipped: Vec<SkippedHypothesis>,
}

impl PipelineReport {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// End-to-end hypothesis pipeline.
#[derive(Debug, Clone)]
pub struct HypothesisPipeline {
    config: EngineConfig,
}

impl HypothesisPipeline {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load the dataset from `path`, then [`run`](Self::run).
    pub fn run_with_path(
        &self,
        summary: &ExploratorySummary,
        path: impl AsRef<Path>,
    ) -> Result<PipelineReport, PipelineError> {
        let dataset = Dataset::load(path)?;
        self.run(summary, &dataset)
    }

    /// Run every stage.
    #[instrument(skip(self, summary, dataset), fields(rows = dataset.row_count(), columns = dataset.column_count()))]
    pub fn run(&self, summary: &ExploratorySummary, dataset: &Dataset) -> Result<PipelineReport, PipelineError> {
        let telemetry = PipelineTelemetry::new(Uuid::new_v4());
        let start = Instant::now();

        match self.run_stages(summary, dataset, &telemetry) {
            Ok(report) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                telemetry.run_completed(
                    elapsed_ms,
                    report.tests.metadata.total_tests_executed,
                    report.tests.metadata.total_tests_failed,
                );
                info!(
                    run_id = %report.run_id,
                    hypotheses = report.hypotheses.hypotheses.len(),
                    executed = report.tests.metadata.total_tests_executed,
                    failed = report.tests.metadata.total_tests_failed,
                    skipped = report.skipped.len(),
                    elapsed_ms,
                    "Pipeline run complete"
                );
                Ok(report)
            }
            Err(err) => {
                telemetry.run_failed(&err.to_string());
                Err(err)
            }
        }
    }

    fn run_stages(
        &self,
        summary: &ExploratorySummary,
        dataset: &Dataset,
        telemetry: &PipelineTelemetry,
    ) -> Result<PipelineReport, PipelineError> {
        self.config.validate()?;
        if dataset.is_empty() {
            return Err(PipelineError::EmptyDataset);
        }
        telemetry.run_started(dataset.row_count(), dataset.column_count());

        let inputs_hash = compute_inputs_hash(&(summary, &self.config))?;

        let hypotheses = HypothesisGenerator::with_config(self.config.clone()).generate(summary, Some(dataset));
        telemetry.hypotheses_generated(hypotheses.len());

        let validations = if self.config.validate_hypotheses {
            let validations = HypothesisValidator::with_config(self.config.clone())
                .validate_all(&hypotheses, Some(dataset));
            for validation in &validations {
                telemetry.hypothesis_validated(
                    &validation.hypothesis_id,
                    validation.is_testable,
                    validation.feasibility_score,
                );
            }
            Some(validations)
        } else {
            None
        };

        let (specs, skipped) = plan_tests(&hypotheses, validations.as_deref());
        info!(
            planned = specs.len(),
            skipped = skipped.len(),
            "Planned statistical tests"
        );

        let tests = self.execute_with(dataset, &specs, telemetry);

        let export = HypothesisExport::new(hypotheses, &self.config, inputs_hash);
        let export = match validations {
            Some(validations) => export.with_validations(validations),
            None => export,
        };

        Ok(PipelineReport {
            run_id: telemetry.run_id(),
            hypotheses: export,
            tests,
            skipped,
        })
    }

    /// Execute and correct a batch of specifications without generation.
    pub fn execute_tests(&self, dataset: &Dataset, specs: &[TestSpecification]) -> TestBatchExport {
        self.execute_with(dataset, specs, &PipelineTelemetry::default())
    }

    fn execute_with(
        &self,
        dataset: &Dataset,
        specs: &[TestSpecification],
        telemetry: &PipelineTelemetry,
    ) -> TestBatchExport {
        let executor = TestExecutor::with_config(self.config.clone()).with_telemetry(telemetry.clone());
        let (mut results, failures) = partition_outcomes(executor.execute_batch(dataset, specs));

        let corrected = apply_correction(&mut results, self.config.correction_method);
        telemetry.correction_applied(self.config.correction_method, corrected);

        TestBatchExport::new(results, failures, &self.config)
    }
}

impl Default for HypothesisPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Specifications for hypotheses that are testable and executable, plus the
/// hypotheses left out.
fn plan_tests(
    hypotheses: &[Hypothesis],
    validations: Option<&[HypothesisValidation]>,
) -> (Vec<TestSpecification>, Vec<SkippedHypothesis>) {
    let mut specs = Vec::new();
    let mut skipped = Vec::new();

    for hypothesis in hypotheses {
        let validation = validations
            .and_then(|all| all.iter().find(|v| v.hypothesis_id == hypothesis.id));

        let reason = match validation {
            Some(v) if !v.is_testable => Some(format!(
                "not testable (feasibility {:.2})",
                v.feasibility_score
            )),
            _ if !hypothesis.statistical_test.is_executable() => Some(format!(
                "{} has no automated procedure",
                hypothesis.statistical_test
            )),
            _ => None,
        };

        match reason {
            Some(reason) => skipped.push(SkippedHypothesis {
                hypothesis_id: hypothesis.id.clone(),
                reason,
            }),
            None => specs.push(TestSpecification::from_hypothesis(hypothesis)),
        }
    }

    (specs, skipped)
}
