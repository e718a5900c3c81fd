//! Statistical Test Dispatcher/Executor
//!
//! Routes a [`TestSpecification`] to one of the procedures named by
//! [`StatisticalTest`] and returns a uniform [`TestResult`].
//!
//! # Dispatch
//!
//! The identifier is parsed into the closed [`StatisticalTest`] enum, its
//! [`VariableArity`](crate::contracts::VariableArity) is checked against the
//! variable list, and the procedure is selected by an exhaustive match. A
//! failure is confined to its own specification: [`TestExecutor::execute_batch`]
//! converts each error into a [`TestOutcome::Failed`] entry and keeps going.
//!
//! # Variable layouts
//!
//! Group procedures (independent two-sample tests, ANOVA, Kruskal-Wallis,
//! Levene, Bartlett, Cohen's d, Hedges' g) accept either one numeric column
//! per group or `[categorical grouping, numeric outcome]`, in which case the
//! outcome is split by the grouping levels.

mod procedures;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::contracts::{
    FailureKind, StatisticalTest, TestFailure, TestOutcome, TestResult, TestSpecification,
};
use crate::dataset::Dataset;
use crate::stats::StatsError;
use crate::telemetry::PipelineTelemetry;

/// Executor errors, one per failed specification.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TestError {
    #[error("Invalid test specification: {0}")]
    InvalidTestSpecification(String),

    #[error("Unknown statistical test: {0}")]
    UnknownTest(String),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Numerical degeneracy: {0}")]
    Degenerate(String),

    #[error("Distribution error: {0}")]
    Distribution(String),

    #[error("Test is not executable: {0}")]
    NotExecutable(String),
}

impl TestError {
    /// Failure class. Data problems surface as specification errors.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Degenerate(_) | Self::Distribution(_) => FailureKind::Numerical,
            Self::InvalidTestSpecification(_)
            | Self::UnknownTest(_)
            | Self::MissingColumn(_)
            | Self::InsufficientData { .. }
            | Self::NotExecutable(_) => FailureKind::Specification,
        }
    }
}

impl From<StatsError> for TestError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::InsufficientData { required, actual } => {
                TestError::InsufficientData { required, actual }
            }
            StatsError::LengthMismatch { left, right } => TestError::InvalidTestSpecification(
                format!("paired variables differ in length ({} vs {})", left, right),
            ),
            StatsError::InvalidShape(message) => TestError::InvalidTestSpecification(message),
            StatsError::Degenerate(message) => TestError::Degenerate(message),
            StatsError::Distribution(message) => TestError::Distribution(message),
        }
    }
}

/// Executes test specifications against a read-only dataset.
#[derive(Debug, Clone)]
pub struct TestExecutor {
    config: EngineConfig,
    telemetry: PipelineTelemetry,
}

impl TestExecutor {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            telemetry: PipelineTelemetry::disabled(),
        }
    }

    pub fn with_telemetry(mut self, telemetry: PipelineTelemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one specification.
    #[instrument(skip(self, dataset, spec), fields(test = %spec.test, variables = ?spec.variables))]
    pub fn execute(&self, dataset: &Dataset, spec: &TestSpecification) -> Result<TestResult, TestError> {
        let test: StatisticalTest = spec
            .test
            .parse()
            .map_err(|_| TestError::UnknownTest(spec.test.clone()))?;

        let arity = test.arity();
        if !arity.accepts(spec.variables.len()) {
            return Err(TestError::InvalidTestSpecification(format!(
                "{} requires {} variable(s), got {}",
                test,
                arity,
                spec.variables.len()
            )));
        }
        if let Some(missing) = spec.variables.iter().find(|v| !dataset.has_column(v)) {
            return Err(TestError::MissingColumn(missing.clone()));
        }

        let result = procedures::run(test, dataset, spec, &self.config)?;
        debug!(
            statistic = result.statistic,
            p_value = ?result.p_value,
            "Test completed"
        );
        Ok(result)
    }

    /// Execute every specification independently. Outcomes are returned in
    /// submission order regardless of parallelism.
    #[instrument(skip(self, dataset, specs), fields(count = specs.len(), parallel = self.config.parallel))]
    pub fn execute_batch(&self, dataset: &Dataset, specs: &[TestSpecification]) -> Vec<TestOutcome> {
        info!("Executing test batch");

        let outcomes: Vec<TestOutcome> = if self.config.parallel {
            specs
                .par_iter()
                .enumerate()
                .map(|(index, spec)| self.outcome(dataset, index, spec))
                .collect()
        } else {
            specs
                .iter()
                .enumerate()
                .map(|(index, spec)| self.outcome(dataset, index, spec))
                .collect()
        };

        let completed = outcomes.iter().filter(|o| o.is_completed()).count();
        info!(
            completed,
            failed = outcomes.len() - completed,
            "Test batch finished"
        );
        outcomes
    }

    fn outcome(&self, dataset: &Dataset, index: usize, spec: &TestSpecification) -> TestOutcome {
        match self.execute(dataset, spec) {
            Ok(result) => {
                self.telemetry.test_completed(&result);
                TestOutcome::Completed(result)
            }
            Err(err) => {
                warn!(
                    index,
                    test = %spec.test,
                    variables = ?spec.variables,
                    error = %err,
                    "Skipping failed test"
                );
                let failure = TestFailure {
                    index,
                    test: spec.test.clone(),
                    variables: spec.variables.clone(),
                    hypothesis_id: spec.hypothesis_id.clone(),
                    kind: err.kind(),
                    error: err.to_string(),
                };
                self.telemetry.test_failed(&failure);
                TestOutcome::Failed(failure)
            }
        }
    }
}

impl Default for TestExecutor {
    fn default() -> Self {
        Self::new()
    }
}
