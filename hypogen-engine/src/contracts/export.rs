//! Serializable export records for downstream reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::hypothesis::{Hypothesis, HypothesisValidation};
use super::test_result::{TestFailure, TestResult};
use crate::config::{EngineConfig, FocusArea};
use crate::correction::CorrectionMethod;

/// Feasibility score above which a validation counts as high feasibility.
pub const HIGH_FEASIBILITY_THRESHOLD: f64 = 0.8;

/// SHA-256 hex digest of the JSON serialization of `inputs`.
pub fn compute_inputs_hash<T: Serialize>(inputs: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(inputs)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub timestamp: DateTime<Utc>,
    pub total_generated: usize,
    pub focus_areas: Vec<FocusArea>,
    pub config: EngineConfig,
    /// Digest of the summary and configuration the hypotheses came from
    pub inputs_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_validated: usize,
    pub testable_count: usize,
    pub high_feasibility_count: usize,
}

impl ValidationSummary {
    pub fn from_validations(validations: &[HypothesisValidation]) -> Self {
        Self {
            total_validated: validations.len(),
            testable_count: validations.iter().filter(|v| v.is_testable).count(),
            high_feasibility_count: validations
                .iter()
                .filter(|v| v.feasibility_score > HIGH_FEASIBILITY_THRESHOLD)
                .count(),
        }
    }
}

/// Ranked hypotheses with optional validations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisExport {
    pub hypotheses: Vec<Hypothesis>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validations: Option<Vec<HypothesisValidation>>,

    pub generation_metadata: GenerationMetadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_summary: Option<ValidationSummary>,
}

impl HypothesisExport {
    pub fn new(hypotheses: Vec<Hypothesis>, config: &EngineConfig, inputs_hash: String) -> Self {
        Self {
            generation_metadata: GenerationMetadata {
                timestamp: Utc::now(),
                total_generated: hypotheses.len(),
                focus_areas: config.focus_areas.clone(),
                config: config.clone(),
                inputs_hash,
            },
            hypotheses,
            validations: None,
            validation_summary: None,
        }
    }

    pub fn with_validations(mut self, validations: Vec<HypothesisValidation>) -> Self {
        self.validation_summary = Some(ValidationSummary::from_validations(&validations));
        self.validations = Some(validations);
        self
    }

    pub fn validation_for(&self, hypothesis_id: &str) -> Option<&HypothesisValidation> {
        self.validations
            .as_ref()?
            .iter()
            .find(|v| v.hypothesis_id == hypothesis_id)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// One row per hypothesis. Lists are joined with `; `.
    pub fn to_csv(&self) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "id",
            "statement",
            "variables",
            "statistical_test",
            "expected_direction",
            "expected_effect_size",
            "confidence",
            "priority",
            "testability_score",
            "is_testable",
            "feasibility_score",
            "recommendations",
        ])?;

        for hypothesis in &self.hypotheses {
            let validation = self.validation_for(&hypothesis.id);
            writer.write_record([
                hypothesis.id.clone(),
                hypothesis.statement.clone(),
                hypothesis.variables.join("; "),
                hypothesis.statistical_test.to_string(),
                enum_label(&hypothesis.expected_direction),
                hypothesis.expected_effect_size.to_string(),
                format!("{:.3}", hypothesis.confidence),
                hypothesis
                    .priority
                    .as_ref()
                    .map(enum_label)
                    .unwrap_or_default(),
                hypothesis
                    .testability_score
                    .map(|s| format!("{:.3}", s))
                    .unwrap_or_default(),
                validation
                    .map(|v| v.is_testable.to_string())
                    .unwrap_or_default(),
                validation
                    .map(|v| format!("{:.3}", v.feasibility_score))
                    .unwrap_or_default(),
                validation
                    .map(|v| v.recommendations.join("; "))
                    .unwrap_or_default(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn enum_label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    pub total_tests_executed: usize,
    pub total_tests_failed: usize,
    pub alpha_level: f64,
    pub correction_method: CorrectionMethod,
    pub execution_timestamp: DateTime<Utc>,
}

/// Corrected test results with failures and execution metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestBatchExport {
    pub test_results: Vec<TestResult>,
    pub failures: Vec<TestFailure>,
    pub metadata: ExecutionMetadata,
}

impl TestBatchExport {
    pub fn new(
        test_results: Vec<TestResult>,
        failures: Vec<TestFailure>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            metadata: ExecutionMetadata {
                total_tests_executed: test_results.len(),
                total_tests_failed: failures.len(),
                alpha_level: config.alpha_level,
                correction_method: config.correction_method,
                execution_timestamp: Utc::now(),
            },
            test_results,
            failures,
        }
    }

    /// Results significant at the configured alpha after correction.
    pub fn significant(&self) -> impl Iterator<Item = &TestResult> {
        let alpha = self.metadata.alpha_level;
        self.test_results
            .iter()
            .filter(move |r| r.is_significant(alpha) == Some(true))
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
