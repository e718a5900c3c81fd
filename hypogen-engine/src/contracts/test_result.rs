//! Test specifications, results and per-item failures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::hypothesis::{ExpectedDirection, Hypothesis};
use super::statistical_test::StatisticalTest;

/// Parameter key selecting a [`GroupLayout`].
pub const LAYOUT_PARAM: &str = "layout";

/// How the variables of a group comparison map onto groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupLayout {
    /// `[grouping, outcome]`: the outcome split by the grouping levels,
    /// whether the grouping column is categorical or numeric-coded
    Grouped,
    /// One numeric column per group
    Columns,
}

impl GroupLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grouped => "grouped",
            Self::Columns => "columns",
        }
    }
}

/// Request to run one procedure over named columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSpecification {
    /// Test identifier, e.g. `pearson_correlation`. Parsed at execution so an
    /// unknown name fails only its own entry.
    pub test: String,

    pub variables: Vec<String>,

    /// Procedure parameters, e.g. `{"lags": 20}` for Ljung-Box
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,

    /// Originating hypothesis, when built by the pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hypothesis_id: Option<String>,
}

impl TestSpecification {
    pub fn new(test: impl Into<String>, variables: Vec<String>) -> Self {
        Self {
            test: test.into(),
            variables,
            params: None,
            hypothesis_id: None,
        }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Set the group layout, keeping any other parameters.
    pub fn with_layout(mut self, layout: GroupLayout) -> Self {
        let mut params = match self.params.take() {
            Some(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        params.insert(
            LAYOUT_PARAM.to_string(),
            serde_json::Value::String(layout.as_str().to_string()),
        );
        self.params = Some(serde_json::Value::Object(params));
        self
    }

    /// Specification that tests a hypothesis as stated. Group differences
    /// name `[grouping, outcome]`, so they run in the grouped layout even
    /// when the grouping column is numeric-coded.
    pub fn from_hypothesis(hypothesis: &Hypothesis) -> Self {
        let spec = Self {
            test: hypothesis.statistical_test.as_str().to_string(),
            variables: hypothesis.variables.clone(),
            params: None,
            hypothesis_id: Some(hypothesis.id.clone()),
        };

        let grouped = hypothesis.expected_direction == ExpectedDirection::Difference
            && hypothesis.variables.len() == 2
            && hypothesis.statistical_test.accepts_grouped_layout();
        if grouped {
            spec.with_layout(GroupLayout::Grouped)
        } else {
            spec
        }
    }

    /// Positive integer parameter, if present.
    pub fn usize_param(&self, key: &str) -> Option<u64> {
        self.params.as_ref()?.get(key)?.as_u64()
    }
}

/// Confidence interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub level: f64,
}

/// Outcome of one executed procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Human-readable procedure name
    pub test_name: String,

    /// Procedure identifier
    pub test: StatisticalTest,

    pub statistic: f64,

    /// Absent for pure effect-size calculations
    pub p_value: Option<f64>,

    pub variables: Vec<String>,

    /// Per-group or per-variable observation counts
    pub sample_sizes: Vec<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect_size: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_interval: Option<ConfidenceInterval>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assumptions_met: Option<BTreeMap<String, bool>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,

    /// Filled in by the corrector
    #[serde(default)]
    pub corrected_p_value: Option<f64>,
}

impl TestResult {
    pub fn new(test: StatisticalTest, variables: &[String], statistic: f64) -> Self {
        Self {
            test_name: test.display_name().to_string(),
            test,
            statistic,
            p_value: None,
            variables: variables.to_vec(),
            sample_sizes: Vec::new(),
            effect_size: None,
            confidence_interval: None,
            assumptions_met: None,
            interpretation: None,
            corrected_p_value: None,
        }
    }

    pub fn with_p_value(mut self, p_value: f64) -> Self {
        self.p_value = Some(p_value.clamp(0.0, 1.0));
        self
    }

    pub fn with_sample_sizes(mut self, sample_sizes: Vec<usize>) -> Self {
        self.sample_sizes = sample_sizes;
        self
    }

    pub fn with_effect_size(mut self, effect_size: f64) -> Self {
        self.effect_size = Some(effect_size);
        self
    }

    pub fn with_confidence_interval(mut self, interval: ConfidenceInterval) -> Self {
        self.confidence_interval = Some(interval);
        self
    }

    pub fn with_assumptions(mut self, assumptions: BTreeMap<String, bool>) -> Self {
        self.assumptions_met = Some(assumptions);
        self
    }

    pub fn with_interpretation(mut self, interpretation: impl Into<String>) -> Self {
        self.interpretation = Some(interpretation.into());
        self
    }

    /// Significance at `alpha`, preferring the corrected p-value.
    pub fn is_significant(&self, alpha: f64) -> Option<bool> {
        self.corrected_p_value.or(self.p_value).map(|p| p < alpha)
    }
}

/// Failure class of a single test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Bad identifier, wrong variable count, missing column or too little data
    Specification,
    /// Zero variance, singular table or matrix
    Numerical,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Specification => write!(f, "specification"),
            Self::Numerical => write!(f, "numerical"),
        }
    }
}

/// A test that could not produce a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestFailure {
    /// Position in the submitted batch
    pub index: usize,
    pub test: String,
    pub variables: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hypothesis_id: Option<String>,
    pub kind: FailureKind,
    pub error: String,
}

/// Per-item batch outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestOutcome {
    Completed(TestResult),
    Failed(TestFailure),
}

impl TestOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Split outcomes into results and failures, each in submission order.
pub fn partition_outcomes(outcomes: Vec<TestOutcome>) -> (Vec<TestResult>, Vec<TestFailure>) {
    let mut results = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            TestOutcome::Completed(result) => results.push(result),
            TestOutcome::Failed(failure) => failures.push(failure),
        }
    }
    (results, failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specification_params() {
        let spec = TestSpecification::new("ljung_box", vec!["sales".into()])
            .with_params(serde_json::json!({"lags": 12}));
        assert_eq!(spec.usize_param("lags"), Some(12));
        assert_eq!(spec.usize_param("missing"), None);
    }

    #[test]
    fn test_with_layout_keeps_params() {
        let spec = TestSpecification::new("anova_one_way", vec!["region".into(), "sales".into()])
            .with_params(serde_json::json!({"lags": 3}))
            .with_layout(GroupLayout::Grouped);
        let params = spec.params.unwrap();
        assert_eq!(params["layout"], "grouped");
        assert_eq!(params["lags"], 3);
    }

    #[test]
    fn test_is_significant_prefers_corrected() {
        let mut result = TestResult::new(StatisticalTest::PearsonCorrelation, &[], 0.5)
            .with_p_value(0.03);
        assert_eq!(result.is_significant(0.05), Some(true));

        result.corrected_p_value = Some(0.09);
        assert_eq!(result.is_significant(0.05), Some(false));

        let effect = TestResult::new(StatisticalTest::CohensD, &[], 0.4);
        assert_eq!(effect.is_significant(0.05), None);
    }

    #[test]
    fn test_partition_preserves_order() {
        let outcomes = vec![
            TestOutcome::Completed(TestResult::new(StatisticalTest::ShapiroWilk, &[], 0.9)),
            TestOutcome::Failed(TestFailure {
                index: 1,
                test: "bogus".into(),
                variables: vec![],
                hypothesis_id: None,
                kind: FailureKind::Specification,
                error: "unknown".into(),
            }),
            TestOutcome::Completed(TestResult::new(StatisticalTest::JarqueBera, &[], 1.2)),
        ];

        let (results, failures) = partition_outcomes(outcomes);
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].test, StatisticalTest::JarqueBera);
        assert_eq!(failures[0].index, 1);
    }

    #[test]
    fn test_outcome_serialization_is_tagged() {
        let outcome =
            TestOutcome::Completed(TestResult::new(StatisticalTest::KendallTau, &[], 0.1));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["test_name"], "Kendall's Tau Correlation");
    }
}
