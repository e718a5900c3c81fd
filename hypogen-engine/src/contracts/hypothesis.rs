//! Hypothesis and validation records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::statistical_test::StatisticalTest;
use crate::dataset::ColumnType;

/// Direction of the effect a hypothesis predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedDirection {
    Positive,
    Negative,
    Difference,
    Prediction,
    None,
}

/// Qualitative effect magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectMagnitude {
    Small,
    Medium,
    Large,
}

impl std::fmt::Display for EffectMagnitude {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Small => write!(f, "small"),
            Self::Medium => write!(f, "medium"),
            Self::Large => write!(f, "large"),
        }
    }
}

/// Ranking priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// A falsifiable statistical hypothesis.
///
/// Created by the generator, annotated with `testability_score` and
/// `priority` during ranking, and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_variable_types"))]
pub struct Hypothesis {
    /// Stable slug, e.g. `corr_pos_price_demand`
    #[validate(length(min = 1))]
    pub id: String,

    pub statement: String,

    pub null_hypothesis: String,

    pub alternative_hypothesis: String,

    /// Ordered column names
    #[validate(length(min = 1))]
    pub variables: Vec<String>,

    pub variable_types: BTreeMap<String, ColumnType>,

    pub statistical_test: StatisticalTest,

    pub expected_direction: ExpectedDirection,

    pub expected_effect_size: EffectMagnitude,

    pub rationale: String,

    #[serde(default)]
    pub supporting_evidence: Vec<String>,

    /// Provisional confidence set at generation time
    #[validate(range(min = 0.0, max = 1.0))]
    pub confidence: f64,

    /// Set by ranking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    /// Set by ranking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testability_score: Option<f64>,

    pub business_relevance: String,
}

impl Hypothesis {
    /// Ranking key: `confidence × testability_score`.
    pub fn ranking_score(&self) -> f64 {
        self.confidence * self.testability_score.unwrap_or(0.0)
    }
}

fn validate_variable_types(hypothesis: &Hypothesis) -> Result<(), ValidationError> {
    let consistent = hypothesis.variable_types.len() == hypothesis.variables.len()
        && hypothesis
            .variables
            .iter()
            .all(|v| hypothesis.variable_types.contains_key(v));

    if consistent {
        Ok(())
    } else {
        Err(ValidationError::new("variable_types_mismatch"))
    }
}

/// Feasibility assessment of one hypothesis against a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisValidation {
    pub hypothesis_id: String,

    pub is_testable: bool,

    /// Column → present in dataset
    pub data_availability: BTreeMap<String, bool>,

    /// Estimated power; absent when no dataset was supplied
    pub statistical_power: Option<f64>,

    pub sample_size_adequacy: bool,

    /// Assumption name → passed
    pub assumption_checks: BTreeMap<String, bool>,

    pub feasibility_score: f64,

    pub recommendations: Vec<String>,
}

impl HypothesisValidation {
    /// Columns referenced by the hypothesis that the dataset lacks.
    pub fn missing_variables(&self) -> Vec<&str> {
        self.data_availability
            .iter()
            .filter(|(_, available)| !**available)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_hypothesis() -> Hypothesis {
        Hypothesis {
            id: "corr_pos_a_b".into(),
            statement: "a is positively correlated with b".into(),
            null_hypothesis: "no correlation".into(),
            alternative_hypothesis: "positive correlation".into(),
            variables: vec!["a".into(), "b".into()],
            variable_types: BTreeMap::from([
                ("a".to_string(), ColumnType::Numeric),
                ("b".to_string(), ColumnType::Numeric),
            ]),
            statistical_test: StatisticalTest::PearsonCorrelation,
            expected_direction: ExpectedDirection::Positive,
            expected_effect_size: EffectMagnitude::Large,
            rationale: "strong correlation".into(),
            supporting_evidence: vec![],
            confidence: 0.8,
            priority: None,
            testability_score: None,
            business_relevance: "planning".into(),
        }
    }

    #[test]
    fn test_valid_hypothesis() {
        assert!(create_test_hypothesis().validate().is_ok());
    }

    #[test]
    fn test_empty_variables_rejected() {
        let mut hypothesis = create_test_hypothesis();
        hypothesis.variables.clear();
        hypothesis.variable_types.clear();
        assert!(hypothesis.validate().is_err());
    }

    #[test]
    fn test_mismatched_variable_types_rejected() {
        let mut hypothesis = create_test_hypothesis();
        hypothesis.variable_types.remove("b");
        assert!(hypothesis.validate().is_err());
    }

    #[test]
    fn test_ranking_score_defaults_to_zero_before_ranking() {
        let mut hypothesis = create_test_hypothesis();
        assert_eq!(hypothesis.ranking_score(), 0.0);
        hypothesis.testability_score = Some(0.5);
        assert!((hypothesis.ranking_score() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_unranked_fields_are_omitted() {
        let json = serde_json::to_value(create_test_hypothesis()).unwrap();
        assert!(json.get("priority").is_none());
        assert_eq!(json["statistical_test"], "pearson_correlation");
        assert_eq!(json["variable_types"]["a"], "numeric");
    }
}
