//! Hypothesis Feasibility Validator
//!
//! Scores hypotheses against the dataset actually available.
//!
//! # Scores
//!
//! - **Testability** ([`HypothesisValidator::testability_score`]) is a
//!   multiplicative score used for ranking. It penalizes missing columns,
//!   heavy missingness and small complete-case samples, and rewards simple
//!   two-variable hypotheses with ample data.
//! - **Feasibility** ([`HypothesisValidator::validate`]) is a weighted blend
//!   of data availability, sample adequacy, estimated power and assumption
//!   checks. It decides `is_testable`.
//!
//! # Approximations
//!
//! Every weight, threshold and power value below is a coarse heuristic. Power
//! is a step lookup keyed by complete-case sample size and test family, not a
//! power analysis, and the assumption checks are placeholders that pass until
//! the executor tests them on real data. Replace [`CORRELATION_POWER`] and
//! [`GROUP_COMPARISON_POWER`] with a proper power routine before relying on
//! the feasibility score for study design.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::config::EngineConfig;
use crate::contracts::{Hypothesis, HypothesisValidation, StatisticalTest, TestFamily};
use crate::dataset::Dataset;

// ============================================================================
// Testability constants
// ============================================================================

/// Multiplier per referenced column missing from the dataset.
pub const MISSING_VARIABLE_PENALTY: f64 = 0.3;

/// Missing-value ratio above which [`HIGH_MISSINGNESS_PENALTY`] applies.
pub const HIGH_MISSINGNESS_RATIO: f64 = 0.3;
pub const HIGH_MISSINGNESS_PENALTY: f64 = 0.7;

/// Missing-value ratio above which [`MODERATE_MISSINGNESS_PENALTY`] applies.
pub const MODERATE_MISSINGNESS_RATIO: f64 = 0.1;
pub const MODERATE_MISSINGNESS_PENALTY: f64 = 0.9;

/// Multiplier when complete rows fall below `min_sample_size`.
pub const SMALL_SAMPLE_PENALTY: f64 = 0.5;

/// Multiplier when complete rows fall below twice `min_sample_size`.
pub const MARGINAL_SAMPLE_PENALTY: f64 = 0.8;

/// Bonus for two-variable hypotheses with more than
/// [`SIMPLICITY_MIN_ROWS`] complete rows.
pub const SIMPLICITY_BONUS: f64 = 1.1;
pub const SIMPLICITY_MIN_ROWS: usize = 100;

/// Testability assigned when no dataset is available.
pub const NO_DATASET_TESTABILITY: f64 = 0.5;

// ============================================================================
// Feasibility constants
// ============================================================================

/// Weights of the feasibility blend. They sum to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeasibilityWeights {
    pub data_availability: f64,
    pub sample_size: f64,
    pub power: f64,
    pub assumptions: f64,
}

pub const FEASIBILITY_WEIGHTS: FeasibilityWeights = FeasibilityWeights {
    data_availability: 0.3,
    sample_size: 0.3,
    power: 0.2,
    assumptions: 0.2,
};

/// Sample component of the blend when the sample is inadequate.
pub const INADEQUATE_SAMPLE_SCORE: f64 = 0.5;

/// Power component of the blend when power is unknown.
pub const UNKNOWN_POWER_SCORE: f64 = 0.7;

/// `is_testable` requires a feasibility score strictly above this.
pub const TESTABLE_THRESHOLD: f64 = 0.6;

/// Step lookup of power by complete-case sample size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerTable {
    /// `(n_below, power)` steps in increasing `n_below` order
    pub steps: &'static [(usize, f64)],
    /// Power once `n` reaches the last step
    pub ceiling: f64,
}

impl PowerTable {
    pub fn lookup(&self, n: usize) -> f64 {
        self.steps
            .iter()
            .find(|(below, _)| n < *below)
            .map_or(self.ceiling, |(_, power)| *power)
    }
}

/// Correlation tests, tuned for a moderate effect (r ≈ 0.3).
pub const CORRELATION_POWER: PowerTable = PowerTable {
    steps: &[(10, 0.1), (30, 0.5), (100, 0.7)],
    ceiling: 0.9,
};

/// Group comparisons, tuned for a medium effect (f ≈ 0.5).
pub const GROUP_COMPARISON_POWER: PowerTable = PowerTable {
    steps: &[(30, 0.3), (100, 0.6)],
    ceiling: 0.85,
};

/// Power assumed for other tests with an adequate sample.
pub const DEFAULT_ADEQUATE_POWER: f64 = 0.8;

/// Power assumed for other tests with an inadequate sample.
pub const DEFAULT_INADEQUATE_POWER: f64 = 0.6;

/// Estimated power for a test given complete rows and sample adequacy.
pub fn estimate_power(test: StatisticalTest, complete_rows: usize, adequate: bool) -> f64 {
    match test.family() {
        TestFamily::Correlation => CORRELATION_POWER.lookup(complete_rows),
        TestFamily::TwoSample | TestFamily::MultiGroup => GROUP_COMPARISON_POWER.lookup(complete_rows),
        _ if adequate => DEFAULT_ADEQUATE_POWER,
        _ => DEFAULT_INADEQUATE_POWER,
    }
}

// ============================================================================
// Validator
// ============================================================================

/// Scores hypotheses for testability against a dataset.
#[derive(Debug, Clone)]
pub struct HypothesisValidator {
    config: EngineConfig,
}

impl HypothesisValidator {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Multiplicative testability score in `[0, 1]`.
    pub fn testability_score(&self, hypothesis: &Hypothesis, dataset: Option<&Dataset>) -> f64 {
        let Some(dataset) = dataset else {
            return NO_DATASET_TESTABILITY;
        };
        let mut score = 1.0;

        for variable in &hypothesis.variables {
            match dataset.missing_ratio(variable) {
                None => score *= MISSING_VARIABLE_PENALTY,
                Some(ratio) if ratio > HIGH_MISSINGNESS_RATIO => score *= HIGH_MISSINGNESS_PENALTY,
                Some(ratio) if ratio > MODERATE_MISSINGNESS_RATIO => {
                    score *= MODERATE_MISSINGNESS_PENALTY
                }
                Some(_) => {}
            }
        }

        let complete = dataset.complete_rows(&hypothesis.variables);
        let min_sample = self.config.min_sample_size;
        if complete < min_sample {
            score *= SMALL_SAMPLE_PENALTY;
        } else if complete < min_sample * 2 {
            score *= MARGINAL_SAMPLE_PENALTY;
        }

        if hypothesis.variables.len() <= 2 && complete > SIMPLICITY_MIN_ROWS {
            score *= SIMPLICITY_BONUS;
        }

        score.min(1.0)
    }

    /// Full feasibility assessment of one hypothesis.
    #[instrument(skip(self, hypothesis, dataset), fields(hypothesis_id = %hypothesis.id))]
    pub fn validate(&self, hypothesis: &Hypothesis, dataset: Option<&Dataset>) -> HypothesisValidation {
        let data_availability: BTreeMap<String, bool> = hypothesis
            .variables
            .iter()
            .map(|v| (v.clone(), dataset.map_or(false, |d| d.has_column(v))))
            .collect();

        let (sample_size_adequacy, statistical_power, complete_rows) = match dataset {
            Some(dataset) => {
                let complete = dataset.complete_rows(&hypothesis.variables);
                let adequate = complete >= self.config.min_sample_size;
                let power = estimate_power(hypothesis.statistical_test, complete, adequate);
                (adequate, Some(power), complete)
            }
            None => (false, None, 0),
        };

        let assumption_checks = placeholder_assumptions();
        let feasibility_score = feasibility_score(
            &data_availability,
            sample_size_adequacy,
            statistical_power,
            &assumption_checks,
        );
        let recommendations = self.recommendations(
            hypothesis,
            &data_availability,
            sample_size_adequacy,
            complete_rows,
            statistical_power,
        );

        debug!(
            feasibility_score,
            complete_rows,
            power = ?statistical_power,
            "Hypothesis validated"
        );

        // An absent column rules the hypothesis out whatever the blend says.
        let all_available = data_availability.values().all(|&available| available);

        HypothesisValidation {
            hypothesis_id: hypothesis.id.clone(),
            is_testable: all_available && feasibility_score > TESTABLE_THRESHOLD,
            data_availability,
            statistical_power,
            sample_size_adequacy,
            assumption_checks,
            feasibility_score,
            recommendations,
        }
    }

    /// Validate every hypothesis, preserving order.
    pub fn validate_all(
        &self,
        hypotheses: &[Hypothesis],
        dataset: Option<&Dataset>,
    ) -> Vec<HypothesisValidation> {
        hypotheses.iter().map(|h| self.validate(h, dataset)).collect()
    }

    fn recommendations(
        &self,
        hypothesis: &Hypothesis,
        data_availability: &BTreeMap<String, bool>,
        sample_size_adequacy: bool,
        complete_rows: usize,
        power: Option<f64>,
    ) -> Vec<String> {
        let mut recommendations = Vec::new();

        let missing: Vec<&str> = hypothesis
            .variables
            .iter()
            .filter(|v| !data_availability.get(*v).copied().unwrap_or(false))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            recommendations.push(format!(
                "Collect data for missing variables: {}",
                missing.join(", ")
            ));
        }

        if !sample_size_adequacy {
            recommendations.push(format!(
                "Increase sample size to at least {} complete rows (currently {})",
                self.config.min_sample_size, complete_rows
            ));
        }

        if let Some(power) = power {
            if power < self.config.power_threshold {
                recommendations.push(format!(
                    "Estimated power ({:.2}) is below the {:.2} threshold; consider a larger sample or a larger expected effect",
                    power, self.config.power_threshold
                ));
            }
        }

        if hypothesis.statistical_test == StatisticalTest::CausalInference {
            recommendations.push(
                "Prefer a randomized experiment or a natural experiment to establish causality"
                    .to_string(),
            );
        }

        recommendations.push("Validate statistical assumptions before testing".to_string());
        recommendations.push(
            "Consider multiple comparison corrections if testing multiple hypotheses".to_string(),
        );
        recommendations
    }
}

impl Default for HypothesisValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Assumptions assumed to hold until tested on the data.
fn placeholder_assumptions() -> BTreeMap<String, bool> {
    ["independence", "normality", "linearity", "homoscedasticity"]
        .into_iter()
        .map(|name| (name.to_string(), true))
        .collect()
}

fn fraction_true(checks: &BTreeMap<String, bool>) -> f64 {
    if checks.is_empty() {
        return 0.0;
    }
    checks.values().filter(|v| **v).count() as f64 / checks.len() as f64
}

/// Weighted feasibility blend.
pub fn feasibility_score(
    data_availability: &BTreeMap<String, bool>,
    sample_size_adequacy: bool,
    power: Option<f64>,
    assumption_checks: &BTreeMap<String, bool>,
) -> f64 {
    let w = FEASIBILITY_WEIGHTS;
    let sample = if sample_size_adequacy {
        1.0
    } else {
        INADEQUATE_SAMPLE_SCORE
    };

    w.data_availability * fraction_true(data_availability)
        + w.sample_size * sample
        + w.power * power.unwrap_or(UNKNOWN_POWER_SCORE)
        + w.assumptions * fraction_true(assumption_checks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{EffectMagnitude, ExpectedDirection};
    use crate::dataset::{Column, ColumnType};

    fn create_test_hypothesis(variables: &[&str], test: StatisticalTest) -> Hypothesis {
        Hypothesis {
            id: format!("test_{}", variables.join("_")),
            statement: "statement".into(),
            null_hypothesis: "null".into(),
            alternative_hypothesis: "alternative".into(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
            variable_types: variables
                .iter()
                .map(|v| (v.to_string(), ColumnType::Numeric))
                .collect(),
            statistical_test: test,
            expected_direction: ExpectedDirection::Positive,
            expected_effect_size: EffectMagnitude::Medium,
            rationale: "rationale".into(),
            supporting_evidence: vec![],
            confidence: 0.8,
            priority: None,
            testability_score: None,
            business_relevance: "relevance".into(),
        }
    }

    fn create_test_dataset(rows: usize, missing_b: usize) -> Dataset {
        let a: Vec<Option<f64>> = (0..rows).map(|i| Some(i as f64)).collect();
        let b: Vec<Option<f64>> = (0..rows)
            .map(|i| if i < missing_b { None } else { Some((i * 3 % 7) as f64) })
            .collect();
        Dataset::new(vec![Column::numeric("a", a), Column::numeric("b", b)]).unwrap()
    }

    #[test]
    fn test_power_tables() {
        assert_eq!(CORRELATION_POWER.lookup(5), 0.1);
        assert_eq!(CORRELATION_POWER.lookup(10), 0.5);
        assert_eq!(CORRELATION_POWER.lookup(99), 0.7);
        assert_eq!(CORRELATION_POWER.lookup(100), 0.9);
        assert_eq!(GROUP_COMPARISON_POWER.lookup(29), 0.3);
        assert_eq!(GROUP_COMPARISON_POWER.lookup(500), 0.85);
        assert_eq!(estimate_power(StatisticalTest::LjungBox, 10, false), 0.6);
        assert_eq!(estimate_power(StatisticalTest::LjungBox, 10, true), 0.8);
        assert_eq!(estimate_power(StatisticalTest::KruskalWallis, 150, true), 0.85);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let w = FEASIBILITY_WEIGHTS;
        let total = w.data_availability + w.sample_size + w.power + w.assumptions;
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_testability_full_data() {
        let validator = HypothesisValidator::new();
        let hypothesis = create_test_hypothesis(&["a", "b"], StatisticalTest::PearsonCorrelation);
        let score = validator.testability_score(&hypothesis, Some(&create_test_dataset(200, 0)));
        // 1.0 × 1.1 bonus, capped
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_testability_penalties() {
        let validator = HypothesisValidator::new();
        let hypothesis = create_test_hypothesis(&["a", "b"], StatisticalTest::PearsonCorrelation);

        // 20% missing in b, 40 complete rows: 0.9 × 0.8
        let score = validator.testability_score(&hypothesis, Some(&create_test_dataset(50, 10)));
        assert!((score - 0.72).abs() < 1e-12);

        let missing = create_test_hypothesis(&["a", "ghost"], StatisticalTest::PearsonCorrelation);
        let score = validator.testability_score(&missing, Some(&create_test_dataset(200, 0)));
        // 0.3 for the absent column, 0.5 because no complete rows exist
        assert!((score - 0.15).abs() < 1e-12);

        assert_eq!(validator.testability_score(&hypothesis, None), NO_DATASET_TESTABILITY);
    }

    #[test]
    fn test_validate_testable() {
        let validator = HypothesisValidator::new();
        let hypothesis = create_test_hypothesis(&["a", "b"], StatisticalTest::PearsonCorrelation);
        let validation = validator.validate(&hypothesis, Some(&create_test_dataset(200, 0)));

        assert!(validation.is_testable);
        assert!(validation.sample_size_adequacy);
        assert_eq!(validation.statistical_power, Some(0.9));
        // 0.3 + 0.3 + 0.18 + 0.2
        assert!((validation.feasibility_score - 0.98).abs() < 1e-12);
        assert_eq!(validation.recommendations.len(), 2);
    }

    #[test]
    fn test_validate_missing_column() {
        let validator = HypothesisValidator::new();
        let hypothesis = create_test_hypothesis(&["a", "ghost"], StatisticalTest::PearsonCorrelation);
        let validation = validator.validate(&hypothesis, Some(&create_test_dataset(200, 0)));

        assert!(!validation.is_testable);
        assert_eq!(validation.data_availability["ghost"], false);
        assert_eq!(validation.missing_variables(), vec!["ghost"]);
        assert!(validation.recommendations[0].contains("ghost"));
        // 0.15 + 0.15 + 0.02 + 0.2
        assert!((validation.feasibility_score - 0.52).abs() < 1e-12);
    }

    #[test]
    fn test_validate_missing_column_among_three() {
        let validator = HypothesisValidator::new();
        let hypothesis = create_test_hypothesis(&["a", "b", "ghost"], StatisticalTest::AnovaOneWay);
        let validation = validator.validate(&hypothesis, Some(&create_test_dataset(200, 0)));

        // 0.2 + 0.15 + 0.06 + 0.2 clears the threshold on its own
        assert!((validation.feasibility_score - 0.61).abs() < 1e-12);
        assert!(validation.feasibility_score > TESTABLE_THRESHOLD);
        assert!(!validation.is_testable);
        assert_eq!(validation.data_availability["a"], true);
        assert_eq!(validation.data_availability["ghost"], false);
        assert!(validation.recommendations[0].contains("ghost"));
    }

    #[test]
    fn test_validate_causal_recommendation() {
        let validator = HypothesisValidator::new();
        let hypothesis = create_test_hypothesis(&["a", "b"], StatisticalTest::CausalInference);
        let validation = validator.validate(&hypothesis, Some(&create_test_dataset(200, 0)));
        assert!(validation
            .recommendations
            .iter()
            .any(|r| r.contains("randomized experiment")));
    }

    #[test]
    fn test_validate_without_dataset() {
        let validator = HypothesisValidator::new();
        let hypothesis = create_test_hypothesis(&["a", "b"], StatisticalTest::PearsonCorrelation);
        let validation = validator.validate(&hypothesis, None);

        assert!(validation.statistical_power.is_none());
        assert!(!validation.sample_size_adequacy);
        assert!(!validation.is_testable);
    }

    #[test]
    fn test_low_power_recommendation() {
        let validator = HypothesisValidator::new();
        let hypothesis = create_test_hypothesis(&["a", "b"], StatisticalTest::AnovaOneWay);
        let validation = validator.validate(&hypothesis, Some(&create_test_dataset(50, 0)));
        assert_eq!(validation.statistical_power, Some(0.6));
        assert!(validation.recommendations.iter().any(|r| r.contains("(0.60)")));
    }
}
