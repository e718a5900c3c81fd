//! Hypothesis Candidate Generator
//!
//! Turns an [`ExploratorySummary`] (and optionally the dataset it was derived
//! from) into ranked [`Hypothesis`] records.
//!
//! # Families
//!
//! | Focus area | Source | Test | Confidence |
//! |------------|--------|------|------------|
//! | correlation | strong correlation pairs | `pearson_correlation` | `min(\|r\|, 0.95)` |
//! | comparison | significant group differences | `anova_one_way` | 0.8 if large, else 0.7 |
//! | prediction | numeric dataset columns with variance | `multiple_regression` | 0.65 |
//! | causation | pairs matching [`CAUSAL_TEMPLATES`] | `causal_inference` | 0.6 |
//!
//! # Ranking
//!
//! Candidates below `min_confidence` are dropped. Survivors are scored with
//! [`HypothesisValidator::testability_score`], assigned a [`Priority`] from
//! `confidence × testability_score`, sorted by that product (stable, so ties
//! keep generation order) and truncated to `max_hypotheses`.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::config::{EngineConfig, FocusArea};
use crate::contracts::{
    CorrelationPair, EffectMagnitude, ExpectedDirection, ExploratorySummary, GroupDifference,
    Hypothesis, Priority, StatisticalTest,
};
use crate::dataset::{ColumnType, Dataset};
use crate::validator::HypothesisValidator;

/// Confidence ceiling for correlation hypotheses.
pub const MAX_CORRELATION_CONFIDENCE: f64 = 0.95;

/// `|r|` above which a correlation is expected to be a large effect.
pub const LARGE_CORRELATION: f64 = 0.7;

pub const LARGE_DIFFERENCE_CONFIDENCE: f64 = 0.8;
pub const DIFFERENCE_CONFIDENCE: f64 = 0.7;
pub const PREDICTION_CONFIDENCE: f64 = 0.65;
pub const CAUSAL_CONFIDENCE: f64 = 0.6;

/// Candidate predictors required before a prediction hypothesis is emitted.
pub const MIN_PREDICTORS: usize = 2;
pub const MAX_PREDICTORS: usize = 3;

/// Priority cut-offs on `confidence × testability_score`.
pub const HIGH_PRIORITY_SCORE: f64 = 0.8;
pub const MEDIUM_PRIORITY_SCORE: f64 = 0.6;

/// Business-plausible `(cause, effect)` pairs. Matched case-insensitively in
/// either orientation.
pub const CAUSAL_TEMPLATES: &[(&str, &str)] = &[
    ("marketing_spend", "sales_revenue"),
    ("price", "sales_volume"),
    ("customer_satisfaction", "repeat_purchases"),
    ("training_hours", "performance"),
    ("experience", "salary"),
];

const CORRELATION_RELEVANCE: &str =
    "Understanding relationships can inform resource allocation and strategy";
const COMPARISON_RELEVANCE: &str =
    "Group differences can inform targeted strategies and interventions";
const PREDICTION_RELEVANCE: &str = "Predictive models can improve planning and forecasting";
const CAUSAL_RELEVANCE: &str = "Causal relationships inform intervention strategies and ROI";

/// Priority for a ranking score.
pub fn priority_for(score: f64) -> Priority {
    if score > HIGH_PRIORITY_SCORE {
        Priority::High
    } else if score > MEDIUM_PRIORITY_SCORE {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Template orientation `(cause, effect)` for a pair, if it matches.
fn causal_orientation<'a>(var1: &'a str, var2: &'a str) -> Option<(&'a str, &'a str)> {
    CAUSAL_TEMPLATES.iter().find_map(|(cause, effect)| {
        if var1.eq_ignore_ascii_case(cause) && var2.eq_ignore_ascii_case(effect) {
            Some((var1, var2))
        } else if var2.eq_ignore_ascii_case(cause) && var1.eq_ignore_ascii_case(effect) {
            Some((var2, var1))
        } else {
            None
        }
    })
}

/// Generates and ranks hypothesis candidates.
#[derive(Debug, Clone)]
pub struct HypothesisGenerator {
    config: EngineConfig,
    validator: HypothesisValidator,
}

impl HypothesisGenerator {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            validator: HypothesisValidator::with_config(config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generate, filter and rank hypotheses.
    #[instrument(skip(self, summary, dataset), fields(has_dataset = dataset.is_some()))]
    pub fn generate(&self, summary: &ExploratorySummary, dataset: Option<&Dataset>) -> Vec<Hypothesis> {
        let candidates = self.candidates(summary, dataset);
        let generated = candidates.len();
        let ranked = self.rank(candidates, dataset);

        info!(generated, kept = ranked.len(), "Hypotheses generated");
        ranked
    }

    /// Unranked candidates from every focus area, in family order.
    pub fn candidates(&self, summary: &ExploratorySummary, dataset: Option<&Dataset>) -> Vec<Hypothesis> {
        let mut candidates = Vec::new();

        if self.config.focuses_on(FocusArea::Correlation) {
            candidates.extend(
                summary
                    .strong_correlations()
                    .filter_map(|pair| self.correlation_hypothesis(pair, summary, dataset)),
            );
        }
        if self.config.focuses_on(FocusArea::Comparison) {
            candidates.extend(
                summary
                    .significant_differences()
                    .iter()
                    .map(|difference| self.comparison_hypothesis(difference, summary, dataset)),
            );
        }
        if self.config.focuses_on(FocusArea::Prediction) {
            if let Some(dataset) = dataset {
                candidates.extend(self.prediction_hypotheses(dataset));
            }
        }
        if self.config.focuses_on(FocusArea::Causation) {
            candidates.extend(
                summary
                    .strong_correlations()
                    .filter_map(|pair| self.causal_hypothesis(pair, summary, dataset)),
            );
        }

        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|h| {
                if !seen.insert(h.id.clone()) {
                    debug!(id = %h.id, "Dropping duplicate hypothesis");
                    return false;
                }
                match h.validate() {
                    Ok(()) => true,
                    Err(err) => {
                        warn!(id = %h.id, error = %err, "Dropping malformed hypothesis");
                        false
                    }
                }
            })
            .collect()
    }

    /// Filter by confidence, score, prioritize, sort and truncate.
    pub fn rank(&self, candidates: Vec<Hypothesis>, dataset: Option<&Dataset>) -> Vec<Hypothesis> {
        let mut ranked: Vec<Hypothesis> = candidates
            .into_iter()
            .filter(|h| h.confidence >= self.config.min_confidence)
            .map(|mut h| {
                let testability = self.validator.testability_score(&h, dataset);
                h.testability_score = Some(testability);
                h.priority = Some(priority_for(h.confidence * testability));
                h
            })
            .collect();

        ranked.sort_by(|a, b| b.ranking_score().total_cmp(&a.ranking_score()));
        ranked.truncate(self.config.max_hypotheses);
        ranked
    }

    fn variable_type(
        &self,
        variable: &str,
        summary: &ExploratorySummary,
        dataset: Option<&Dataset>,
        fallback: ColumnType,
    ) -> ColumnType {
        dataset
            .and_then(|d| d.column_type(variable))
            .or_else(|| summary.declared_type(variable))
            .unwrap_or(fallback)
    }

    fn correlation_hypothesis(
        &self,
        pair: &CorrelationPair,
        summary: &ExploratorySummary,
        dataset: Option<&Dataset>,
    ) -> Option<Hypothesis> {
        if !pair.correlation.is_finite() {
            warn!(var1 = %pair.var1, var2 = %pair.var2, "Skipping non-finite correlation");
            return None;
        }
        let (v1, v2) = (&pair.var1, &pair.var2);
        let r = pair.correlation;
        let positive = r > 0.0;
        let (sign, word, direction, alternative) = if positive {
            ("pos", "positively", ExpectedDirection::Positive, "ρ > 0")
        } else {
            ("neg", "negatively", ExpectedDirection::Negative, "ρ < 0")
        };

        Some(Hypothesis {
            id: format!("corr_{}_{}_{}", sign, v1, v2),
            statement: format!("{} is {} correlated with {}", v1, word, v2),
            null_hypothesis: format!("There is no correlation between {} and {} (ρ = 0)", v1, v2),
            alternative_hypothesis: format!(
                "{} and {} are {} correlated ({})",
                v1, v2, word, alternative
            ),
            variables: vec![v1.clone(), v2.clone()],
            variable_types: BTreeMap::from([
                (v1.clone(), self.variable_type(v1, summary, dataset, ColumnType::Numeric)),
                (v2.clone(), self.variable_type(v2, summary, dataset, ColumnType::Numeric)),
            ]),
            statistical_test: StatisticalTest::PearsonCorrelation,
            expected_direction: direction,
            expected_effect_size: if r.abs() > LARGE_CORRELATION {
                EffectMagnitude::Large
            } else {
                EffectMagnitude::Medium
            },
            rationale: format!(
                "Exploratory analysis shows a strong {} correlation (r = {:.3})",
                if positive { "positive" } else { "negative" },
                r
            ),
            supporting_evidence: vec![format!("Observed correlation: {:.3}", r)],
            confidence: r.abs().min(MAX_CORRELATION_CONFIDENCE),
            priority: None,
            testability_score: None,
            business_relevance: CORRELATION_RELEVANCE.to_string(),
        })
    }

    fn comparison_hypothesis(
        &self,
        difference: &GroupDifference,
        summary: &ExploratorySummary,
        dataset: Option<&Dataset>,
    ) -> Hypothesis {
        let group = &difference.grouping_var;
        let outcome = &difference.outcome_var;

        Hypothesis {
            id: format!("comp_{}_{}", group, outcome),
            statement: format!("{} differs significantly across {} groups", outcome, group),
            null_hypothesis: format!("Mean {} is equal across all {} groups", outcome, group),
            alternative_hypothesis: format!(
                "At least one {} group has a different mean {}",
                group, outcome
            ),
            variables: vec![group.clone(), outcome.clone()],
            variable_types: BTreeMap::from([
                (
                    group.clone(),
                    self.variable_type(group, summary, dataset, ColumnType::Categorical),
                ),
                (
                    outcome.clone(),
                    self.variable_type(outcome, summary, dataset, ColumnType::Numeric),
                ),
            ]),
            statistical_test: StatisticalTest::AnovaOneWay,
            expected_direction: ExpectedDirection::Difference,
            expected_effect_size: difference.effect_size,
            rationale: format!(
                "Exploratory analysis found a {} effect of {} on {}",
                difference.effect_size, group, outcome
            ),
            supporting_evidence: vec![
                format!("Observed effect size: {}", difference.effect_size),
                format!("p-value: {:.4}", difference.p_value),
            ],
            confidence: if difference.effect_size == EffectMagnitude::Large {
                LARGE_DIFFERENCE_CONFIDENCE
            } else {
                DIFFERENCE_CONFIDENCE
            },
            priority: None,
            testability_score: None,
            business_relevance: COMPARISON_RELEVANCE.to_string(),
        }
    }

    fn prediction_hypotheses(&self, dataset: &Dataset) -> Vec<Hypothesis> {
        let numeric = dataset.numeric_column_names();
        let categorical = dataset.categorical_column_names();

        numeric
            .iter()
            .filter(|target| dataset.variance(target).is_some_and(|v| v > 0.0))
            .filter_map(|target| {
                let candidates: Vec<&str> = numeric
                    .iter()
                    .chain(categorical.iter())
                    .filter(|c| *c != target)
                    .copied()
                    .collect();
                if candidates.len() < MIN_PREDICTORS {
                    return None;
                }
                let predictors = &candidates[..candidates.len().min(MAX_PREDICTORS)];
                Some(self.prediction_hypothesis(dataset, target, predictors))
            })
            .collect()
    }

    fn prediction_hypothesis(&self, dataset: &Dataset, target: &str, predictors: &[&str]) -> Hypothesis {
        let variables: Vec<String> = std::iter::once(target)
            .chain(predictors.iter().copied())
            .map(str::to_string)
            .collect();
        let variable_types = variables
            .iter()
            .map(|v| {
                let kind = dataset.column_type(v).unwrap_or(ColumnType::Numeric);
                (v.clone(), kind)
            })
            .collect();

        Hypothesis {
            id: format!("pred_{}_multi", target),
            statement: format!("{} can be predicted from {}", target, predictors.join(", ")),
            null_hypothesis: format!(
                "The predictors explain none of the variance in {} (R² = 0)",
                target
            ),
            alternative_hypothesis: format!(
                "The predictors explain a significant share of the variance in {} (R² > 0)",
                target
            ),
            variables,
            variable_types,
            statistical_test: StatisticalTest::MultipleRegression,
            expected_direction: ExpectedDirection::Prediction,
            expected_effect_size: EffectMagnitude::Medium,
            rationale: format!("Several candidate predictors are available for {}", target),
            supporting_evidence: vec!["Multiple potential predictors identified".to_string()],
            confidence: PREDICTION_CONFIDENCE,
            priority: None,
            testability_score: None,
            business_relevance: PREDICTION_RELEVANCE.to_string(),
        }
    }

    fn causal_hypothesis(
        &self,
        pair: &CorrelationPair,
        summary: &ExploratorySummary,
        dataset: Option<&Dataset>,
    ) -> Option<Hypothesis> {
        if !pair.correlation.is_finite() {
            return None;
        }
        let (cause, effect) = causal_orientation(&pair.var1, &pair.var2)?;
        let r = pair.correlation;

        Some(Hypothesis {
            id: format!("causal_{}_{}", cause, effect),
            statement: format!("Changes in {} cause changes in {}", cause, effect),
            null_hypothesis: format!("Changes in {} have no causal effect on {}", cause, effect),
            alternative_hypothesis: format!("Changes in {} causally affect {}", cause, effect),
            variables: vec![cause.to_string(), effect.to_string()],
            variable_types: BTreeMap::from([
                (
                    cause.to_string(),
                    self.variable_type(cause, summary, dataset, ColumnType::Numeric),
                ),
                (
                    effect.to_string(),
                    self.variable_type(effect, summary, dataset, ColumnType::Numeric),
                ),
            ]),
            statistical_test: StatisticalTest::CausalInference,
            expected_direction: if r > 0.0 {
                ExpectedDirection::Positive
            } else {
                ExpectedDirection::Negative
            },
            expected_effect_size: EffectMagnitude::Medium,
            rationale: "The association matches a known business mechanism".to_string(),
            supporting_evidence: vec![
                format!("Strong correlation: {:.3}", r),
                "Temporal or logical precedence is plausible".to_string(),
            ],
            confidence: CAUSAL_CONFIDENCE,
            priority: None,
            testability_score: None,
            business_relevance: CAUSAL_RELEVANCE.to_string(),
        })
    }
}

impl Default for HypothesisGenerator {
    fn default() -> Self {
        Self::new()
    }
}
