//! Multiple-Comparison Corrector
//!
//! Adjusts the p-values of a batch of [`TestResult`]s for family-wise or
//! false-discovery control and writes them back onto `corrected_p_value`.
//! Results without a p-value are left untouched.
//!
//! # Methods
//!
//! | Method | Controls | Adjustment for rank i of k |
//! |--------|----------|----------------------------|
//! | Benjamini-Hochberg | FDR | `min_{j≥i} p(j)·k/j` |
//! | Bonferroni | FWER | `p·k` |
//! | Holm | FWER | `max_{j≤i} p(j)·(k−j+1)` |
//!
//! Every adjusted value is clamped to `[0, 1]`. A non-finite p-value counts
//! as 1.0 under every method.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::contracts::TestResult;

/// Multiple testing correction method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionMethod {
    #[default]
    BenjaminiHochberg,
    Bonferroni,
    Holm,
}

impl CorrectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BenjaminiHochberg => "benjamini_hochberg",
            Self::Bonferroni => "bonferroni",
            Self::Holm => "holm",
        }
    }

    /// Adjust p-values. Output has the input's length and order.
    pub fn adjust(&self, p_values: &[f64]) -> Vec<f64> {
        match self {
            Self::BenjaminiHochberg => benjamini_hochberg(p_values),
            Self::Bonferroni => bonferroni(p_values),
            Self::Holm => holm(p_values),
        }
    }
}

impl fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorrectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "benjamini_hochberg" | "bh" | "fdr_bh" => Ok(Self::BenjaminiHochberg),
            "bonferroni" => Ok(Self::Bonferroni),
            "holm" => Ok(Self::Holm),
            other => Err(format!("unknown correction method '{}'", other)),
        }
    }
}

/// p-values with non-finite entries replaced by 1.0.
fn sanitized(p_values: &[f64]) -> Vec<f64> {
    p_values
        .iter()
        .map(|&p| if p.is_finite() { p.clamp(0.0, 1.0) } else { 1.0 })
        .collect()
}

/// Bonferroni: `min(1, p·k)`.
pub fn bonferroni(p_values: &[f64]) -> Vec<f64> {
    let k = p_values.len() as f64;
    sanitized(p_values)
        .into_iter()
        .map(|p| (p * k).clamp(0.0, 1.0))
        .collect()
}

/// Holm step-down.
pub fn holm(p_values: &[f64]) -> Vec<f64> {
    let p_values = sanitized(p_values);
    let k = p_values.len();
    let order = ascending_order(&p_values);
    let mut adjusted = vec![0.0; k];

    let mut running_max: f64 = 0.0;
    for (rank, &i) in order.iter().enumerate() {
        let value = (p_values[i] * (k - rank) as f64).clamp(0.0, 1.0);
        running_max = running_max.max(value);
        adjusted[i] = running_max;
    }
    adjusted
}

/// Benjamini-Hochberg step-up.
pub fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let p_values = sanitized(p_values);
    let k = p_values.len();
    let order = ascending_order(&p_values);
    let mut adjusted = vec![0.0; k];

    let mut running_min: f64 = 1.0;
    for (rank, &i) in order.iter().enumerate().rev() {
        let value = (p_values[i] * k as f64 / (rank + 1) as f64).clamp(0.0, 1.0);
        running_min = running_min.min(value);
        adjusted[i] = running_min;
    }
    adjusted
}

/// Indices sorted by ascending p-value; ties keep input order.
fn ascending_order(p_values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..p_values.len()).collect();
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));
    order
}

/// Correct every result carrying a p-value, in place. Returns how many
/// results were corrected.
#[instrument(skip(results), fields(method = %method, batch = results.len()))]
pub fn apply_correction(results: &mut [TestResult], method: CorrectionMethod) -> usize {
    let positions: Vec<usize> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.p_value.is_some())
        .map(|(i, _)| i)
        .collect();

    let raw: Vec<f64> = positions
        .iter()
        .filter_map(|&i| results[i].p_value)
        .collect();

    let adjusted = method.adjust(&raw);
    for (&i, corrected) in positions.iter().zip(adjusted) {
        results[i].corrected_p_value = Some(corrected);
    }

    debug!(corrected = positions.len(), "Applied multiple comparison correction");
    positions.len()
}

/// Sort helper for reporting: ascending by corrected (else raw) p-value,
/// effect-size-only results last.
pub fn compare_by_evidence(a: &TestResult, b: &TestResult) -> Ordering {
    let key = |r: &TestResult| r.corrected_p_value.or(r.p_value);
    match (key(a), key(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::StatisticalTest;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{:?} != {:?}", actual, expected);
        }
    }

    #[test]
    fn test_bonferroni() {
        assert_close(&bonferroni(&[0.01, 0.04, 0.5]), &[0.03, 0.12, 1.0]);
    }

    #[test]
    fn test_holm() {
        // sorted: 0.01*3=0.03, 0.03*2=0.06, 0.04*1=0.04 -> max 0.06
        assert_close(&holm(&[0.04, 0.01, 0.03]), &[0.06, 0.03, 0.06]);
    }

    #[test]
    fn test_benjamini_hochberg() {
        // ranks: 0.01->1, 0.02->2, 0.03->3, 0.5->4; q = p*4/rank
        // 0.04, 0.04, 0.04, 0.5
        assert_close(
            &benjamini_hochberg(&[0.5, 0.02, 0.01, 0.03]),
            &[0.5, 0.04, 0.04, 0.04],
        );
    }

    #[test]
    fn test_non_finite_p_values_count_as_one() {
        let p_values = [0.01, f64::NAN, 0.02, f64::INFINITY];
        // as if given [0.01, 1.0, 0.02, 1.0]
        assert_close(&bonferroni(&p_values), &[0.04, 1.0, 0.08, 1.0]);
        assert_close(&holm(&p_values), &[0.04, 1.0, 0.06, 1.0]);
        assert_close(&benjamini_hochberg(&p_values), &[0.04, 1.0, 0.04, 1.0]);

        for method in [
            CorrectionMethod::BenjaminiHochberg,
            CorrectionMethod::Bonferroni,
            CorrectionMethod::Holm,
        ] {
            assert!(method.adjust(&p_values).iter().all(|p| p.is_finite()));
        }
    }

    #[test]
    fn test_empty_input() {
        for method in [
            CorrectionMethod::BenjaminiHochberg,
            CorrectionMethod::Bonferroni,
            CorrectionMethod::Holm,
        ] {
            assert!(method.adjust(&[]).is_empty());
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "Benjamini_Hochberg".parse::<CorrectionMethod>().unwrap(),
            CorrectionMethod::BenjaminiHochberg
        );
        assert!("sidak".parse::<CorrectionMethod>().is_err());
    }

    #[test]
    fn test_apply_skips_effect_sizes() {
        let mut results = vec![
            TestResult::new(StatisticalTest::PearsonCorrelation, &[], 0.8).with_p_value(0.01),
            TestResult::new(StatisticalTest::CohensD, &[], 0.5),
            TestResult::new(StatisticalTest::ShapiroWilk, &[], 0.97).with_p_value(0.2),
        ];

        let corrected = apply_correction(&mut results, CorrectionMethod::Bonferroni);

        assert_eq!(corrected, 2);
        assert!((results[0].corrected_p_value.unwrap() - 0.02).abs() < 1e-12);
        assert!(results[1].corrected_p_value.is_none());
        assert!((results[2].corrected_p_value.unwrap() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_compare_by_evidence() {
        let mut results = vec![
            TestResult::new(StatisticalTest::CohensD, &[], 0.5),
            TestResult::new(StatisticalTest::JarqueBera, &[], 1.0).with_p_value(0.3),
            TestResult::new(StatisticalTest::KendallTau, &[], 0.4).with_p_value(0.001),
        ];
        results.sort_by(compare_by_evidence);
        assert_eq!(results[0].test, StatisticalTest::KendallTau);
        assert_eq!(results[2].test, StatisticalTest::CohensD);
    }
}
