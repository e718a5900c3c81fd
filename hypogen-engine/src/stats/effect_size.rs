//! Standardized mean-difference effect sizes.

use super::descriptive::{mean, variance};
use super::{require_len, StatsError, StatsResult};

/// Pooled standard deviation of two samples.
pub fn pooled_std(a: &[f64], b: &[f64]) -> StatsResult<f64> {
    require_len(a, 2)?;
    require_len(b, 2)?;
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let pooled_var = ((n1 - 1.0) * variance(a) + (n2 - 1.0) * variance(b)) / (n1 + n2 - 2.0);
    let pooled = pooled_var.sqrt();

    if !(pooled > 0.0) {
        return Err(StatsError::Degenerate("pooled standard deviation is zero".into()));
    }
    Ok(pooled)
}

/// Cohen's d: `(mean1 − mean2) / pooled_std`.
pub fn cohens_d(a: &[f64], b: &[f64]) -> StatsResult<f64> {
    Ok((mean(a) - mean(b)) / pooled_std(a, b)?)
}

/// Small-sample bias correction `1 − 3 / (4(n1 + n2 − 2) − 1)`.
pub fn hedges_correction(n1: usize, n2: usize) -> f64 {
    let df = (n1 + n2) as f64 - 2.0;
    1.0 - 3.0 / (4.0 * df - 1.0)
}

/// Hedges' g: Cohen's d with the small-sample correction.
pub fn hedges_g(a: &[f64], b: &[f64]) -> StatsResult<f64> {
    Ok(cohens_d(a, b)? * hedges_correction(a.len(), b.len()))
}

/// Cohen's conventional magnitude label.
pub fn interpret_magnitude(effect: f64) -> &'static str {
    let magnitude = effect.abs();
    if magnitude < 0.2 {
        "negligible"
    } else if magnitude < 0.5 {
        "small"
    } else if magnitude < 0.8 {
        "medium"
    } else {
        "large"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cohens_d() {
        // means 3 and 5, both variances 2.5
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [3.0, 4.0, 5.0, 6.0, 7.0];
        let d = cohens_d(&a, &b).unwrap();
        assert!((d - (-2.0 / 2.5f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn test_hedges_g_is_smaller() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.5, 3.0, 4.5, 6.0];
        let d = cohens_d(&a, &b).unwrap();
        let g = hedges_g(&a, &b).unwrap();
        assert!(g.abs() < d.abs());
        assert!((g / d - (1.0 - 3.0 / 23.0)).abs() < 1e-12);
    }

    #[test]
    fn test_zero_pooled_std_is_degenerate() {
        let result = cohens_d(&[2.0, 2.0, 2.0], &[2.0, 2.0]);
        assert!(matches!(result, Err(StatsError::Degenerate(_))));
    }

    #[test]
    fn test_interpret_magnitude() {
        assert_eq!(interpret_magnitude(0.1), "negligible");
        assert_eq!(interpret_magnitude(-0.3), "small");
        assert_eq!(interpret_magnitude(0.6), "medium");
        assert_eq!(interpret_magnitude(1.2), "large");
    }
}
