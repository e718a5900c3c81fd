//! Correlation coefficients with significance tests.

use super::descriptive::{average_ranks, mean};
use super::distributions::{normal_two_sided, t_two_sided};
use super::{require_len, StatsError, StatsResult};

/// z-value of a two-sided 95% normal interval.
pub const Z_95: f64 = 1.959963984540054;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    pub coefficient: f64,
    pub p_value: f64,
    pub n: usize,
}

fn check_pairs(x: &[f64], y: &[f64], required: usize) -> StatsResult<()> {
    if x.len() != y.len() {
        return Err(StatsError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    require_len(x, required)
}

fn pearson_coefficient(x: &[f64], y: &[f64]) -> StatsResult<f64> {
    let (mx, my) = (mean(x), mean(y));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if !(sxx > 0.0 && syy > 0.0) {
        return Err(StatsError::Degenerate("a variable has zero variance".into()));
    }
    Ok((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// p-value of r under H0: ρ = 0 via `t = r·sqrt((n−2)/(1−r²))`.
fn correlation_p_value(r: f64, n: usize) -> StatsResult<f64> {
    let df = n as f64 - 2.0;
    if (1.0 - r * r) <= 0.0 {
        return Ok(0.0);
    }
    let t = r * (df / (1.0 - r * r)).sqrt();
    t_two_sided(t, df)
}

/// Pearson product-moment correlation.
pub fn pearson(x: &[f64], y: &[f64]) -> StatsResult<Correlation> {
    check_pairs(x, y, 3)?;
    let r = pearson_coefficient(x, y)?;
    Ok(Correlation {
        coefficient: r,
        p_value: correlation_p_value(r, x.len())?,
        n: x.len(),
    })
}

/// Fisher z-transform 95% interval for r. Requires n > 3.
pub fn fisher_interval(r: f64, n: usize) -> Option<(f64, f64)> {
    if n <= 3 {
        return None;
    }
    if r.abs() >= 1.0 {
        return Some((r, r));
    }
    let z = 0.5 * ((1.0 + r) / (1.0 - r)).ln();
    let se = 1.0 / (n as f64 - 3.0).sqrt();
    Some(((z - Z_95 * se).tanh(), (z + Z_95 * se).tanh()))
}

/// Spearman rank correlation.
pub fn spearman(x: &[f64], y: &[f64]) -> StatsResult<Correlation> {
    check_pairs(x, y, 3)?;
    let rho = pearson_coefficient(&average_ranks(x), &average_ranks(y))?;
    Ok(Correlation {
        coefficient: rho,
        p_value: correlation_p_value(rho, x.len())?,
        n: x.len(),
    })
}

/// Kendall's tau-b with the tie-adjusted normal approximation.
pub fn kendall_tau(x: &[f64], y: &[f64]) -> StatsResult<Correlation> {
    check_pairs(x, y, 3)?;
    let n = x.len();

    let mut concordant_minus_discordant: i64 = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = x[i] - x[j];
            let dy = y[i] - y[j];
            let sign = (dx * dy).signum();
            if dx != 0.0 && dy != 0.0 {
                concordant_minus_discordant += sign as i64;
            }
        }
    }

    let x_ties = tie_groups(x);
    let y_ties = tie_groups(y);

    let nf = n as f64;
    let n0 = nf * (nf - 1.0) / 2.0;
    let pairs_tied = |ties: &[f64]| ties.iter().map(|t| t * (t - 1.0) / 2.0).sum::<f64>();
    let (n1, n2) = (pairs_tied(&x_ties), pairs_tied(&y_ties));

    let denominator = ((n0 - n1) * (n0 - n2)).sqrt();
    if !(denominator > 0.0) {
        return Err(StatsError::Degenerate("a variable is constant".into()));
    }
    let s = concordant_minus_discordant as f64;
    let tau = (s / denominator).clamp(-1.0, 1.0);

    let sum_over = |ties: &[f64], f: &dyn Fn(f64) -> f64| ties.iter().map(|&t| f(t)).sum::<f64>();
    let v0 = nf * (nf - 1.0) * (2.0 * nf + 5.0);
    let vt = sum_over(&x_ties, &|t| t * (t - 1.0) * (2.0 * t + 5.0));
    let vu = sum_over(&y_ties, &|t| t * (t - 1.0) * (2.0 * t + 5.0));
    let v1 = sum_over(&x_ties, &|t| t * (t - 1.0)) * sum_over(&y_ties, &|t| t * (t - 1.0));
    let v2 = sum_over(&x_ties, &|t| t * (t - 1.0) * (t - 2.0))
        * sum_over(&y_ties, &|t| t * (t - 1.0) * (t - 2.0));

    let mut var = (v0 - vt - vu) / 18.0 + v1 / (2.0 * nf * (nf - 1.0));
    if n > 2 {
        var += v2 / (9.0 * nf * (nf - 1.0) * (nf - 2.0));
    }
    if !(var > 0.0) {
        return Err(StatsError::Degenerate("zero variance of the Kendall score".into()));
    }

    Ok(Correlation {
        coefficient: tau,
        p_value: normal_two_sided(s / var.sqrt()),
        n,
    })
}

fn tie_groups(values: &[f64]) -> Vec<f64> {
    super::descriptive::tie_counts(values)
        .into_iter()
        .map(|t| t as f64)
        .collect()
}
