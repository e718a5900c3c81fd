//! Normality tests.
//!
//! - Shapiro-Wilk uses Royston's (1992/1995) coefficient approximation and
//!   p-value transformation, valid for 3 ≤ n ≤ 5000.
//! - Kolmogorov-Smirnov compares against a normal with the sample's own mean
//!   and standard deviation, using the asymptotic Kolmogorov distribution with
//!   Stephens' small-sample scaling.
//! - Anderson-Darling reports the statistic with the case-3 critical values
//!   (mean and variance estimated) at 15%, 10%, 5%, 2.5% and 1%.
//! - Jarque-Bera uses the χ²(2) reference, whose upper tail is `exp(-x/2)`.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use super::descriptive::{central_moment, mean, sorted, std_dev, sum_of_squares};
use super::distributions::{normal_cdf, normal_ppf, normal_sf};
use super::{require_len, StatsError, StatsResult};

/// Significance levels (percent) of [`AndersonDarling::critical_values`].
pub const ANDERSON_SIGNIFICANCE_LEVELS: [f64; 5] = [15.0, 10.0, 5.0, 2.5, 1.0];

const ANDERSON_BASE_CRITICAL_VALUES: [f64; 5] = [0.576, 0.656, 0.787, 0.918, 1.092];

// Royston's polynomial coefficients, lowest order first.
const SW_C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
const SW_C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const SW_C3: [f64; 4] = [0.5440, -0.39978, 0.025054, -6.714e-4];
const SW_C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const SW_C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const SW_C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const SW_GAMMA: [f64; 2] = [-2.273, 0.459];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalityTest {
    pub statistic: f64,
    pub p_value: f64,
    pub n: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AndersonDarling {
    pub statistic: f64,
    pub critical_values: [f64; 5],
    pub n: usize,
}

fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Shapiro-Wilk W test.
pub fn shapiro_wilk(values: &[f64]) -> StatsResult<NormalityTest> {
    require_len(values, 3)?;
    let n = values.len();
    let x = sorted(values);

    let ssq = sum_of_squares(&x);
    if ssq <= f64::EPSILON * x.iter().map(|v| v * v).sum::<f64>() {
        return Err(StatsError::Degenerate("all values are identical".into()));
    }

    let a = shapiro_coefficients(n);
    let numerator: f64 = a.iter().zip(&x).map(|(a, x)| a * x).sum();
    let w = (numerator * numerator / ssq).min(1.0);

    Ok(NormalityTest {
        statistic: w,
        p_value: shapiro_p_value(w, n),
        n,
    })
}

/// Antisymmetric weights `a_1..a_n` for sorted observations.
fn shapiro_coefficients(n: usize) -> Vec<f64> {
    if n == 3 {
        return vec![-FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2];
    }

    let nf = n as f64;
    let m: Vec<f64> = (1..=n)
        .map(|i| normal_ppf((i as f64 - 0.375) / (nf + 0.25)))
        .collect();
    let mm: f64 = m.iter().map(|v| v * v).sum();
    let u = 1.0 / nf.sqrt();

    let last = m[n - 1];
    let a_last = last / mm.sqrt() + poly(&SW_C1, u);
    let mut a: Vec<f64>;

    if n > 5 {
        let second = m[n - 2];
        let a_second = second / mm.sqrt() + poly(&SW_C2, u);
        let phi = (mm - 2.0 * last * last - 2.0 * second * second)
            / (1.0 - 2.0 * a_last * a_last - 2.0 * a_second * a_second);
        a = m.iter().map(|v| v / phi.sqrt()).collect();
        a[n - 2] = a_second;
        a[1] = -a_second;
    } else {
        let phi = (mm - 2.0 * last * last) / (1.0 - 2.0 * a_last * a_last);
        a = m.iter().map(|v| v / phi.sqrt()).collect();
    }
    a[n - 1] = a_last;
    a[0] = -a_last;
    a
}

fn shapiro_p_value(w: f64, n: usize) -> f64 {
    if n == 3 {
        let p = 6.0 / PI * (w.sqrt().asin() - (0.75f64).sqrt().asin());
        return p.clamp(0.0, 1.0);
    }

    let one_minus_w = 1.0 - w;
    if one_minus_w <= 0.0 {
        return 1.0;
    }
    let nf = n as f64;
    let mut y = one_minus_w.ln();

    let (m, s) = if n <= 11 {
        let gamma = poly(&SW_GAMMA, nf);
        if y >= gamma {
            return 0.0;
        }
        y = -(gamma - y).ln();
        (poly(&SW_C3, nf), poly(&SW_C4, nf).exp())
    } else {
        let ln_n = nf.ln();
        (poly(&SW_C5, ln_n), poly(&SW_C6, ln_n).exp())
    };

    normal_sf((y - m) / s).clamp(0.0, 1.0)
}

fn standardized_sorted(values: &[f64]) -> StatsResult<Vec<f64>> {
    let sd = std_dev(values);
    if !(sd > 0.0) {
        return Err(StatsError::Degenerate("zero standard deviation".into()));
    }
    let m = mean(values);
    Ok(sorted(values).into_iter().map(|v| (v - m) / sd).collect())
}

/// One-sample Kolmogorov-Smirnov against N(mean, sd²) of the sample.
pub fn kolmogorov_smirnov_normal(values: &[f64]) -> StatsResult<NormalityTest> {
    require_len(values, 3)?;
    let z = standardized_sorted(values)?;
    let n = z.len();
    let nf = n as f64;

    let d = z
        .iter()
        .enumerate()
        .map(|(i, &zi)| {
            let cdf = normal_cdf(zi);
            let above = (i + 1) as f64 / nf - cdf;
            let below = cdf - i as f64 / nf;
            above.max(below)
        })
        .fold(0.0, f64::max);

    let sqrt_n = nf.sqrt();
    let p_value = kolmogorov_sf((sqrt_n + 0.12 + 0.11 / sqrt_n) * d);

    Ok(NormalityTest {
        statistic: d,
        p_value,
        n,
    })
}

/// Upper tail of the Kolmogorov distribution.
pub fn kolmogorov_sf(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }

    if lambda < 1.18 {
        let factor = -PI * PI / (8.0 * lambda * lambda);
        let sum: f64 = (1..=20)
            .map(|j| {
                let k = (2 * j - 1) as f64;
                (k * k * factor).exp()
            })
            .sum();
        let cdf = (2.0 * PI).sqrt() / lambda * sum;
        return (1.0 - cdf).clamp(0.0, 1.0);
    }

    let mut total = 0.0;
    for j in 1..=100 {
        let jf = j as f64;
        let term = (-2.0 * jf * jf * lambda * lambda).exp();
        total += if j % 2 == 1 { term } else { -term };
        if term < 1e-16 {
            break;
        }
    }
    (2.0 * total).clamp(0.0, 1.0)
}

/// Anderson-Darling A² against a normal with estimated mean and variance.
pub fn anderson_darling_normal(values: &[f64]) -> StatsResult<AndersonDarling> {
    require_len(values, 8)?;
    let z = standardized_sorted(values)?;
    let n = z.len();
    let nf = n as f64;

    let floor = f64::MIN_POSITIVE.ln();
    let sum: f64 = (0..n)
        .map(|i| {
            let weight = (2 * i + 1) as f64;
            let ln_cdf = normal_cdf(z[i]).ln().max(floor);
            let ln_sf = normal_sf(z[n - 1 - i]).ln().max(floor);
            weight * (ln_cdf + ln_sf)
        })
        .sum();
    let statistic = -nf - sum / nf;

    let scale = 1.0 + 4.0 / nf - 25.0 / (nf * nf);
    let critical_values = ANDERSON_BASE_CRITICAL_VALUES.map(|c| c / scale);

    Ok(AndersonDarling {
        statistic,
        critical_values,
        n,
    })
}

/// Jarque-Bera test from sample skewness and kurtosis.
pub fn jarque_bera(values: &[f64]) -> StatsResult<NormalityTest> {
    require_len(values, 3)?;
    let m2 = central_moment(values, 2);
    if !(m2 > 0.0) {
        return Err(StatsError::Degenerate("zero variance".into()));
    }
    let skewness = central_moment(values, 3) / m2.powf(1.5);
    let kurtosis = central_moment(values, 4) / (m2 * m2);

    let n = values.len();
    let statistic = n as f64 / 6.0 * (skewness.powi(2) + (kurtosis - 3.0).powi(2) / 4.0);

    Ok(NormalityTest {
        statistic,
        p_value: (-statistic / 2.0).exp(),
        n,
    })
}
