//! Stationarity and autocorrelation tests for a single ordered series.
//!
//! # Tests
//!
//! - [`augmented_dickey_fuller`]: unit-root test with a constant term, lag
//!   order chosen by AIC, MacKinnon (2010) approximate p-values.
//! - [`kpss`]: level-stationarity test with a Bartlett-window long-run
//!   variance; p-values interpolated from the KPSS (1992) table.
//! - [`ljung_box`]: portmanteau test for autocorrelation up to a lag.

use super::descriptive::mean;
use super::distributions::{chi2_sf, normal_cdf};
use super::regression::{ols, OlsFit};
use super::{require_len, StatsError, StatsResult};

// ============================================================================
// Augmented Dickey-Fuller
// ============================================================================

const ADF_TAU_MAX: f64 = 2.74;
const ADF_TAU_MIN: f64 = -18.83;
const ADF_TAU_STAR: f64 = -1.61;
const ADF_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const ADF_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

/// Response-surface coefficients for the 1%, 5% and 10% critical values.
const ADF_CRITICAL: [(f64, [f64; 4]); 3] = [
    (0.01, [-3.43035, -6.5393, -16.786, -79.433]),
    (0.05, [-2.86154, -2.8903, -4.234, -40.04]),
    (0.10, [-2.56677, -1.5384, -2.809, 0.0]),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Adf {
    pub statistic: f64,
    pub p_value: f64,
    pub used_lag: usize,
    pub nobs: usize,
    /// `(significance level, critical value)` pairs
    pub critical_values: Vec<(f64, f64)>,
}

/// Default maximum lag `ceil(12·(n/100)^¼)`.
pub fn schwert_lags(n: usize) -> usize {
    (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize
}

/// ADF regression `Δy_t = α + β·y_{t−1} + Σ γ_i·Δy_{t−i}` over the rows
/// starting at difference index `start`.
fn adf_design(series: &[f64], diffs: &[f64], lags: usize, start: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    let design = (start..diffs.len())
        .map(|t| {
            let mut row = Vec::with_capacity(lags + 2);
            row.push(series[t]);
            row.extend((1..=lags).map(|i| diffs[t - i]));
            row.push(1.0);
            row
        })
        .collect();
    let response = diffs[start..].to_vec();
    (design, response)
}

/// Augmented Dickey-Fuller test (constant, no trend). H0: unit root.
pub fn augmented_dickey_fuller(series: &[f64], max_lag: Option<usize>) -> StatsResult<Adf> {
    require_len(series, 10)?;
    let n = series.len();
    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    let cap = (n / 2).saturating_sub(2);
    let max_lag = max_lag.unwrap_or_else(|| schwert_lags(n)).min(cap);

    // AIC over a common sample, then refit at the chosen lag on all usable rows
    let mut best: Option<(f64, usize)> = None;
    for lag in 0..=max_lag {
        let (design, response) = adf_design(series, &diffs, lag, max_lag);
        let fit = ols(&design, &response)?;
        let aic = fit.aic();
        if best.map_or(true, |(best_aic, _)| aic < best_aic) {
            best = Some((aic, lag));
        }
    }
    let used_lag = best.map_or(0, |(_, lag)| lag);

    let (design, response) = adf_design(series, &diffs, used_lag, used_lag);
    let fit: OlsFit = ols(&design, &response)?;
    if !(fit.standard_errors[0] > 0.0) {
        return Err(StatsError::Degenerate(
            "ADF regression fits the series exactly".into(),
        ));
    }

    let statistic = fit.t_value(0);
    let nobs = fit.nobs;
    Ok(Adf {
        statistic,
        p_value: mackinnon_p_value(statistic),
        used_lag,
        nobs,
        critical_values: adf_critical_values(nobs),
    })
}

/// MacKinnon approximate p-value for the constant-only, single-series case.
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > ADF_TAU_MAX {
        return 1.0;
    }
    if statistic < ADF_TAU_MIN {
        return 0.0;
    }
    let coefficients: &[f64] = if statistic <= ADF_TAU_STAR {
        &ADF_SMALL_P
    } else {
        &ADF_LARGE_P
    };
    let z = coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, c| acc * statistic + c);
    normal_cdf(z)
}

fn adf_critical_values(nobs: usize) -> Vec<(f64, f64)> {
    let n = nobs as f64;
    ADF_CRITICAL
        .iter()
        .map(|(level, b)| (*level, b[0] + b[1] / n + b[2] / n.powi(2) + b[3] / n.powi(3)))
        .collect()
}

// ============================================================================
// KPSS
// ============================================================================

const KPSS_CRITICAL: [f64; 4] = [0.347, 0.463, 0.574, 0.739];
const KPSS_P_VALUES: [f64; 4] = [0.10, 0.05, 0.025, 0.01];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kpss {
    pub statistic: f64,
    /// Interpolated, so bounded to `[0.01, 0.10]`
    pub p_value: f64,
    pub lags: usize,
}

/// KPSS test for level stationarity. H0: the series is stationary.
pub fn kpss(series: &[f64], lags: Option<usize>) -> StatsResult<Kpss> {
    require_len(series, 3)?;
    let n = series.len();
    let m = mean(series);
    let resid: Vec<f64> = series.iter().map(|x| x - m).collect();

    let lags = lags.unwrap_or_else(|| schwert_lags(n)).min(n - 1);

    let mut partial = 0.0;
    let eta: f64 = resid
        .iter()
        .map(|r| {
            partial += r;
            partial * partial
        })
        .sum::<f64>()
        / (n * n) as f64;

    let mut long_run: f64 = resid.iter().map(|r| r * r).sum();
    for i in 1..=lags {
        let cross: f64 = resid[i..].iter().zip(&resid[..n - i]).map(|(a, b)| a * b).sum();
        long_run += 2.0 * cross * (1.0 - i as f64 / (lags as f64 + 1.0));
    }
    let long_run = long_run / n as f64;
    if !(long_run > 0.0) {
        return Err(StatsError::Degenerate(
            "long-run variance estimate is not positive".into(),
        ));
    }

    let statistic = eta / long_run;
    Ok(Kpss {
        statistic,
        p_value: interpolate_kpss(statistic),
        lags,
    })
}

fn interpolate_kpss(statistic: f64) -> f64 {
    if statistic <= KPSS_CRITICAL[0] {
        return KPSS_P_VALUES[0];
    }
    for i in 1..KPSS_CRITICAL.len() {
        if statistic <= KPSS_CRITICAL[i] {
            let (x0, x1) = (KPSS_CRITICAL[i - 1], KPSS_CRITICAL[i]);
            let (y0, y1) = (KPSS_P_VALUES[i - 1], KPSS_P_VALUES[i]);
            return y0 + (statistic - x0) * (y1 - y0) / (x1 - x0);
        }
    }
    KPSS_P_VALUES[KPSS_P_VALUES.len() - 1]
}

// ============================================================================
// Ljung-Box
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LjungBox {
    pub statistic: f64,
    pub p_value: f64,
    pub lags: usize,
}

/// Ljung-Box Q over lags `1..=lags`, with `lags` capped at `n - 1`.
pub fn ljung_box(series: &[f64], lags: usize) -> StatsResult<LjungBox> {
    let n = series.len();
    if lags == 0 || n < 2 {
        return Err(StatsError::InsufficientData {
            required: 2,
            actual: n,
        });
    }
    let lags = lags.min(n - 1);

    let m = mean(series);
    let centred: Vec<f64> = series.iter().map(|x| x - m).collect();
    let denominator: f64 = centred.iter().map(|d| d * d).sum();
    if !(denominator > 0.0) {
        return Err(StatsError::Degenerate("series is constant".into()));
    }

    let nf = n as f64;
    let statistic = nf
        * (nf + 2.0)
        * (1..=lags)
            .map(|k| {
                let acf: f64 = centred[k..]
                    .iter()
                    .zip(&centred[..n - k])
                    .map(|(a, b)| a * b)
                    .sum::<f64>()
                    / denominator;
                acf * acf / (nf - k as f64)
            })
            .sum::<f64>();

    Ok(LjungBox {
        statistic,
        p_value: chi2_sf(statistic, lags as f64)?,
        lags,
    })
}
