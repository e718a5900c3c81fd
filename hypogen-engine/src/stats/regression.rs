//! Ordinary least squares.
//!
//! Solves the normal equations by Gauss-Jordan elimination with partial
//! pivoting, which also yields `(XᵀX)⁻¹` for coefficient standard errors.
//! Designs here are small (a handful of columns), so the normal equations are
//! adequate.

use super::descriptive::sum_of_squares;
use super::distributions::f_sf;
use super::{StatsError, StatsResult};

/// Relative pivot size below which a design is treated as singular.
const SINGULAR_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    pub coefficients: Vec<f64>,
    pub standard_errors: Vec<f64>,
    /// Sum of squared residuals
    pub ssr: f64,
    pub nobs: usize,
}

impl OlsFit {
    pub fn n_params(&self) -> usize {
        self.coefficients.len()
    }

    /// t statistic of coefficient `j`.
    pub fn t_value(&self, j: usize) -> f64 {
        self.coefficients[j] / self.standard_errors[j]
    }

    /// Gaussian log-likelihood at the ML variance estimate.
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.n_params() as f64
    }
}

/// Fit `y = Xβ + ε`. `design` holds one row per observation.
pub fn ols(design: &[Vec<f64>], y: &[f64]) -> StatsResult<OlsFit> {
    let nobs = y.len();
    if design.len() != nobs {
        return Err(StatsError::LengthMismatch {
            left: design.len(),
            right: nobs,
        });
    }
    let k = design.first().map_or(0, Vec::len);
    if k == 0 || nobs <= k {
        return Err(StatsError::InsufficientData {
            required: k + 1,
            actual: nobs,
        });
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &target) in design.iter().zip(y) {
        for i in 0..k {
            xty[i] += row[i] * target;
            for j in i..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[i][j] = xtx[j][i];
        }
    }

    let inverse = invert(xtx)?;
    let coefficients: Vec<f64> = inverse
        .iter()
        .map(|row| row.iter().zip(&xty).map(|(a, b)| a * b).sum())
        .collect();

    let ssr: f64 = design
        .iter()
        .zip(y)
        .map(|(row, &target)| {
            let fitted: f64 = row.iter().zip(&coefficients).map(|(x, b)| x * b).sum();
            (target - fitted).powi(2)
        })
        .sum();

    let sigma2 = ssr / (nobs - k) as f64;
    let standard_errors = (0..k)
        .map(|j| (sigma2 * inverse[j][j]).max(0.0).sqrt())
        .collect();

    Ok(OlsFit {
        coefficients,
        standard_errors,
        ssr,
        nobs,
    })
}

/// Gauss-Jordan inverse of a square matrix.
fn invert(mut matrix: Vec<Vec<f64>>) -> StatsResult<Vec<Vec<f64>>> {
    let k = matrix.len();
    let scale = matrix
        .iter()
        .enumerate()
        .map(|(i, row)| row[i].abs())
        .fold(0.0, f64::max)
        .max(f64::MIN_POSITIVE);

    let mut inverse: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..k {
        let pivot_row = (col..k)
            .max_by(|&a, &b| {
                matrix[a][col]
                    .abs()
                    .partial_cmp(&matrix[b][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);

        let pivot = matrix[pivot_row][col];
        if !(pivot.abs() > SINGULAR_TOLERANCE * scale) {
            return Err(StatsError::Degenerate(
                "design matrix is singular (collinear or constant regressors)".into(),
            ));
        }
        matrix.swap(col, pivot_row);
        inverse.swap(col, pivot_row);

        for j in 0..k {
            matrix[col][j] /= pivot;
            inverse[col][j] /= pivot;
        }

        for row in 0..k {
            if row == col {
                continue;
            }
            let factor = matrix[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..k {
                matrix[row][j] -= factor * matrix[col][j];
                inverse[row][j] -= factor * inverse[col][j];
            }
        }
    }

    Ok(inverse)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRegression {
    pub r_squared: f64,
    pub adjusted_r_squared: f64,
    pub f: f64,
    pub df_model: f64,
    pub df_residual: f64,
    pub p_value: f64,
    pub nobs: usize,
}

/// Regress `y` on predictor columns plus an intercept; overall F-test.
pub fn multiple_regression(y: &[f64], predictors: &[Vec<f64>]) -> StatsResult<LinearRegression> {
    let p = predictors.len();
    let n = y.len();
    if p == 0 {
        return Err(StatsError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }
    if let Some(column) = predictors.iter().find(|c| c.len() != n) {
        return Err(StatsError::LengthMismatch {
            left: column.len(),
            right: n,
        });
    }
    if n < p + 2 {
        return Err(StatsError::InsufficientData {
            required: p + 2,
            actual: n,
        });
    }

    let design: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            std::iter::once(1.0)
                .chain(predictors.iter().map(|c| c[i]))
                .collect()
        })
        .collect();

    let fit = ols(&design, y)?;
    let tss = sum_of_squares(y);
    if !(tss > 0.0) {
        return Err(StatsError::Degenerate("outcome has zero variance".into()));
    }

    let r_squared = (1.0 - fit.ssr / tss).clamp(0.0, 1.0);
    let df_model = p as f64;
    let df_residual = (n - p - 1) as f64;
    let f = if r_squared >= 1.0 {
        f64::INFINITY
    } else {
        (r_squared / df_model) / ((1.0 - r_squared) / df_residual)
    };

    Ok(LinearRegression {
        r_squared,
        adjusted_r_squared: 1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / df_residual,
        f,
        df_model,
        df_residual,
        p_value: f_sf(f, df_model, df_residual)?,
        nobs: n,
    })
}
