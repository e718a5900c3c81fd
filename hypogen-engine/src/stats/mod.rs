//! Statistical kernels
//!
//! Pure functions over `f64` slices that back the executor's procedures.
//! Kernels never panic on degenerate input: zero variance, singular tables
//! and matrices, and too-short samples are returned as [`StatsError`].
//!
//! # Modules
//!
//! - [`descriptive`]: moments, ranks and tie counts
//! - [`distributions`]: tail probabilities of reference distributions
//! - [`normality`]: Shapiro-Wilk, Kolmogorov-Smirnov, Anderson-Darling, Jarque-Bera
//! - [`comparison`]: t-tests, rank tests, ANOVA, variance homogeneity
//! - [`correlation`]: Pearson, Spearman, Kendall
//! - [`categorical`]: contingency tables, chi-square, Fisher's exact
//! - [`timeseries`]: ADF, KPSS, Ljung-Box
//! - [`effect_size`]: Cohen's d, Hedges' g
//! - [`regression`]: ordinary least squares

pub mod categorical;
pub mod comparison;
pub mod correlation;
pub mod descriptive;
pub mod distributions;
pub mod effect_size;
pub mod normality;
pub mod regression;
pub mod timeseries;

use thiserror::Error;

/// Kernel errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Degenerate input: {0}")]
    Degenerate(String),

    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Distribution error: {0}")]
    Distribution(String),
}

pub type StatsResult<T> = Result<T, StatsError>;

pub(crate) fn require_len(values: &[f64], required: usize) -> StatsResult<()> {
    if values.len() < required {
        return Err(StatsError::InsufficientData {
            required,
            actual: values.len(),
        });
    }
    Ok(())
}
