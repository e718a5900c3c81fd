//! Reference distribution tail probabilities.

use std::f64::consts::SQRT_2;

use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, StudentsT};
use statrs::function::erf::{erfc, erfc_inv};

use super::{StatsError, StatsResult};

/// Standard normal CDF.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / SQRT_2)
}

/// Standard normal upper tail.
pub fn normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / SQRT_2)
}

/// Standard normal quantile for `p` in (0, 1).
pub fn normal_ppf(p: f64) -> f64 {
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// Two-sided p-value for a standard normal statistic.
pub fn normal_two_sided(z: f64) -> f64 {
    (2.0 * normal_sf(z.abs())).min(1.0)
}

/// Two-sided p-value for Student's t with `df` degrees of freedom.
pub fn t_two_sided(t: f64, df: f64) -> StatsResult<f64> {
    if t.is_infinite() {
        return Ok(0.0);
    }
    let dist = StudentsT::new(0.0, 1.0, df).map_err(distribution_error)?;
    Ok((2.0 * dist.sf(t.abs())).min(1.0))
}

/// Upper tail of the F distribution.
pub fn f_sf(f: f64, df1: f64, df2: f64) -> StatsResult<f64> {
    if f.is_infinite() {
        return Ok(0.0);
    }
    let dist = FisherSnedecor::new(df1, df2).map_err(distribution_error)?;
    Ok(dist.sf(f.max(0.0)))
}

/// Upper tail of the chi-square distribution.
pub fn chi2_sf(x: f64, df: f64) -> StatsResult<f64> {
    if x.is_infinite() {
        return Ok(0.0);
    }
    let dist = ChiSquared::new(df).map_err(distribution_error)?;
    Ok(dist.sf(x.max(0.0)))
}

fn distribution_error<E: std::fmt::Display>(err: E) -> StatsError {
    StatsError::Distribution(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-12);
        assert!((normal_cdf(1.959964) - 0.975).abs() < 1e-6);
        assert!((normal_ppf(0.975) - 1.959964).abs() < 1e-5);
        assert!((normal_two_sided(-1.959964) - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_t_two_sided() {
        // t(10) critical value at 0.05 two-sided is 2.228
        let p = t_two_sided(2.228139, 10.0).unwrap();
        assert!((p - 0.05).abs() < 1e-4);
        assert!(t_two_sided(1.0, 0.0).is_err());
    }

    #[test]
    fn test_chi2_and_f() {
        // chi2(2) upper tail is exp(-x/2)
        let p = chi2_sf(3.0, 2.0).unwrap();
        assert!((p - (-1.5f64).exp()).abs() < 1e-9);

        // F(1, n) equals t(n) squared
        let p_f = f_sf(2.228139f64.powi(2), 1.0, 10.0).unwrap();
        assert!((p_f - 0.05).abs() < 1e-4);
    }
}
