//! Two-sample and multi-group comparisons.
//!
//! Rank tests use average ranks for ties. Mann-Whitney U uses the normal
//! approximation with tie and continuity corrections. Wilcoxon signed-rank
//! drops zero differences and uses the exact null distribution for up to 50
//! untied pairs, otherwise the tie-corrected normal approximation. Levene's
//! test is centred on group medians (Brown-Forsythe).

use super::descriptive::{average_ranks, mean, median, tie_correction_sum, variance};
use super::distributions::{chi2_sf, f_sf, normal_sf, normal_two_sided, t_two_sided};
use super::effect_size::pooled_std;
use super::{require_len, StatsError, StatsResult};

/// Largest signed-rank sample evaluated with the exact distribution.
pub const WILCOXON_EXACT_MAX_N: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTest {
    pub t: f64,
    pub df: f64,
    pub p_value: f64,
    /// Cohen's d (independent) or mean difference over its std (paired)
    pub effect_size: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankTest {
    pub statistic: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anova {
    pub f: f64,
    pub df_between: f64,
    pub df_within: f64,
    pub p_value: f64,
    pub eta_squared: f64,
}

/// Result of a test with a single statistic and p-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupTest {
    pub statistic: f64,
    pub p_value: f64,
    pub df: f64,
}

/// Student's t-test with pooled variance.
pub fn independent_t_test(a: &[f64], b: &[f64]) -> StatsResult<TTest> {
    let pooled = pooled_std(a, b)?;
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let difference = mean(a) - mean(b);

    let t = difference / (pooled * (1.0 / n1 + 1.0 / n2).sqrt());
    let df = n1 + n2 - 2.0;

    Ok(TTest {
        t,
        df,
        p_value: t_two_sided(t, df)?,
        effect_size: difference / pooled,
    })
}

/// Paired t-test on `a[i] − b[i]`.
pub fn paired_t_test(a: &[f64], b: &[f64]) -> StatsResult<TTest> {
    if a.len() != b.len() {
        return Err(StatsError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    require_len(a, 2)?;

    let differences: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    let mean_diff = mean(&differences);
    let sd_diff = variance(&differences).sqrt();
    if !(sd_diff > 0.0) {
        return Err(StatsError::Degenerate("differences have zero variance".into()));
    }

    let n = differences.len() as f64;
    let t = mean_diff / (sd_diff / n.sqrt());
    let df = n - 1.0;

    Ok(TTest {
        t,
        df,
        p_value: t_two_sided(t, df)?,
        effect_size: mean_diff / sd_diff,
    })
}

/// Mann-Whitney U. The statistic is U for the first sample.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> StatsResult<RankTest> {
    require_len(a, 1)?;
    require_len(b, 1)?;
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let n = n1 + n2;

    let combined: Vec<f64> = a.iter().chain(b).copied().collect();
    let ranks = average_ranks(&combined);
    let rank_sum_a: f64 = ranks[..a.len()].iter().sum();

    let u1 = rank_sum_a - n1 * (n1 + 1.0) / 2.0;
    let u2 = n1 * n2 - u1;
    let mu = n1 * n2 / 2.0;

    let ties = tie_correction_sum(&combined);
    let sigma = (n1 * n2 / 12.0 * ((n + 1.0) - ties / (n * (n - 1.0)))).sqrt();
    if !(sigma > 0.0) {
        return Err(StatsError::Degenerate("all observations are tied".into()));
    }

    let z = (u1.max(u2) - mu - 0.5) / sigma;
    Ok(RankTest {
        statistic: u1,
        p_value: (2.0 * normal_sf(z)).clamp(0.0, 1.0),
    })
}

/// Wilcoxon signed-rank on paired samples. The statistic is
/// `min(W+, W−)`.
pub fn wilcoxon_signed_rank(a: &[f64], b: &[f64]) -> StatsResult<RankTest> {
    if a.len() != b.len() {
        return Err(StatsError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let differences: Vec<f64> = a
        .iter()
        .zip(b)
        .map(|(x, y)| x - y)
        .filter(|d| *d != 0.0)
        .collect();
    if differences.is_empty() {
        return Err(StatsError::Degenerate("all paired differences are zero".into()));
    }

    let magnitudes: Vec<f64> = differences.iter().map(|d| d.abs()).collect();
    let ranks = average_ranks(&magnitudes);
    let w_plus: f64 = differences
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();

    let n = differences.len();
    let nf = n as f64;
    let total = nf * (nf + 1.0) / 2.0;
    let statistic = w_plus.min(total - w_plus);
    let ties = tie_correction_sum(&magnitudes);

    let p_value = if ties == 0.0 && n <= WILCOXON_EXACT_MAX_N {
        (2.0 * signed_rank_cdf(n, statistic)).min(1.0)
    } else {
        let expected = total / 2.0;
        let var = nf * (nf + 1.0) * (2.0 * nf + 1.0) / 24.0 - ties / 48.0;
        if !(var > 0.0) {
            return Err(StatsError::Degenerate("signed-rank variance is zero".into()));
        }
        normal_two_sided((statistic - expected) / var.sqrt())
    };

    Ok(RankTest { statistic, p_value })
}

/// `P(W+ ≤ w)` under the null for `n` untied ranks.
fn signed_rank_cdf(n: usize, w: f64) -> f64 {
    let max_sum = n * (n + 1) / 2;
    let mut counts = vec![0.0f64; max_sum + 1];
    counts[0] = 1.0;
    for rank in 1..=n {
        for sum in (rank..=max_sum).rev() {
            counts[sum] += counts[sum - rank];
        }
    }

    let limit = w.floor().max(0.0) as usize;
    let favourable: f64 = counts.iter().take(limit.min(max_sum) + 1).sum();
    favourable / 2f64.powi(n as i32)
}

fn check_groups(groups: &[Vec<f64>], min_per_group: usize) -> StatsResult<()> {
    if groups.len() < 2 {
        return Err(StatsError::InsufficientData {
            required: 2,
            actual: groups.len(),
        });
    }
    for group in groups {
        require_len(group, min_per_group)?;
    }
    Ok(())
}

/// One-way ANOVA with eta-squared.
pub fn one_way_anova(groups: &[Vec<f64>]) -> StatsResult<Anova> {
    check_groups(groups, 1)?;

    let all: Vec<f64> = groups.iter().flatten().copied().collect();
    let grand_mean = mean(&all);
    let k = groups.len() as f64;
    let n = all.len() as f64;
    if n - k < 1.0 {
        return Err(StatsError::InsufficientData {
            required: groups.len() + 1,
            actual: all.len(),
        });
    }

    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in groups {
        let group_mean = mean(group);
        ss_between += group.len() as f64 * (group_mean - grand_mean).powi(2);
        ss_within += group.iter().map(|v| (v - group_mean).powi(2)).sum::<f64>();
    }
    if !(ss_within > 0.0) {
        return Err(StatsError::Degenerate("zero within-group variance".into()));
    }

    let df_between = k - 1.0;
    let df_within = n - k;
    let f = (ss_between / df_between) / (ss_within / df_within);

    Ok(Anova {
        f,
        df_between,
        df_within,
        p_value: f_sf(f, df_between, df_within)?,
        eta_squared: ss_between / (ss_between + ss_within),
    })
}

/// Kruskal-Wallis H with tie correction.
pub fn kruskal_wallis(groups: &[Vec<f64>]) -> StatsResult<GroupTest> {
    check_groups(groups, 1)?;

    let all: Vec<f64> = groups.iter().flatten().copied().collect();
    let ranks = average_ranks(&all);
    let n = all.len() as f64;

    let mut offset = 0;
    let mut weighted = 0.0;
    for group in groups {
        let rank_sum: f64 = ranks[offset..offset + group.len()].iter().sum();
        weighted += rank_sum * rank_sum / group.len() as f64;
        offset += group.len();
    }

    let correction = 1.0 - tie_correction_sum(&all) / (n * n * n - n);
    if !(correction > 0.0) {
        return Err(StatsError::Degenerate("all observations are tied".into()));
    }

    let h = (12.0 / (n * (n + 1.0)) * weighted - 3.0 * (n + 1.0)) / correction;
    let df = groups.len() as f64 - 1.0;

    Ok(GroupTest {
        statistic: h,
        p_value: chi2_sf(h, df)?,
        df,
    })
}

/// Levene's test centred on medians.
pub fn levene(groups: &[Vec<f64>]) -> StatsResult<GroupTest> {
    check_groups(groups, 2)?;

    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| {
            let center = median(g);
            g.iter().map(|v| (v - center).abs()).collect()
        })
        .collect();

    let anova = one_way_anova(&deviations)?;
    Ok(GroupTest {
        statistic: anova.f,
        p_value: anova.p_value,
        df: anova.df_between,
    })
}

/// Bartlett's test for equal variances.
pub fn bartlett(groups: &[Vec<f64>]) -> StatsResult<GroupTest> {
    check_groups(groups, 2)?;

    let k = groups.len() as f64;
    let n: f64 = groups.iter().map(|g| g.len() as f64).sum();

    let variances: Vec<f64> = groups.iter().map(|g| variance(g)).collect();
    if variances.iter().any(|v| !(*v > 0.0)) {
        return Err(StatsError::Degenerate("a group has zero variance".into()));
    }

    let pooled = groups
        .iter()
        .zip(&variances)
        .map(|(g, v)| (g.len() as f64 - 1.0) * v)
        .sum::<f64>()
        / (n - k);

    let numerator = (n - k) * pooled.ln()
        - groups
            .iter()
            .zip(&variances)
            .map(|(g, v)| (g.len() as f64 - 1.0) * v.ln())
            .sum::<f64>();
    let reciprocal_sum: f64 = groups.iter().map(|g| 1.0 / (g.len() as f64 - 1.0)).sum();
    let denominator = 1.0 + (reciprocal_sum - 1.0 / (n - k)) / (3.0 * (k - 1.0));

    let statistic = numerator / denominator;
    let df = k - 1.0;
    Ok(GroupTest {
        statistic,
        p_value: chi2_sf(statistic, df)?,
        df,
    })
}
