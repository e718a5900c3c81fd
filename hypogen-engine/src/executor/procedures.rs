//! Procedure implementations behind [`super::TestExecutor`].

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use super::TestError;
use crate::config::EngineConfig;
use crate::contracts::{
    ConfidenceInterval, GroupLayout, StatisticalTest, TestResult, TestSpecification, LAYOUT_PARAM,
};
use crate::dataset::{Column, ColumnType, Dataset};
use crate::stats::categorical::{chi_square_independence, fisher_exact, ContingencyTable};
use crate::stats::comparison::{
    bartlett, independent_t_test, kruskal_wallis, levene, mann_whitney_u, one_way_anova,
    paired_t_test, wilcoxon_signed_rank,
};
use crate::stats::correlation::{fisher_interval, kendall_tau, pearson, spearman};
use crate::stats::effect_size::{cohens_d, hedges_g, interpret_magnitude};
use crate::stats::normality::{
    anderson_darling_normal, jarque_bera, kolmogorov_smirnov_normal, shapiro_wilk,
};
use crate::stats::regression::multiple_regression;
use crate::stats::timeseries::{augmented_dickey_fuller, kpss, ljung_box};

/// Index of the 5% level in the Anderson-Darling critical values.
const ANDERSON_FIVE_PERCENT: usize = 2;

/// Dispatch a parsed, arity-checked specification.
pub(super) fn run(
    test: StatisticalTest,
    dataset: &Dataset,
    spec: &TestSpecification,
    config: &EngineConfig,
) -> Result<TestResult, TestError> {
    use StatisticalTest::*;

    let variables = spec.variables.as_slice();
    match test {
        ShapiroWilk | KolmogorovSmirnov | AndersonDarling | JarqueBera => {
            normality(test, dataset, variables, config)
        }
        TTestIndependent => t_test_independent(dataset, spec, config),
        TTestPaired => t_test_paired(dataset, variables, config),
        MannWhitneyU => mann_whitney(dataset, spec, config),
        WilcoxonSignedRank => wilcoxon(dataset, variables, config),
        AnovaOneWay => anova(dataset, spec, config),
        KruskalWallis | LeveneTest | BartlettTest => group_test(test, dataset, spec, config),
        PearsonCorrelation | SpearmanCorrelation | KendallTau => {
            correlation(test, dataset, variables, config)
        }
        ChiSquareIndependence => chi_square(dataset, variables, config),
        FisherExact => fisher(dataset, variables, config),
        AugmentedDickeyFuller => adf(dataset, variables, spec, config),
        KpssTest => kpss_test(dataset, variables, spec, config),
        LjungBox => ljung_box_test(dataset, variables, spec, config),
        CohensD | HedgesG => effect_size(test, dataset, spec),
        MultipleRegression => regression(dataset, variables, config),
        CausalInference => Err(TestError::NotExecutable(
            "causal effects need an experimental or quasi-experimental design, not a single test"
                .into(),
        )),
    }
}

// ============================================================================
// Column access
// ============================================================================

fn column<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a Column, TestError> {
    dataset
        .column(name)
        .ok_or_else(|| TestError::MissingColumn(name.to_string()))
}

fn numeric_cells<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a [Option<f64>], TestError> {
    column(dataset, name)?.as_numeric().ok_or_else(|| {
        TestError::InvalidTestSpecification(format!(
            "column '{}' is categorical; a numeric column is required",
            name
        ))
    })
}

/// Present values of a numeric column, in row order.
fn numeric_column(dataset: &Dataset, name: &str) -> Result<Vec<f64>, TestError> {
    Ok(numeric_cells(dataset, name)?.iter().flatten().copied().collect())
}

/// Two numeric columns with rows dropped pairwise.
fn paired_columns(dataset: &Dataset, a: &str, b: &str) -> Result<(Vec<f64>, Vec<f64>), TestError> {
    let left = numeric_cells(dataset, a)?;
    let right = numeric_cells(dataset, b)?;
    Ok(left
        .iter()
        .zip(right)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip())
}

fn labels(column: &Column, rows: usize) -> Vec<Option<String>> {
    (0..rows).map(|row| column.label(row)).collect()
}

/// Samples to compare, one per group.
struct Groups {
    labels: Vec<String>,
    samples: Vec<Vec<f64>>,
}

impl Groups {
    fn sizes(&self) -> Vec<usize> {
        self.samples.iter().map(Vec::len).collect()
    }
}

/// Explicit group layout from `params.layout`, if given.
fn group_layout(spec: &TestSpecification) -> Result<Option<GroupLayout>, TestError> {
    let Some(value) = spec.params.as_ref().and_then(|p| p.get(LAYOUT_PARAM)) else {
        return Ok(None);
    };
    serde_json::from_value(value.clone()).map(Some).map_err(|_| {
        TestError::InvalidTestSpecification(format!(
            "parameter '{}' must be \"grouped\" or \"columns\", got {}",
            LAYOUT_PARAM, value
        ))
    })
}

/// Resolve groups from either layout. An explicit `params.layout` wins;
/// otherwise `[categorical, numeric]` splits the outcome by grouping level
/// and any other list makes every variable one group.
fn resolve_groups(dataset: &Dataset, spec: &TestSpecification) -> Result<Groups, TestError> {
    let variables = spec.variables.as_slice();
    let grouped = match group_layout(spec)? {
        Some(GroupLayout::Grouped) => true,
        Some(GroupLayout::Columns) => false,
        None => {
            variables.len() == 2
                && dataset.column_type(&variables[0]) == Some(ColumnType::Categorical)
        }
    };

    if !grouped {
        let samples = variables
            .iter()
            .map(|name| numeric_column(dataset, name))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Groups {
            labels: variables.to_vec(),
            samples,
        });
    }

    if variables.len() != 2 {
        return Err(TestError::InvalidTestSpecification(format!(
            "the grouped layout takes [grouping, outcome], got {} variables",
            variables.len()
        )));
    }

    let grouping = column(dataset, &variables[0])?;
    let outcome = numeric_cells(dataset, &variables[1])?;

    let mut split: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (row, value) in outcome.iter().enumerate() {
        if let (Some(label), Some(value)) = (grouping.label(row), value) {
            split.entry(label).or_default().push(*value);
        }
    }
    if split.len() < 2 {
        return Err(TestError::InvalidTestSpecification(format!(
            "grouping variable '{}' has {} level(s); at least two are required",
            variables[0],
            split.len()
        )));
    }

    let (labels, samples) = split.into_iter().unzip();
    Ok(Groups { labels, samples })
}

fn resolve_two_groups(
    test: StatisticalTest,
    dataset: &Dataset,
    spec: &TestSpecification,
) -> Result<Groups, TestError> {
    let groups = resolve_groups(dataset, spec)?;
    if groups.samples.len() != 2 {
        return Err(TestError::InvalidTestSpecification(format!(
            "{} compares exactly two groups, but '{}' has {} levels",
            test,
            spec.variables[0],
            groups.samples.len()
        )));
    }
    Ok(groups)
}

// ============================================================================
// Reporting helpers
// ============================================================================

fn format_p(p: f64) -> String {
    if p < 1e-4 {
        "p < 0.0001".to_string()
    } else {
        format!("p = {:.4}", p)
    }
}

/// Parametric assumptions: Jarque-Bera normality in every sample and, when
/// requested, Brown-Forsythe equality of variances.
fn assumption_checks(samples: &[Vec<f64>], alpha: f64, equal_variance: bool) -> BTreeMap<String, bool> {
    let mut checks = BTreeMap::new();
    let normal = samples
        .iter()
        .all(|s| jarque_bera(s).map_or(false, |r| r.p_value > alpha));
    checks.insert("normality".to_string(), normal);
    if equal_variance {
        let homogeneous = levene(samples).map_or(false, |r| r.p_value > alpha);
        checks.insert("equal_variance".to_string(), homogeneous);
    }
    checks
}

fn correlation_strength(r: f64) -> &'static str {
    let magnitude = r.abs();
    if magnitude >= 0.7 {
        "strong"
    } else if magnitude >= 0.4 {
        "moderate"
    } else if magnitude >= 0.2 {
        "weak"
    } else {
        "negligible"
    }
}

/// Cohen's labels for eta-squared.
fn eta_squared_magnitude(eta_squared: f64) -> &'static str {
    if eta_squared < 0.01 {
        "negligible"
    } else if eta_squared < 0.06 {
        "small"
    } else if eta_squared < 0.14 {
        "medium"
    } else {
        "large"
    }
}

/// Cohen's labels for Cramér's V.
fn cramers_v_magnitude(v: f64) -> &'static str {
    if v < 0.1 {
        "negligible"
    } else if v < 0.3 {
        "small"
    } else if v < 0.5 {
        "medium"
    } else {
        "large"
    }
}

fn difference_phrase(p: f64, alpha: f64) -> &'static str {
    if p < alpha {
        "Significant difference"
    } else {
        "No significant difference"
    }
}

// ============================================================================
// Normality
// ============================================================================

fn normality(
    test: StatisticalTest,
    dataset: &Dataset,
    variables: &[String],
    config: &EngineConfig,
) -> Result<TestResult, TestError> {
    let values = numeric_column(dataset, &variables[0])?;
    let alpha = config.alpha_level;

    let (statistic, p_value, n) = match test {
        StatisticalTest::ShapiroWilk => {
            let sample = subsample(values, config);
            let result = shapiro_wilk(&sample)?;
            (result.statistic, result.p_value, result.n)
        }
        StatisticalTest::KolmogorovSmirnov => {
            let result = kolmogorov_smirnov_normal(&values)?;
            (result.statistic, result.p_value, result.n)
        }
        StatisticalTest::AndersonDarling => {
            let result = anderson_darling_normal(&values)?;
            let p = if result.statistic > result.critical_values[ANDERSON_FIVE_PERCENT] {
                0.05
            } else {
                0.10
            };
            (result.statistic, p, result.n)
        }
        _ => {
            let result = jarque_bera(&values)?;
            (result.statistic, result.p_value, result.n)
        }
    };

    let interpretation = if p_value > alpha {
        format!("Data is consistent with a normal distribution ({})", format_p(p_value))
    } else {
        format!("Data deviates from a normal distribution ({})", format_p(p_value))
    };

    Ok(TestResult::new(test, variables, statistic)
        .with_p_value(p_value)
        .with_sample_sizes(vec![n])
        .with_interpretation(interpretation))
}

/// Seeded subsample for Shapiro-Wilk above the configured ceiling.
fn subsample(values: Vec<f64>, config: &EngineConfig) -> Vec<f64> {
    if values.len() <= config.shapiro_max_samples {
        return values;
    }
    debug!(
        n = values.len(),
        max = config.shapiro_max_samples,
        "Subsampling for Shapiro-Wilk"
    );
    let mut rng = StdRng::seed_from_u64(config.random_seed);
    values
        .choose_multiple(&mut rng, config.shapiro_max_samples)
        .copied()
        .collect()
}

// ============================================================================
// Two-sample comparison
// ============================================================================

fn t_test_independent(
    dataset: &Dataset,
    spec: &TestSpecification,
    config: &EngineConfig,
) -> Result<TestResult, TestError> {
    let variables = spec.variables.as_slice();
    let groups = resolve_two_groups(StatisticalTest::TTestIndependent, dataset, spec)?;
    let result = independent_t_test(&groups.samples[0], &groups.samples[1])?;
    let alpha = config.alpha_level;

    Ok(TestResult::new(StatisticalTest::TTestIndependent, variables, result.t)
        .with_p_value(result.p_value)
        .with_sample_sizes(groups.sizes())
        .with_effect_size(result.effect_size)
        .with_assumptions(assumption_checks(&groups.samples, alpha, true))
        .with_interpretation(format!(
            "{} between '{}' and '{}' ({}); {} effect (d = {:.3})",
            difference_phrase(result.p_value, alpha),
            groups.labels[0],
            groups.labels[1],
            format_p(result.p_value),
            interpret_magnitude(result.effect_size),
            result.effect_size
        )))
}

fn t_test_paired(
    dataset: &Dataset,
    variables: &[String],
    config: &EngineConfig,
) -> Result<TestResult, TestError> {
    let (a, b) = paired_columns(dataset, &variables[0], &variables[1])?;
    let result = paired_t_test(&a, &b)?;
    let alpha = config.alpha_level;

    Ok(TestResult::new(StatisticalTest::TTestPaired, variables, result.t)
        .with_p_value(result.p_value)
        .with_sample_sizes(vec![a.len()])
        .with_effect_size(result.effect_size)
        .with_interpretation(format!(
            "{} between paired measurements ({}); {} effect (d = {:.3})",
            difference_phrase(result.p_value, alpha),
            format_p(result.p_value),
            interpret_magnitude(result.effect_size),
            result.effect_size
        )))
}

fn mann_whitney(
    dataset: &Dataset,
    spec: &TestSpecification,
    config: &EngineConfig,
) -> Result<TestResult, TestError> {
    let variables = spec.variables.as_slice();
    let groups = resolve_two_groups(StatisticalTest::MannWhitneyU, dataset, spec)?;
    let result = mann_whitney_u(&groups.samples[0], &groups.samples[1])?;

    Ok(TestResult::new(StatisticalTest::MannWhitneyU, variables, result.statistic)
        .with_p_value(result.p_value)
        .with_sample_sizes(groups.sizes())
        .with_interpretation(format!(
            "{} in distributions of '{}' and '{}' ({})",
            difference_phrase(result.p_value, config.alpha_level),
            groups.labels[0],
            groups.labels[1],
            format_p(result.p_value)
        )))
}

fn wilcoxon(
    dataset: &Dataset,
    variables: &[String],
    config: &EngineConfig,
) -> Result<TestResult, TestError> {
    let (a, b) = paired_columns(dataset, &variables[0], &variables[1])?;
    let result = wilcoxon_signed_rank(&a, &b)?;

    Ok(TestResult::new(StatisticalTest::WilcoxonSignedRank, variables, result.statistic)
        .with_p_value(result.p_value)
        .with_sample_sizes(vec![a.len()])
        .with_interpretation(format!(
            "{} between paired measurements ({})",
            difference_phrase(result.p_value, config.alpha_level),
            format_p(result.p_value)
        )))
}

// ============================================================================
// Multi-group comparison and variance homogeneity
// ============================================================================

fn anova(
    dataset: &Dataset,
    spec: &TestSpecification,
    config: &EngineConfig,
) -> Result<TestResult, TestError> {
    let variables = spec.variables.as_slice();
    let groups = resolve_groups(dataset, spec)?;
    let result = one_way_anova(&groups.samples)?;
    let alpha = config.alpha_level;

    Ok(TestResult::new(StatisticalTest::AnovaOneWay, variables, result.f)
        .with_p_value(result.p_value)
        .with_sample_sizes(groups.sizes())
        .with_effect_size(result.eta_squared)
        .with_assumptions(assumption_checks(&groups.samples, alpha, true))
        .with_interpretation(format!(
            "{} across {} groups (F({}, {}) = {:.3}, {}); {} effect (eta² = {:.3})",
            difference_phrase(result.p_value, alpha),
            groups.samples.len(),
            result.df_between,
            result.df_within,
            result.f,
            format_p(result.p_value),
            eta_squared_magnitude(result.eta_squared),
            result.eta_squared
        )))
}

fn group_test(
    test: StatisticalTest,
    dataset: &Dataset,
    spec: &TestSpecification,
    config: &EngineConfig,
) -> Result<TestResult, TestError> {
    let variables = spec.variables.as_slice();
    let groups = resolve_groups(dataset, spec)?;
    let result = match test {
        StatisticalTest::KruskalWallis => kruskal_wallis(&groups.samples)?,
        StatisticalTest::LeveneTest => levene(&groups.samples)?,
        _ => bartlett(&groups.samples)?,
    };
    let alpha = config.alpha_level;

    let interpretation = match test {
        StatisticalTest::KruskalWallis => format!(
            "{} in distributions across {} groups ({})",
            difference_phrase(result.p_value, alpha),
            groups.samples.len(),
            format_p(result.p_value)
        ),
        _ if result.p_value > alpha => format!(
            "Variances are homogeneous across groups ({})",
            format_p(result.p_value)
        ),
        _ => format!(
            "Variances differ across groups ({})",
            format_p(result.p_value)
        ),
    };

    Ok(TestResult::new(test, variables, result.statistic)
        .with_p_value(result.p_value)
        .with_sample_sizes(groups.sizes())
        .with_interpretation(interpretation))
}

// ============================================================================
// Correlation
// ============================================================================

fn correlation(
    test: StatisticalTest,
    dataset: &Dataset,
    variables: &[String],
    config: &EngineConfig,
) -> Result<TestResult, TestError> {
    let (x, y) = paired_columns(dataset, &variables[0], &variables[1])?;
    let result = match test {
        StatisticalTest::PearsonCorrelation => pearson(&x, &y)?,
        StatisticalTest::SpearmanCorrelation => spearman(&x, &y)?,
        _ => kendall_tau(&x, &y)?,
    };
    let r = result.coefficient;
    let direction = if r >= 0.0 { "positive" } else { "negative" };
    let significance = if result.p_value < config.alpha_level {
        "significant"
    } else {
        "non-significant"
    };

    let mut test_result = TestResult::new(test, variables, r)
        .with_p_value(result.p_value)
        .with_sample_sizes(vec![result.n])
        .with_effect_size(r)
        .with_interpretation(format!(
            "{} {} {} correlation (r = {:.3}, {})",
            capitalize(correlation_strength(r)),
            significance,
            direction,
            r,
            format_p(result.p_value)
        ));

    if test == StatisticalTest::PearsonCorrelation {
        if let Some((lower, upper)) = fisher_interval(r, result.n) {
            test_result = test_result.with_confidence_interval(ConfidenceInterval {
                lower,
                upper,
                level: 0.95,
            });
        }
        test_result = test_result.with_assumptions(assumption_checks(
            &[x, y],
            config.alpha_level,
            false,
        ));
    }
    Ok(test_result)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Categorical association
// ============================================================================

fn contingency_table(dataset: &Dataset, variables: &[String]) -> Result<ContingencyTable, TestError> {
    let rows = dataset.row_count();
    let first = labels(column(dataset, &variables[0])?, rows);
    let second = labels(column(dataset, &variables[1])?, rows);
    Ok(ContingencyTable::from_labels(&first, &second))
}

fn chi_square(
    dataset: &Dataset,
    variables: &[String],
    config: &EngineConfig,
) -> Result<TestResult, TestError> {
    let table = contingency_table(dataset, variables)?;
    let result = chi_square_independence(&table)?;
    let association = if result.p_value < config.alpha_level {
        "Significant association"
    } else {
        "No significant association"
    };

    Ok(TestResult::new(StatisticalTest::ChiSquareIndependence, variables, result.statistic)
        .with_p_value(result.p_value)
        .with_sample_sizes(vec![result.n as usize])
        .with_effect_size(result.cramers_v)
        .with_interpretation(format!(
            "{} between '{}' and '{}' (chi² = {:.3}, df = {}, {}); {} effect (Cramér's V = {:.3})",
            association,
            variables[0],
            variables[1],
            result.statistic,
            result.df,
            format_p(result.p_value),
            cramers_v_magnitude(result.cramers_v),
            result.cramers_v
        )))
}

fn fisher(
    dataset: &Dataset,
    variables: &[String],
    config: &EngineConfig,
) -> Result<TestResult, TestError> {
    let table = contingency_table(dataset, variables)?;
    let result = fisher_exact(&table)?;
    let association = if result.p_value < config.alpha_level {
        "Significant association"
    } else {
        "No significant association"
    };

    let mut test_result =
        TestResult::new(StatisticalTest::FisherExact, variables, result.odds_ratio)
            .with_p_value(result.p_value)
            .with_sample_sizes(vec![result.n as usize])
            .with_interpretation(format!(
                "{} in the 2x2 table ({}); odds ratio = {:.3}",
                association,
                format_p(result.p_value),
                result.odds_ratio
            ));
    if result.odds_ratio.is_finite() {
        test_result = test_result.with_effect_size(result.odds_ratio);
    }
    Ok(test_result)
}

// ============================================================================
// Time series
// ============================================================================

fn lag_param(spec: &TestSpecification, key: &str) -> Result<Option<usize>, TestError> {
    let Some(value) = spec.params.as_ref().and_then(|p| p.get(key)) else {
        return Ok(None);
    };
    match spec.usize_param(key) {
        Some(lags) if lags > 0 => Ok(Some(lags as usize)),
        _ => Err(TestError::InvalidTestSpecification(format!(
            "parameter '{}' must be a positive integer, got {}",
            key, value
        ))),
    }
}

fn adf(
    dataset: &Dataset,
    variables: &[String],
    spec: &TestSpecification,
    config: &EngineConfig,
) -> Result<TestResult, TestError> {
    let series = numeric_column(dataset, &variables[0])?;
    let result = augmented_dickey_fuller(&series, lag_param(spec, "max_lag")?)?;

    // H0 is a unit root: a small p-value indicates stationarity
    let verdict = if result.p_value < config.alpha_level {
        "Series is stationary (unit root rejected"
    } else {
        "Series is non-stationary (unit root not rejected"
    };
    let critical_5 = result
        .critical_values
        .iter()
        .find(|(level, _)| (*level - 0.05).abs() < 1e-12)
        .map_or(f64::NAN, |(_, value)| *value);

    Ok(TestResult::new(StatisticalTest::AugmentedDickeyFuller, variables, result.statistic)
        .with_p_value(result.p_value)
        .with_sample_sizes(vec![result.nobs])
        .with_interpretation(format!(
            "{}, {}; lags = {}, 5% critical value = {:.3})",
            verdict,
            format_p(result.p_value),
            result.used_lag,
            critical_5
        )))
}

fn kpss_test(
    dataset: &Dataset,
    variables: &[String],
    spec: &TestSpecification,
    config: &EngineConfig,
) -> Result<TestResult, TestError> {
    let series = numeric_column(dataset, &variables[0])?;
    let result = kpss(&series, lag_param(spec, "lags")?)?;

    // H0 is stationarity: a small p-value indicates non-stationarity
    let verdict = if result.p_value < config.alpha_level {
        "Series is not level-stationary (stationarity rejected"
    } else {
        "Series is level-stationary (stationarity not rejected"
    };

    Ok(TestResult::new(StatisticalTest::KpssTest, variables, result.statistic)
        .with_p_value(result.p_value)
        .with_sample_sizes(vec![series.len()])
        .with_interpretation(format!(
            "{}, {}; lags = {}; p-value is interpolated within [0.01, 0.10])",
            verdict,
            format_p(result.p_value),
            result.lags
        )))
}

fn ljung_box_test(
    dataset: &Dataset,
    variables: &[String],
    spec: &TestSpecification,
    config: &EngineConfig,
) -> Result<TestResult, TestError> {
    let series = numeric_column(dataset, &variables[0])?;
    let lags = lag_param(spec, "lags")?.unwrap_or(config.ljung_box_lags);
    let result = ljung_box(&series, lags)?;

    let verdict = if result.p_value < config.alpha_level {
        "Significant autocorrelation"
    } else {
        "No significant autocorrelation"
    };

    Ok(TestResult::new(StatisticalTest::LjungBox, variables, result.statistic)
        .with_p_value(result.p_value)
        .with_sample_sizes(vec![series.len()])
        .with_interpretation(format!(
            "{} up to lag {} (Q = {:.3}, {})",
            verdict,
            result.lags,
            result.statistic,
            format_p(result.p_value)
        )))
}

// ============================================================================
// Effect sizes
// ============================================================================

fn effect_size(
    test: StatisticalTest,
    dataset: &Dataset,
    spec: &TestSpecification,
) -> Result<TestResult, TestError> {
    let variables = spec.variables.as_slice();
    let groups = resolve_two_groups(test, dataset, spec)?;
    let (a, b) = (&groups.samples[0], &groups.samples[1]);
    let (value, symbol) = match test {
        StatisticalTest::HedgesG => (hedges_g(a, b)?, "g"),
        _ => (cohens_d(a, b)?, "d"),
    };

    Ok(TestResult::new(test, variables, value)
        .with_sample_sizes(groups.sizes())
        .with_effect_size(value)
        .with_interpretation(format!(
            "{} effect between '{}' and '{}' ({} = {:.3})",
            capitalize(interpret_magnitude(value)),
            groups.labels[0],
            groups.labels[1],
            symbol,
            value
        )))
}

// ============================================================================
// Regression
// ============================================================================

/// OLS of the first variable on the rest. Categorical predictors are one-hot
/// encoded with the first level dropped; rows are complete cases.
fn regression(
    dataset: &Dataset,
    variables: &[String],
    config: &EngineConfig,
) -> Result<TestResult, TestError> {
    let outcome = numeric_cells(dataset, &variables[0])?;
    let columns = variables
        .iter()
        .map(|name| column(dataset, name))
        .collect::<Result<Vec<_>, _>>()?;
    let rows: Vec<usize> = (0..dataset.row_count())
        .filter(|&row| columns.iter().all(|c| !c.is_missing(row)))
        .collect();

    let y: Vec<f64> = rows.iter().filter_map(|&row| outcome[row]).collect();

    let mut design: Vec<Vec<f64>> = Vec::new();
    for predictor in &columns[1..] {
        match predictor.as_numeric() {
            Some(cells) => design.push(rows.iter().filter_map(|&row| cells[row]).collect()),
            None => {
                let row_labels: Vec<String> = rows
                    .iter()
                    .map(|&row| predictor.label(row).unwrap_or_default())
                    .collect();
                let levels: BTreeSet<&str> = row_labels.iter().map(String::as_str).collect();
                if levels.len() < 2 {
                    return Err(TestError::Degenerate(format!(
                        "predictor '{}' has a single level",
                        predictor.name()
                    )));
                }
                for level in levels.iter().skip(1) {
                    design.push(
                        row_labels
                            .iter()
                            .map(|l| if l == level { 1.0 } else { 0.0 })
                            .collect(),
                    );
                }
            }
        }
    }

    let result = multiple_regression(&y, &design)?;
    let significance = if result.p_value < config.alpha_level {
        "significantly predicts"
    } else {
        "does not significantly predict"
    };

    Ok(TestResult::new(StatisticalTest::MultipleRegression, variables, result.f)
        .with_p_value(result.p_value)
        .with_sample_sizes(vec![result.nobs])
        .with_effect_size(result.r_squared)
        .with_interpretation(format!(
            "Model {} '{}': R² = {:.3} (adjusted {:.3}), F({}, {}) = {:.3}, {}",
            significance,
            variables[0],
            result.r_squared,
            result.adjusted_r_squared,
            result.df_model,
            result.df_residual,
            result.f,
            format_p(result.p_value)
        )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    fn create_test_dataset() -> Dataset {
        let n = 60;
        let treatment: Vec<Option<String>> = (0..n)
            .map(|i| Some(if i < 30 { "control" } else { "treated" }.to_string()))
            .collect();
        let tier: Vec<Option<String>> = (0..n)
            .map(|i| Some(["bronze", "silver", "gold"][i % 3].to_string()))
            .collect();
        let score: Vec<Option<f64>> = (0..n)
            .map(|i| {
                let base = if i < 30 { 50.0 } else { 58.0 };
                Some(base + ((i * 7) % 11) as f64 - 5.0)
            })
            .collect();
        let before: Vec<Option<f64>> = (0..n).map(|i| Some(100.0 + ((i * 13) % 17) as f64)).collect();
        let after: Vec<Option<f64>> = (0..n)
            .map(|i| Some(104.0 + ((i * 13) % 17) as f64 + ((i * 5) % 3) as f64))
            .collect();
        let mut trend: Vec<Option<f64>> = (0..n).map(|i| Some(i as f64 * 1.5)).collect();
        trend[4] = None;

        Dataset::new(vec![
            Column::categorical("treatment", treatment),
            Column::categorical("tier", tier),
            Column::numeric("score", score),
            Column::numeric("before", before),
            Column::numeric("after", after),
            Column::numeric("trend", trend),
        ])
        .unwrap()
    }

    fn run_test(test: StatisticalTest, variables: &[&str]) -> Result<TestResult, TestError> {
        let spec = TestSpecification::new(
            test.as_str(),
            variables.iter().map(|v| v.to_string()).collect(),
        );
        run(test, &create_test_dataset(), &spec, &EngineConfig::default())
    }

    #[test]
    fn test_grouped_t_test() {
        let result = run_test(StatisticalTest::TTestIndependent, &["treatment", "score"]).unwrap();
        assert_eq!(result.sample_sizes, vec![30, 30]);
        assert!(result.p_value.unwrap() < 0.001);
        // control minus treated is negative
        assert!(result.effect_size.unwrap() < -1.0);
        let assumptions = result.assumptions_met.unwrap();
        assert!(assumptions.contains_key("normality"));
        assert!(assumptions.contains_key("equal_variance"));
    }

    #[test]
    fn test_two_sample_test_rejects_three_levels() {
        let err = run_test(StatisticalTest::MannWhitneyU, &["tier", "score"]).unwrap_err();
        assert!(matches!(err, TestError::InvalidTestSpecification(_)));
    }

    #[test]
    fn test_grouped_anova_three_levels() {
        let result = run_test(StatisticalTest::AnovaOneWay, &["tier", "score"]).unwrap();
        assert_eq!(result.sample_sizes, vec![20, 20, 20]);
        let eta = result.effect_size.unwrap();
        assert!((0.0..=1.0).contains(&eta));
    }

    fn create_numeric_group_dataset() -> Dataset {
        let region: Vec<Option<f64>> = (0..90).map(|i| Some((i % 3 + 1) as f64)).collect();
        let sales: Vec<Option<f64>> = (0..90).map(|i| Some(500.0 + ((i / 3) % 10) as f64)).collect();
        Dataset::new(vec![
            Column::numeric("region", region),
            Column::numeric("sales", sales),
        ])
        .unwrap()
    }

    #[test]
    fn test_grouped_layout_with_numeric_codes() {
        let dataset = create_numeric_group_dataset();
        let config = EngineConfig::default();
        let variables = vec!["region".to_string(), "sales".to_string()];

        let spec = TestSpecification::new("anova_one_way", variables.clone())
            .with_layout(GroupLayout::Grouped);
        let result = run(StatisticalTest::AnovaOneWay, &dataset, &spec, &config).unwrap();
        assert_eq!(result.sample_sizes, vec![30, 30, 30]);
        assert!(result.p_value.unwrap() > 0.5);

        let spec = TestSpecification::new("kruskal_wallis", variables.clone())
            .with_layout(GroupLayout::Grouped);
        let result = run(StatisticalTest::KruskalWallis, &dataset, &spec, &config).unwrap();
        assert_eq!(result.sample_sizes, vec![30, 30, 30]);

        // Without a layout a numeric first column is a sample of its own
        let spec = TestSpecification::new("anova_one_way", variables);
        let result = run(StatisticalTest::AnovaOneWay, &dataset, &spec, &config).unwrap();
        assert_eq!(result.sample_sizes, vec![90, 90]);
    }

    #[test]
    fn test_grouped_layout_rejects_bad_values() {
        let dataset = create_numeric_group_dataset();
        let config = EngineConfig::default();

        let spec = TestSpecification::new("anova_one_way", vec!["region".into(), "sales".into()])
            .with_params(serde_json::json!({ "layout": "stacked" }));
        let err = run(StatisticalTest::AnovaOneWay, &dataset, &spec, &config).unwrap_err();
        assert!(matches!(err, TestError::InvalidTestSpecification(_)));

        let spec = TestSpecification::new(
            "anova_one_way",
            vec!["region".into(), "sales".into(), "region".into()],
        )
        .with_layout(GroupLayout::Grouped);
        let err = run(StatisticalTest::AnovaOneWay, &dataset, &spec, &config).unwrap_err();
        assert!(matches!(err, TestError::InvalidTestSpecification(_)));
    }

    #[test]
    fn test_wide_layout_levene() {
        let result = run_test(StatisticalTest::LeveneTest, &["before", "after", "score"]).unwrap();
        assert_eq!(result.sample_sizes, vec![60, 60, 60]);
        assert!(result.p_value.is_some());
    }

    #[test]
    fn test_paired_tests() {
        let t = run_test(StatisticalTest::TTestPaired, &["before", "after"]).unwrap();
        assert!(t.statistic < 0.0);
        assert!(t.p_value.unwrap() < 0.001);

        let w = run_test(StatisticalTest::WilcoxonSignedRank, &["before", "after"]).unwrap();
        assert!(w.p_value.unwrap() < 0.001);
    }

    #[test]
    fn test_pearson_drops_missing_pairwise() {
        let result = run_test(StatisticalTest::PearsonCorrelation, &["trend", "before"]).unwrap();
        assert_eq!(result.sample_sizes, vec![59]);
        let interval = result.confidence_interval.unwrap();
        assert!(interval.lower <= result.statistic && result.statistic <= interval.upper);
        assert_eq!(interval.level, 0.95);
    }

    #[test]
    fn test_correlation_needs_numeric() {
        let err = run_test(StatisticalTest::SpearmanCorrelation, &["tier", "score"]).unwrap_err();
        assert!(matches!(err, TestError::InvalidTestSpecification(_)));
    }

    #[test]
    fn test_fisher_requires_2x2() {
        let err = run_test(StatisticalTest::FisherExact, &["tier", "treatment"]).unwrap_err();
        assert!(matches!(err, TestError::InvalidTestSpecification(_)));
        assert_eq!(err.kind(), crate::contracts::FailureKind::Specification);
    }

    #[test]
    fn test_chi_square_cramers_v() {
        let result = run_test(StatisticalTest::ChiSquareIndependence, &["tier", "treatment"]).unwrap();
        assert_eq!(result.sample_sizes, vec![60]);
        let v = result.effect_size.unwrap();
        assert!((0.0..=1.0).contains(&v));
    }

    #[test]
    fn test_effect_sizes_have_no_p_value() {
        let d = run_test(StatisticalTest::CohensD, &["treatment", "score"]).unwrap();
        let g = run_test(StatisticalTest::HedgesG, &["treatment", "score"]).unwrap();
        assert!(d.p_value.is_none());
        assert!(g.p_value.is_none());
        assert!(g.statistic.abs() < d.statistic.abs());
    }

    #[test]
    fn test_ljung_box_lag_parameter() {
        let dataset = create_test_dataset();
        let config = EngineConfig::default();
        let spec = TestSpecification::new("ljung_box", vec!["trend".into()])
            .with_params(serde_json::json!({ "lags": 5 }));
        let result = run(StatisticalTest::LjungBox, &dataset, &spec, &config).unwrap();
        assert!(result.interpretation.unwrap().contains("lag 5"));
        assert_eq!(result.sample_sizes, vec![59]);

        let long = spec.clone().with_params(serde_json::json!({ "lags": 500 }));
        let result = run(StatisticalTest::LjungBox, &dataset, &long, &config).unwrap();
        assert!(result.interpretation.unwrap().contains("lag 58"));

        let bad = spec.with_params(serde_json::json!({ "lags": "many" }));
        assert!(matches!(
            run(StatisticalTest::LjungBox, &dataset, &bad, &config),
            Err(TestError::InvalidTestSpecification(_))
        ));
    }

    #[test]
    fn test_regression_with_categorical_predictor() {
        let result = run_test(StatisticalTest::MultipleRegression, &["score", "before", "treatment"]).unwrap();
        assert_eq!(result.sample_sizes, vec![60]);
        let r2 = result.effect_size.unwrap();
        assert!(r2 > 0.3 && r2 <= 1.0);
        assert!(result.p_value.unwrap() < 0.05);
    }

    #[test]
    fn test_shapiro_subsample_is_deterministic() {
        let config = EngineConfig {
            shapiro_max_samples: 10,
            ..EngineConfig::default()
        };
        let values: Vec<f64> = (0..50).map(|i| (i as f64 * 0.37).sin()).collect();
        let first = subsample(values.clone(), &config);
        let second = subsample(values, &config);
        assert_eq!(first.len(), 10);
        assert_eq!(first, second);
    }

    #[test]
    fn test_normality_interpretation() {
        let result = run_test(StatisticalTest::AndersonDarling, &["score"]).unwrap();
        let p = result.p_value.unwrap();
        assert!(p == 0.05 || p == 0.10);
        assert!(result.interpretation.is_some());
    }
}
