//! Contingency tables and tests of association.

use std::collections::{BTreeMap, BTreeSet};

use statrs::function::factorial::ln_factorial;

use super::distributions::chi2_sf;
use super::{StatsError, StatsResult};

/// Cross-tabulated counts with sorted row and column levels.
#[derive(Debug, Clone, PartialEq)]
pub struct ContingencyTable {
    pub row_levels: Vec<String>,
    pub column_levels: Vec<String>,
    pub counts: Vec<Vec<u64>>,
}

impl ContingencyTable {
    /// Cross-tabulate label pairs. Pairs with a missing label are dropped.
    pub fn from_labels(rows: &[Option<String>], columns: &[Option<String>]) -> Self {
        let mut cells: BTreeMap<(&str, &str), u64> = BTreeMap::new();
        let mut row_set = BTreeSet::new();
        let mut column_set = BTreeSet::new();

        for (r, c) in rows.iter().zip(columns) {
            if let (Some(r), Some(c)) = (r, c) {
                *cells.entry((r.as_str(), c.as_str())).or_default() += 1;
                row_set.insert(r.as_str());
                column_set.insert(c.as_str());
            }
        }

        let row_levels: Vec<String> = row_set.iter().map(|s| s.to_string()).collect();
        let column_levels: Vec<String> = column_set.iter().map(|s| s.to_string()).collect();
        let counts = row_levels
            .iter()
            .map(|r| {
                column_levels
                    .iter()
                    .map(|c| cells.get(&(r.as_str(), c.as_str())).copied().unwrap_or(0))
                    .collect()
            })
            .collect();

        Self {
            row_levels,
            column_levels,
            counts,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.row_levels.len(), self.column_levels.len())
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    fn row_totals(&self) -> Vec<f64> {
        self.counts
            .iter()
            .map(|row| row.iter().sum::<u64>() as f64)
            .collect()
    }

    fn column_totals(&self) -> Vec<f64> {
        (0..self.column_levels.len())
            .map(|j| self.counts.iter().map(|row| row[j]).sum::<u64>() as f64)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChiSquare {
    pub statistic: f64,
    pub df: f64,
    pub p_value: f64,
    pub cramers_v: f64,
    pub n: u64,
}

/// Pearson chi-square test of independence. A 2×2 table uses Yates'
/// continuity correction.
pub fn chi_square_independence(table: &ContingencyTable) -> StatsResult<ChiSquare> {
    let (rows, columns) = table.shape();
    if rows < 2 || columns < 2 {
        return Err(StatsError::Degenerate(format!(
            "contingency table is {}x{}; both variables need at least two levels",
            rows, columns
        )));
    }

    let n = table.total();
    let total = n as f64;
    let row_totals = table.row_totals();
    let column_totals = table.column_totals();
    let df = ((rows - 1) * (columns - 1)) as f64;
    let yates = df == 1.0;

    let mut statistic = 0.0;
    for (i, row) in table.counts.iter().enumerate() {
        for (j, &observed) in row.iter().enumerate() {
            let expected = row_totals[i] * column_totals[j] / total;
            if !(expected > 0.0) {
                return Err(StatsError::Degenerate("an expected frequency is zero".into()));
            }
            let mut deviation = (observed as f64 - expected).abs();
            if yates {
                deviation = (deviation - 0.5).max(0.0);
            }
            statistic += deviation * deviation / expected;
        }
    }

    let min_dim = rows.min(columns) as f64;
    Ok(ChiSquare {
        statistic,
        df,
        p_value: chi2_sf(statistic, df)?,
        cramers_v: (statistic / (total * (min_dim - 1.0))).sqrt(),
        n,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FisherExact {
    /// Sample odds ratio `(a·d)/(b·c)`; infinite when `b·c = 0`
    pub odds_ratio: f64,
    pub p_value: f64,
    pub n: u64,
}

/// Fisher's exact test, two-sided. Only 2×2 tables are accepted.
pub fn fisher_exact(table: &ContingencyTable) -> StatsResult<FisherExact> {
    if table.shape() != (2, 2) {
        let (rows, columns) = table.shape();
        return Err(StatsError::InvalidShape(format!(
            "Fisher's exact test requires a 2x2 contingency table, got {}x{}",
            rows, columns
        )));
    }

    let [a, b] = [table.counts[0][0], table.counts[0][1]];
    let [c, d] = [table.counts[1][0], table.counts[1][1]];

    let odds_ratio = if b * c == 0 {
        if a * d == 0 {
            f64::NAN
        } else {
            f64::INFINITY
        }
    } else {
        (a * d) as f64 / (b * c) as f64
    };
    if odds_ratio.is_nan() {
        return Err(StatsError::Degenerate("odds ratio is undefined".into()));
    }

    let row1 = a + b;
    let col1 = a + c;
    let n = a + b + c + d;

    let ln_probability = |x: u64| -> f64 {
        // P(X = x) for the hypergeometric with fixed margins
        ln_factorial(row1) + ln_factorial(n - row1) + ln_factorial(col1) + ln_factorial(n - col1)
            - ln_factorial(n)
            - ln_factorial(x)
            - ln_factorial(row1 - x)
            - ln_factorial(col1 - x)
            - ln_factorial(n - row1 - col1 + x)
    };

    let low = (row1 + col1).saturating_sub(n);
    let high = row1.min(col1);
    let observed = ln_probability(a);
    let threshold = observed + 1e-7f64.ln_1p();

    let p_value: f64 = (low..=high)
        .map(ln_probability)
        .filter(|lp| *lp <= threshold)
        .map(f64::exp)
        .sum();

    Ok(FisherExact {
        odds_ratio,
        p_value: p_value.min(1.0),
        n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    fn create_table(a: u64, b: u64, c: u64, d: u64) -> ContingencyTable {
        ContingencyTable {
            row_levels: vec!["r1".into(), "r2".into()],
            column_levels: vec!["c1".into(), "c2".into()],
            counts: vec![vec![a, b], vec![c, d]],
        }
    }

    #[test]
    fn test_from_labels() {
        let rows = labels(&["x", "y", "x", "x"]);
        let mut columns = labels(&["p", "q", "q", "p"]);
        columns.push(None);
        let table = ContingencyTable::from_labels(&rows, &columns);

        assert_eq!(table.row_levels, vec!["x", "y"]);
        assert_eq!(table.counts, vec![vec![2, 1], vec![0, 1]]);
        assert_eq!(table.total(), 4);
    }

    #[test]
    fn test_chi_square_3x2() {
        let table = ContingencyTable {
            row_levels: vec!["a".into(), "b".into(), "c".into()],
            column_levels: vec!["yes".into(), "no".into()],
            counts: vec![vec![30, 10], vec![20, 20], vec![10, 30]],
        };
        let result = chi_square_independence(&table).unwrap();

        // expected 20 in every cell: (100 + 0 + 100) * 2 / 20
        assert!((result.statistic - 20.0).abs() < 1e-9);
        assert_eq!(result.df, 2.0);
        assert!((result.p_value - (-10.0f64).exp()).abs() < 1e-9);
        assert!((result.cramers_v - (20.0f64 / 120.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_chi_square_yates() {
        let result = chi_square_independence(&create_table(12, 5, 9, 7)).unwrap();
        assert_eq!(result.df, 1.0);
        assert!(result.p_value > 0.3);
    }

    #[test]
    fn test_chi_square_single_level_is_degenerate() {
        let table = ContingencyTable::from_labels(&labels(&["a", "a"]), &labels(&["x", "y"]));
        assert!(matches!(
            chi_square_independence(&table),
            Err(StatsError::Degenerate(_))
        ));
    }

    #[test]
    fn test_fisher_exact_tea_tasting() {
        // Classic lady tasting tea: [[3, 1], [1, 3]] two-sided p = 0.4857
        let result = fisher_exact(&create_table(3, 1, 1, 3)).unwrap();
        assert!((result.odds_ratio - 9.0).abs() < 1e-12);
        assert!((result.p_value - 34.0 / 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_fisher_exact_requires_2x2() {
        let table = ContingencyTable {
            row_levels: vec!["a".into(), "b".into(), "c".into()],
            column_levels: vec!["yes".into(), "no".into()],
            counts: vec![vec![3, 1], vec![1, 3], vec![2, 2]],
        };
        assert!(matches!(fisher_exact(&table), Err(StatsError::InvalidShape(_))));
    }

    #[test]
    fn test_fisher_exact_zero_cell() {
        let result = fisher_exact(&create_table(5, 0, 0, 5)).unwrap();
        assert!(result.odds_ratio.is_infinite());
        // 2 / C(10, 5)
        assert!((result.p_value - 2.0 / 252.0).abs() < 1e-9);
    }
}
