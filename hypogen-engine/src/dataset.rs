//! Tabular Dataset Accessor
//!
//! A column-oriented, read-only table addressed by column name. Every other
//! component reads from a [`Dataset`]; nothing mutates it after construction.
//!
//! # Loading
//!
//! - CSV with a header row ([`Dataset::from_csv_reader`], [`Dataset::from_csv_path`])
//! - JSON array of record objects ([`Dataset::from_json_records`], [`Dataset::from_json_path`])
//!
//! Empty cells and the markers `NA`, `NaN`, `null` and `None` are treated as
//! missing. A column is numeric when every present value parses as a finite
//! number, otherwise it is categorical.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Cell markers that are read as missing values.
pub const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

// ============================================================================
// Errors
// ============================================================================

/// Dataset loading and construction errors.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Column '{name}' has {actual} values, expected {expected}")]
    RaggedColumn {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Invalid records: {0}")]
    InvalidRecords(String),

    #[error("Unsupported dataset format: {0}")]
    UnsupportedFormat(String),
}

// ============================================================================
// Columns
// ============================================================================

/// Logical type of a column, shared with hypothesis variable metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Categorical,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric => write!(f, "numeric"),
            Self::Categorical => write!(f, "categorical"),
        }
    }
}

/// Column storage. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: ColumnValues,
}

impl Column {
    /// Create a numeric column. Non-finite values are stored as missing.
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        let values = values
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();
        Self {
            name: name.into(),
            values: ColumnValues::Numeric(values),
        }
    }

    /// Create a categorical column.
    pub fn categorical(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Categorical(values),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn column_type(&self) -> ColumnType {
        match self.values {
            ColumnValues::Numeric(_) => ColumnType::Numeric,
            ColumnValues::Categorical(_) => ColumnType::Categorical,
        }
    }

    pub fn len(&self) -> usize {
        match &self.values {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the cell at `row` is missing.
    pub fn is_missing(&self, row: usize) -> bool {
        match &self.values {
            ColumnValues::Numeric(v) => v.get(row).map_or(true, Option::is_none),
            ColumnValues::Categorical(v) => v.get(row).map_or(true, Option::is_none),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_missing(i)).count()
    }

    /// Numeric cells, or `None` for categorical columns.
    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.values {
            ColumnValues::Numeric(v) => Some(v),
            ColumnValues::Categorical(_) => None,
        }
    }

    /// String label of a cell, for grouping and contingency tables.
    pub fn label(&self, row: usize) -> Option<String> {
        match &self.values {
            ColumnValues::Numeric(v) => v.get(row).copied().flatten().map(format_number),
            ColumnValues::Categorical(v) => v.get(row).cloned().flatten(),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// Read-only table of equally long named columns.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    row_count: usize,
}

impl Dataset {
    /// Build a dataset from columns. All columns must share one length and
    /// column names must be unique.
    pub fn new(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let row_count = columns.first().map_or(0, Column::len);
        let mut index = HashMap::with_capacity(columns.len());

        for (i, column) in columns.iter().enumerate() {
            if column.len() != row_count {
                return Err(DatasetError::RaggedColumn {
                    name: column.name.clone(),
                    expected: row_count,
                    actual: column.len(),
                });
            }
            if index.insert(column.name.clone(), i).is_some() {
                return Err(DatasetError::DuplicateColumn(column.name.clone()));
            }
        }

        Ok(Self {
            columns,
            index,
            row_count,
        })
    }

    /// Parse CSV with a header row.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        let mut cells: Vec<Vec<RawCell>> = vec![Vec::new(); headers.len()];

        for record in reader.records() {
            let record = record?;
            for (i, column) in cells.iter_mut().enumerate() {
                column.push(RawCell::parse(record.get(i).unwrap_or("")));
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, raw)| build_column(name, raw))
            .collect();

        Self::new(columns)
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let file = File::open(path.as_ref())?;
        let dataset = Self::from_csv_reader(file)?;
        debug!(
            path = %path.as_ref().display(),
            rows = dataset.row_count,
            columns = dataset.columns.len(),
            "Loaded CSV dataset"
        );
        Ok(dataset)
    }

    /// Build a dataset from a JSON array of objects. Keys are collected in
    /// first-seen order; absent keys become missing cells.
    pub fn from_json_records(records: &serde_json::Value) -> Result<Self, DatasetError> {
        let rows = records
            .as_array()
            .ok_or_else(|| DatasetError::InvalidRecords("expected an array of objects".into()))?;

        let mut names: Vec<String> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        for row in rows {
            let obj = row.as_object().ok_or_else(|| {
                DatasetError::InvalidRecords("every record must be an object".into())
            })?;
            for key in obj.keys() {
                if !seen.contains_key(key) {
                    seen.insert(key.clone(), names.len());
                    names.push(key.clone());
                }
            }
        }

        let mut cells: Vec<Vec<RawCell>> = vec![Vec::with_capacity(rows.len()); names.len()];
        for row in rows {
            // Checked above.
            let Some(obj) = row.as_object() else { continue };
            for (i, name) in names.iter().enumerate() {
                cells[i].push(obj.get(name).map_or(RawCell::Missing, RawCell::from_json));
            }
        }

        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, raw)| build_column(name, raw))
            .collect();

        Self::new(columns)
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let file = File::open(path.as_ref())?;
        let value: serde_json::Value = serde_json::from_reader(file)?;
        Self::from_json_records(&value)
    }

    /// Load a dataset, choosing the parser by file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Self::from_csv_path(path),
            "json" => Self::from_json_path(path),
            other => Err(DatasetError::UnsupportedFormat(if other.is_empty() {
                path.display().to_string()
            } else {
                other.to_string()
            })),
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column(name).map(Column::column_type)
    }

    /// Names of numeric columns, in dataset order.
    pub fn numeric_column_names(&self) -> Vec<&str> {
        self.names_of_type(ColumnType::Numeric)
    }

    /// Names of categorical columns, in dataset order.
    pub fn categorical_column_names(&self) -> Vec<&str> {
        self.names_of_type(ColumnType::Categorical)
    }

    fn names_of_type(&self, column_type: ColumnType) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.column_type() == column_type)
            .map(Column::name)
            .collect()
    }

    pub fn null_count(&self, name: &str) -> Option<usize> {
        self.column(name).map(Column::null_count)
    }

    /// Fraction of missing cells in a column. Zero for an empty dataset.
    pub fn missing_ratio(&self, name: &str) -> Option<f64> {
        let nulls = self.null_count(name)?;
        if self.row_count == 0 {
            return Some(0.0);
        }
        Some(nulls as f64 / self.row_count as f64)
    }

    /// Rows with no missing value across every listed variable. Zero when any
    /// variable is absent from the dataset.
    pub fn complete_rows<S: AsRef<str>>(&self, variables: &[S]) -> usize {
        let mut columns = Vec::with_capacity(variables.len());
        for name in variables {
            match self.column(name.as_ref()) {
                Some(column) => columns.push(column),
                None => return 0,
            }
        }

        (0..self.row_count)
            .filter(|&row| columns.iter().all(|c| !c.is_missing(row)))
            .count()
    }

    /// Present values of a numeric column.
    pub fn numeric_values(&self, name: &str) -> Option<Vec<f64>> {
        self.column(name)?
            .as_numeric()
            .map(|values| values.iter().flatten().copied().collect())
    }

    /// Two numeric columns with rows dropped pairwise where either is missing.
    pub fn paired_numeric(&self, a: &str, b: &str) -> Option<(Vec<f64>, Vec<f64>)> {
        let left = self.column(a)?.as_numeric()?;
        let right = self.column(b)?.as_numeric()?;

        Some(
            left.iter()
                .zip(right)
                .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                .unzip(),
        )
    }

    /// Sample variance of a numeric column, when at least two values exist.
    pub fn variance(&self, name: &str) -> Option<f64> {
        let values = self.numeric_values(name)?;
        if values.len() < 2 {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        Some(values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0))
    }
}

// ============================================================================
// Cell parsing
// ============================================================================

#[derive(Debug, Clone)]
enum RawCell {
    Missing,
    Number(f64),
    Text(String),
}

impl RawCell {
    fn parse(field: &str) -> Self {
        let trimmed = field.trim();
        if MISSING_MARKERS.contains(&trimmed) {
            return Self::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Self::Number(v),
            _ => Self::Text(trimmed.to_string()),
        }
    }

    fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Missing,
            serde_json::Value::Number(n) => n
                .as_f64()
                .filter(|v| v.is_finite())
                .map_or(Self::Missing, Self::Number),
            serde_json::Value::String(s) => Self::parse(s),
            serde_json::Value::Bool(b) => Self::Text(b.to_string()),
            other => Self::Text(other.to_string()),
        }
    }
}

fn build_column(name: String, raw: Vec<RawCell>) -> Column {
    let numeric = raw.iter().all(|c| !matches!(c, RawCell::Text(_)));

    if numeric {
        let values = raw
            .into_iter()
            .map(|c| match c {
                RawCell::Number(v) => Some(v),
                _ => None,
            })
            .collect();
        Column::numeric(name, values)
    } else {
        let values = raw
            .into_iter()
            .map(|c| match c {
                RawCell::Missing => None,
                RawCell::Number(v) => Some(format_number(v)),
                RawCell::Text(s) => Some(s),
            })
            .collect();
        Column::categorical(name, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_dataset() -> Dataset {
        Dataset::new(vec![
            Column::numeric("x", vec![Some(1.0), Some(2.0), None, Some(4.0)]),
            Column::numeric("y", vec![Some(2.0), None, Some(6.0), Some(8.0)]),
            Column::categorical(
                "group",
                vec![Some("a".into()), Some("b".into()), Some("a".into()), None],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_csv_type_inference() {
        let csv = "id,score,region\n1,3.5,north\n2,,south\n3,NA,north\n";
        let dataset = Dataset::from_csv_reader(csv.as_bytes()).unwrap();

        assert_eq!(dataset.row_count(), 3);
        assert_eq!(dataset.column_type("id"), Some(ColumnType::Numeric));
        assert_eq!(dataset.column_type("score"), Some(ColumnType::Numeric));
        assert_eq!(dataset.column_type("region"), Some(ColumnType::Categorical));
        assert_eq!(dataset.null_count("score"), Some(2));
    }

    #[test]
    fn test_mixed_column_is_categorical() {
        let csv = "code\n10\nA7\n";
        let dataset = Dataset::from_csv_reader(csv.as_bytes()).unwrap();

        assert_eq!(dataset.column_type("code"), Some(ColumnType::Categorical));
        assert_eq!(dataset.column("code").unwrap().label(0), Some("10".into()));
    }

    #[test]
    fn test_json_records() {
        let records = serde_json::json!([
            {"a": 1.0, "b": "x"},
            {"a": null, "c": 3},
            {"a": "2.5", "b": "y"}
        ]);
        let dataset = Dataset::from_json_records(&records).unwrap();

        assert_eq!(dataset.column_names(), vec!["a", "b", "c"]);
        assert_eq!(dataset.numeric_values("a"), Some(vec![1.0, 2.5]));
        assert_eq!(dataset.null_count("b"), Some(1));
        assert_eq!(dataset.null_count("c"), Some(2));
    }

    #[test]
    fn test_json_records_rejects_non_array() {
        let result = Dataset::from_json_records(&serde_json::json!({"a": 1}));
        assert!(matches!(result, Err(DatasetError::InvalidRecords(_))));
    }

    #[test]
    fn test_ragged_and_duplicate_columns() {
        let ragged = Dataset::new(vec![
            Column::numeric("a", vec![Some(1.0)]),
            Column::numeric("b", vec![Some(1.0), Some(2.0)]),
        ]);
        assert!(matches!(ragged, Err(DatasetError::RaggedColumn { .. })));

        let duplicate = Dataset::new(vec![
            Column::numeric("a", vec![Some(1.0)]),
            Column::numeric("a", vec![Some(2.0)]),
        ]);
        assert!(matches!(duplicate, Err(DatasetError::DuplicateColumn(_))));
    }

    #[test]
    fn test_complete_rows_and_missing_ratio() {
        let dataset = create_test_dataset();

        assert_eq!(dataset.complete_rows(&["x", "y"]), 2);
        assert_eq!(dataset.complete_rows(&["x", "group"]), 2);
        assert_eq!(dataset.complete_rows(&["x", "absent"]), 0);
        assert!((dataset.missing_ratio("y").unwrap() - 0.25).abs() < 1e-12);
        assert_eq!(dataset.missing_ratio("absent"), None);
    }

    #[test]
    fn test_paired_numeric_drops_pairwise() {
        let dataset = create_test_dataset();
        let (x, y) = dataset.paired_numeric("x", "y").unwrap();

        assert_eq!(x, vec![1.0, 4.0]);
        assert_eq!(y, vec![2.0, 8.0]);
        assert!(dataset.paired_numeric("x", "group").is_none());
    }

    #[test]
    fn test_variance() {
        let dataset = create_test_dataset();
        // x present values: 1, 2, 4
        let var = dataset.variance("x").unwrap();
        assert!((var - 7.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let result = Dataset::load("data.parquet");
        assert!(matches!(result, Err(DatasetError::UnsupportedFormat(_))));
    }
}
