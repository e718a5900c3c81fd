//! Engine configuration.
//!
//! [`EngineConfig`] is an immutable value passed explicitly to every component.
//! It is built from defaults, an optional JSON file and `HYPOGEN_*` environment
//! overrides, then validated.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `HYPOGEN_MAX_HYPOTHESES` | `max_hypotheses` |
//! | `HYPOGEN_MIN_CONFIDENCE` | `min_confidence` |
//! | `HYPOGEN_FOCUS_AREAS` | `focus_areas` (comma-separated) |
//! | `HYPOGEN_ALPHA_LEVEL` | `alpha_level` |
//! | `HYPOGEN_MIN_SAMPLE_SIZE` | `min_sample_size` |
//! | `HYPOGEN_POWER_THRESHOLD` | `power_threshold` |
//! | `HYPOGEN_CORRECTION_METHOD` | `correction_method` |
//! | `HYPOGEN_PARALLEL` | `parallel` |
//! | `HYPOGEN_RANDOM_SEED` | `random_seed` |

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use validator::Validate;

use crate::correction::CorrectionMethod;

/// Configuration errors. These abort a pipeline call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidOverride { key: String, message: String },
}

impl From<validator::ValidationErrors> for ConfigError {
    fn from(err: validator::ValidationErrors) -> Self {
        ConfigError::Validation(err.to_string())
    }
}

/// Hypothesis family produced by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusArea {
    Correlation,
    Comparison,
    Prediction,
    Causation,
}

impl FocusArea {
    pub const ALL: [FocusArea; 4] = [
        Self::Correlation,
        Self::Comparison,
        Self::Prediction,
        Self::Causation,
    ];
}

impl fmt::Display for FocusArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Correlation => write!(f, "correlation"),
            Self::Comparison => write!(f, "comparison"),
            Self::Prediction => write!(f, "prediction"),
            Self::Causation => write!(f, "causation"),
        }
    }
}

impl FromStr for FocusArea {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "correlation" => Ok(Self::Correlation),
            "comparison" => Ok(Self::Comparison),
            "prediction" => Ok(Self::Prediction),
            "causation" => Ok(Self::Causation),
            other => Err(format!("unknown focus area '{}'", other)),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EngineConfig {
    /// Hypotheses kept after ranking
    #[validate(range(min = 1, max = 1000))]
    pub max_hypotheses: usize,

    /// Generated hypotheses below this confidence are dropped
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_confidence: f64,

    #[validate(length(min = 1))]
    pub focus_areas: Vec<FocusArea>,

    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub alpha_level: f64,

    /// Complete rows required for an adequate sample
    #[validate(range(min = 1))]
    pub min_sample_size: usize,

    #[validate(range(min = 0.0, max = 1.0))]
    pub power_threshold: f64,

    pub correction_method: CorrectionMethod,

    /// Execute only hypotheses whose validation marks them testable
    pub validate_hypotheses: bool,

    /// Ljung-Box lag count when a specification gives none
    #[validate(range(min = 1))]
    pub ljung_box_lags: usize,

    /// Shapiro-Wilk subsample ceiling
    #[validate(range(min = 3, max = 5000))]
    pub shapiro_max_samples: usize,

    /// Seed for subsampling
    pub random_seed: u64,

    /// Execute test batches on the rayon pool
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_hypotheses: 10,
            min_confidence: 0.6,
            focus_areas: FocusArea::ALL.to_vec(),
            alpha_level: 0.05,
            min_sample_size: 30,
            power_threshold: 0.8,
            correction_method: CorrectionMethod::BenjaminiHochberg,
            validate_hypotheses: true,
            ljung_box_lags: 10,
            shapiro_max_samples: 5000,
            random_seed: 42,
            parallel: false,
        }
    }
}

impl EngineConfig {
    pub fn focuses_on(&self, area: FocusArea) -> bool {
        self.focus_areas.contains(&area)
    }

    /// Parse a JSON document; absent fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// File (if any), then environment, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        debug!(
            max_hypotheses = config.max_hypotheses,
            alpha_level = config.alpha_level,
            correction_method = %config.correction_method,
            "Loaded engine configuration"
        );
        Ok(config)
    }

    /// Apply `HYPOGEN_*` overrides from a lookup function.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HYPOGEN_MAX_HYPOTHESES") {
            self.max_hypotheses = parse_override("HYPOGEN_MAX_HYPOTHESES", &v)?;
        }
        if let Some(v) = lookup("HYPOGEN_MIN_CONFIDENCE") {
            self.min_confidence = parse_override("HYPOGEN_MIN_CONFIDENCE", &v)?;
        }
        if let Some(v) = lookup("HYPOGEN_FOCUS_AREAS") {
            self.focus_areas = v
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_override("HYPOGEN_FOCUS_AREAS", s))
                .collect::<Result<_, _>>()?;
        }
        if let Some(v) = lookup("HYPOGEN_ALPHA_LEVEL") {
            self.alpha_level = parse_override("HYPOGEN_ALPHA_LEVEL", &v)?;
        }
        if let Some(v) = lookup("HYPOGEN_MIN_SAMPLE_SIZE") {
            self.min_sample_size = parse_override("HYPOGEN_MIN_SAMPLE_SIZE", &v)?;
        }
        if let Some(v) = lookup("HYPOGEN_POWER_THRESHOLD") {
            self.power_threshold = parse_override("HYPOGEN_POWER_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("HYPOGEN_CORRECTION_METHOD") {
            self.correction_method = parse_override("HYPOGEN_CORRECTION_METHOD", &v)?;
        }
        if let Some(v) = lookup("HYPOGEN_PARALLEL") {
            self.parallel = parse_override("HYPOGEN_PARALLEL", &v)?;
        }
        if let Some(v) = lookup("HYPOGEN_RANDOM_SEED") {
            self.random_seed = parse_override("HYPOGEN_RANDOM_SEED", &v)?;
        }
        Ok(())
    }
}

fn parse_override<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidOverride {
            key: key.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_hypotheses, 10);
        assert_eq!(config.min_confidence, 0.6);
        assert_eq!(config.focus_areas.len(), 4);
        assert_eq!(config.alpha_level, 0.05);
        assert_eq!(config.min_sample_size, 30);
        assert_eq!(config.power_threshold, 0.8);
        assert_eq!(config.correction_method, CorrectionMethod::BenjaminiHochberg);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{"max_hypotheses": 3, "correction_method": "holm"}"#)
                .unwrap();
        assert_eq!(config.max_hypotheses, 3);
        assert_eq!(config.correction_method, CorrectionMethod::Holm);
        assert_eq!(config.min_sample_size, 30);
    }

    #[test]
    fn test_unknown_correction_method_is_config_error() {
        let result = EngineConfig::from_json_str(r#"{"correction_method": "sidak"}"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let config = EngineConfig {
            alpha_level: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            focus_areas: vec![],
            ..Default::default()
        };
        let err: ConfigError = config.validate().unwrap_err().into();
        assert!(err.to_string().contains("Validation error"));
    }

    #[test]
    fn test_overrides() {
        let vars = HashMap::from([
            ("HYPOGEN_MAX_HYPOTHESES", "25"),
            ("HYPOGEN_FOCUS_AREAS", "correlation, causation"),
            ("HYPOGEN_CORRECTION_METHOD", "bonferroni"),
        ]);
        let mut config = EngineConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.max_hypotheses, 25);
        assert_eq!(
            config.focus_areas,
            vec![FocusArea::Correlation, FocusArea::Causation]
        );
        assert_eq!(config.correction_method, CorrectionMethod::Bonferroni);
    }

    #[test]
    fn test_invalid_override() {
        let mut config = EngineConfig::default();
        let result = config.apply_overrides(|k| {
            (k == "HYPOGEN_ALPHA_LEVEL").then(|| "not-a-number".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidOverride { .. })));
    }
}
