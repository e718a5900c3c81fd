//! Exploratory-analysis summary consumed by the generator.
//!
//! Every section is optional; an absent section suppresses the hypothesis
//! family that would be derived from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::hypothesis::EffectMagnitude;
use crate::dataset::ColumnType;

/// Output of an exploratory data pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExploratorySummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<DatasetOverview>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variable_analysis: BTreeMap<String, VariableProfile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlations: Option<CorrelationFindings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_differences: Option<GroupDifferences>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomalies: Option<AnomalyFindings>,
}

impl ExploratorySummary {
    /// Strong positive and strong negative pairs, in that order.
    pub fn strong_correlations(&self) -> impl Iterator<Item = &CorrelationPair> {
        self.correlations
            .iter()
            .flat_map(|c| c.strong_positive.iter().chain(c.strong_negative.iter()))
    }

    pub fn significant_differences(&self) -> &[GroupDifference] {
        self.group_differences
            .as_ref()
            .map(|g| g.significant.as_slice())
            .unwrap_or_default()
    }

    /// Declared type of a variable, if profiled.
    pub fn declared_type(&self, variable: &str) -> Option<ColumnType> {
        self.variable_analysis
            .get(variable)
            .and_then(|p| p.variable_type)
    }
}

/// Dataset-level counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub total_rows: Option<u64>,
    pub total_columns: Option<u64>,
    pub missing_data_percentage: Option<f64>,
    pub duplicate_rows: Option<u64>,
}

/// Per-variable profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableProfile {
    #[serde(rename = "type", default)]
    pub variable_type: Option<ColumnType>,
    #[serde(default)]
    pub distribution: Option<String>,
    #[serde(default)]
    pub outliers_percentage: Option<f64>,
    #[serde(default)]
    pub unique_values: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationFindings {
    #[serde(default)]
    pub strong_positive: Vec<CorrelationPair>,
    #[serde(default)]
    pub strong_negative: Vec<CorrelationPair>,
}

/// An observed pairwise correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub var1: String,
    pub var2: String,
    pub correlation: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupDifferences {
    #[serde(default)]
    pub significant: Vec<GroupDifference>,
}

/// An outcome that differs across levels of a grouping variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDifference {
    pub grouping_var: String,
    pub outcome_var: String,
    pub effect_size: EffectMagnitude,
    pub p_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFindings {
    #[serde(default)]
    pub outliers_detected: Option<u64>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_parses() {
        let summary: ExploratorySummary = serde_json::from_str("{}").unwrap();
        assert!(summary.correlations.is_none());
        assert_eq!(summary.strong_correlations().count(), 0);
        assert!(summary.significant_differences().is_empty());
    }

    #[test]
    fn test_full_summary_parses() {
        let json = serde_json::json!({
            "summary": {"total_rows": 10000, "total_columns": 8},
            "variable_analysis": {
                "region": {"type": "categorical", "unique_values": 4}
            },
            "correlations": {
                "strong_positive": [{"var1": "a", "var2": "b", "correlation": 0.78}],
                "strong_negative": [{"var1": "c", "var2": "d", "correlation": -0.72}]
            },
            "group_differences": {
                "significant": [{
                    "grouping_var": "region",
                    "outcome_var": "b",
                    "effect_size": "medium",
                    "p_value": 0.002
                }]
            },
            "anomalies": {"outliers_detected": 12}
        });

        let summary: ExploratorySummary = serde_json::from_value(json).unwrap();
        let pairs: Vec<_> = summary.strong_correlations().collect();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].var1, "c");
        assert_eq!(summary.declared_type("region"), Some(ColumnType::Categorical));
        assert_eq!(
            summary.significant_differences()[0].effect_size,
            EffectMagnitude::Medium
        );
    }
}
