//! Integration Tests for the hypothesis engine
//!
//! # Test Categories
//!
//! 1. **End-to-end pipeline**: large correlated dataset through every stage
//! 2. **Data availability**: hypotheses naming absent columns
//! 3. **Executor contracts**: specification failures stay per-test
//! 4. **Loading and export**: CSV input, JSON and CSV output

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use statrs::distribution::{ContinuousCDF, Normal};

use hypogen_engine::{
    contracts::{
        CorrelationFindings, CorrelationPair, EffectMagnitude, FailureKind, GroupDifference,
        GroupDifferences,
    },
    Column, CorrectionMethod, Dataset, EngineConfig, ExploratorySummary, HypothesisPipeline,
    StatisticalTest, TestError, TestExecutor, TestOutcome, TestSpecification,
};

// ============================================================================
// TEST FIXTURES
// ============================================================================

const ROWS: usize = 10_000;
const TARGET_R: f64 = 0.78;

/// Standard normal scores at evenly spaced quantiles.
fn normal_scores(n: usize) -> Vec<f64> {
    let normal = Normal::new(0.0, 1.0).unwrap();
    (0..n)
        .map(|i| normal.inverse_cdf((i as f64 + 0.5) / n as f64))
        .collect()
}

/// `marketing_spend` and `sales_revenue` with population correlation 0.78,
/// plus an unrelated four-level `region`.
fn create_sales_dataset() -> Dataset {
    let mut rng = StdRng::seed_from_u64(7);
    let mut spend_scores = normal_scores(ROWS);
    spend_scores.shuffle(&mut rng);
    let mut noise = normal_scores(ROWS);
    noise.shuffle(&mut rng);

    let noise_weight = (1.0 - TARGET_R * TARGET_R).sqrt();
    let spend: Vec<Option<f64>> = spend_scores.iter().map(|z| Some(1000.0 + 150.0 * z)).collect();
    let revenue: Vec<Option<f64>> = spend_scores
        .iter()
        .zip(&noise)
        .map(|(z, e)| Some(5000.0 + 800.0 * (TARGET_R * z + noise_weight * e)))
        .collect();
    let region: Vec<Option<String>> = (0..ROWS)
        .map(|i| Some(["north", "south", "east", "west"][i % 4].to_string()))
        .collect();

    Dataset::new(vec![
        Column::numeric("marketing_spend", spend),
        Column::numeric("sales_revenue", revenue),
        Column::categorical("region", region),
    ])
    .unwrap()
}

fn create_sales_summary(extra_pairs: Vec<CorrelationPair>) -> ExploratorySummary {
    let mut strong_positive = vec![CorrelationPair {
        var1: "marketing_spend".into(),
        var2: "sales_revenue".into(),
        correlation: TARGET_R,
    }];
    strong_positive.extend(extra_pairs);

    ExploratorySummary {
        correlations: Some(CorrelationFindings {
            strong_positive,
            strong_negative: vec![],
        }),
        group_differences: Some(GroupDifferences {
            significant: vec![GroupDifference {
                grouping_var: "region".into(),
                outcome_var: "sales_revenue".into(),
                effect_size: EffectMagnitude::Small,
                p_value: 0.04,
            }],
        }),
        ..ExploratorySummary::default()
    }
}

fn spec(test: &str, variables: &[&str]) -> TestSpecification {
    TestSpecification::new(test, variables.iter().map(|v| v.to_string()).collect())
}

// ============================================================================
// END-TO-END PIPELINE
// ============================================================================

mod end_to_end {
    use super::*;

    #[test]
    fn test_correlated_sales_recovered_under_every_correction() {
        let dataset = create_sales_dataset();
        let summary = create_sales_summary(vec![]);
        let id = "corr_pos_marketing_spend_sales_revenue";

        for method in [
            CorrectionMethod::BenjaminiHochberg,
            CorrectionMethod::Bonferroni,
            CorrectionMethod::Holm,
        ] {
            let config = EngineConfig {
                correction_method: method,
                ..EngineConfig::default()
            };
            let report = HypothesisPipeline::with_config(config).run(&summary, &dataset).unwrap();

            let hypothesis = report
                .hypotheses
                .hypotheses
                .iter()
                .find(|h| h.id == id)
                .unwrap();
            assert!((hypothesis.confidence - TARGET_R).abs() < 1e-12);
            assert_eq!(hypothesis.statistical_test, StatisticalTest::PearsonCorrelation);

            let validation = report.hypotheses.validation_for(id).unwrap();
            assert!(validation.is_testable);
            assert!(validation.sample_size_adequacy);

            let pearson = report
                .tests
                .test_results
                .iter()
                .find(|r| r.test == StatisticalTest::PearsonCorrelation)
                .unwrap();
            assert!((pearson.statistic - TARGET_R).abs() < 0.03);
            assert!(pearson.p_value.unwrap() < 1e-10);
            assert!(pearson.corrected_p_value.unwrap() < 1e-10);
            assert_eq!(report.tests.metadata.correction_method, method);
            assert!(report.tests.significant().any(|r| r.test == StatisticalTest::PearsonCorrelation));
        }
    }

    #[test]
    fn test_causal_hypothesis_is_skipped_not_failed() {
        let report = HypothesisPipeline::new()
            .run(&create_sales_summary(vec![]), &create_sales_dataset())
            .unwrap();

        assert!(report
            .skipped
            .iter()
            .any(|s| s.hypothesis_id == "causal_marketing_spend_sales_revenue"));
        assert!(report
            .tests
            .test_results
            .iter()
            .all(|r| r.test != StatisticalTest::CausalInference));
        assert!(report.tests.failures.is_empty());
    }

    #[test]
    fn test_report_serializes() {
        let report = HypothesisPipeline::new()
            .run(&create_sales_summary(vec![]), &create_sales_dataset())
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();

        assert_eq!(json["run_id"], report.run_id.to_string());
        assert!(json["hypotheses"]["generation_metadata"]["inputs_hash"].is_string());
        assert_eq!(json["tests"]["metadata"]["correction_method"], "benjamini_hochberg");
    }
}

// ============================================================================
// DATA AVAILABILITY
// ============================================================================

mod data_availability {
    use super::*;

    #[test]
    fn test_absent_column_is_untestable_with_recommendation() {
        let summary = create_sales_summary(vec![CorrelationPair {
            var1: "marketing_spend".into(),
            var2: "ad_impressions".into(),
            correlation: 0.81,
        }]);
        let report = HypothesisPipeline::new()
            .run(&summary, &create_sales_dataset())
            .unwrap();

        let validation = report
            .hypotheses
            .validation_for("corr_pos_marketing_spend_ad_impressions")
            .unwrap();
        assert_eq!(validation.data_availability.get("ad_impressions"), Some(&false));
        assert_eq!(validation.data_availability.get("marketing_spend"), Some(&true));
        assert!(!validation.is_testable);
        assert!(validation
            .recommendations
            .iter()
            .any(|r| r.contains("ad_impressions")));
    }

    #[test]
    fn test_absent_column_ranks_below_available_pair() {
        let summary = create_sales_summary(vec![CorrelationPair {
            var1: "marketing_spend".into(),
            var2: "ad_impressions".into(),
            correlation: 0.95,
        }]);
        let report = HypothesisPipeline::new()
            .run(&summary, &create_sales_dataset())
            .unwrap();

        let position = |id: &str| {
            report
                .hypotheses
                .hypotheses
                .iter()
                .position(|h| h.id == id)
                .unwrap()
        };
        assert!(
            position("corr_pos_marketing_spend_sales_revenue")
                < position("corr_pos_marketing_spend_ad_impressions")
        );
    }
}

// ============================================================================
// EXECUTOR CONTRACTS
// ============================================================================

mod executor_contracts {
    use super::*;

    fn create_churn_dataset() -> Dataset {
        let n = 90;
        let plan: Vec<Option<String>> = (0..n)
            .map(|i| Some(["basic", "plus", "pro"][i % 3].to_string()))
            .collect();
        let churned: Vec<Option<String>> = (0..n)
            .map(|i| Some(if i % 5 == 0 { "yes" } else { "no" }.to_string()))
            .collect();
        let tenure: Vec<Option<f64>> = (0..n).map(|i| Some(((i * 13) % 37) as f64 + 1.0)).collect();

        Dataset::new(vec![
            Column::categorical("plan", plan),
            Column::categorical("churned", churned),
            Column::numeric("tenure", tenure),
        ])
        .unwrap()
    }

    #[test]
    fn test_fisher_rejects_three_by_two_table() {
        let dataset = create_churn_dataset();
        let executor = TestExecutor::new();

        let err = executor
            .execute(&dataset, &spec("fisher_exact", &["plan", "churned"]))
            .unwrap_err();
        assert!(matches!(err, TestError::InvalidTestSpecification(_)));
        assert_eq!(err.kind(), FailureKind::Specification);
    }

    #[test]
    fn test_failure_isolated_within_batch() {
        let dataset = create_churn_dataset();
        let specs = vec![
            spec("fisher_exact", &["plan", "churned"]),
            spec("chi_square_independence", &["plan", "churned"]),
            spec("kruskal_wallis", &["plan", "tenure"]),
        ];
        let export = HypothesisPipeline::new().execute_tests(&dataset, &specs);

        assert_eq!(export.failures.len(), 1);
        assert_eq!(export.failures[0].test, "fisher_exact");
        assert_eq!(export.failures[0].kind, FailureKind::Specification);
        assert_eq!(export.test_results.len(), 2);
        assert_eq!(export.test_results[0].test, StatisticalTest::ChiSquareIndependence);
        assert_eq!(export.test_results[1].test, StatisticalTest::KruskalWallis);
        assert!(export.test_results.iter().all(|r| r.corrected_p_value.is_some()));
    }

    #[test]
    fn test_two_sample_test_rejects_three_variables() {
        let dataset = create_sales_dataset();
        let outcomes = TestExecutor::new().execute_batch(
            &dataset,
            &[spec(
                "t_test_independent",
                &["marketing_spend", "sales_revenue", "marketing_spend"],
            )],
        );
        assert!(matches!(
            &outcomes[0],
            TestOutcome::Failed(f) if f.kind == FailureKind::Specification
        ));
    }
}

// ============================================================================
// LOADING AND EXPORT
// ============================================================================

mod loading_and_export {
    use super::*;
    use hypogen_engine::HypothesisGenerator;

    #[test]
    fn test_csv_dataset_with_missing_cells() {
        let csv = "x,y,label\n1,2.5,a\n2,NA,b\n3,4.1,\n4,5.0,a\n";
        let dataset = Dataset::from_csv_reader(csv.as_bytes()).unwrap();

        assert_eq!(dataset.row_count(), 4);
        assert_eq!(dataset.null_count("y"), Some(1));
        assert_eq!(dataset.null_count("label"), Some(1));
        assert_eq!(dataset.complete_rows(&["x", "y", "label"]), 2);
    }

    #[test]
    fn test_hypothesis_export_csv() {
        let dataset = create_sales_dataset();
        let config = EngineConfig::default();
        let hypotheses = HypothesisGenerator::with_config(config.clone())
            .generate(&create_sales_summary(vec![]), Some(&dataset));
        let count = hypotheses.len();

        let export = hypogen_engine::HypothesisExport::new(hypotheses, &config, "hash".into());
        let csv = export.to_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), count + 1);
        assert!(lines[0].starts_with("id,statement"));
    }
}
