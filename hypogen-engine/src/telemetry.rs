//! Pipeline Telemetry
//!
//! Structured events for generation, validation, test execution and
//! correction. Events are emitted as `tracing` events inside a
//! `pipeline_telemetry` span and mirrored as `metrics` counters:
//!
//! | Counter | Labels |
//! |---------|--------|
//! | `hypogen_hypotheses_generated_total` | |
//! | `hypogen_tests_executed_total` | `test` |
//! | `hypogen_tests_failed_total` | `test`, `kind` |
//! | `hypogen_pipeline_runs_total` | `status` |
//!
//! No metrics exporter is installed here; a host process may install one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, span, warn, Level};
use uuid::Uuid;

use crate::contracts::{TestFailure, TestResult};
use crate::correction::CorrectionMethod;

/// Telemetry event types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryEventType {
    RunStarted,
    RunCompleted,
    RunFailed,
    HypothesesGenerated,
    HypothesisValidated,
    TestCompleted,
    TestFailed,
    CorrectionApplied,
}

impl std::fmt::Display for TelemetryEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RunStarted => write!(f, "run_started"),
            Self::RunCompleted => write!(f, "run_completed"),
            Self::RunFailed => write!(f, "run_failed"),
            Self::HypothesesGenerated => write!(f, "hypotheses_generated"),
            Self::HypothesisValidated => write!(f, "hypothesis_validated"),
            Self::TestCompleted => write!(f, "test_completed"),
            Self::TestFailed => write!(f, "test_failed"),
            Self::CorrectionApplied => write!(f, "correction_applied"),
        }
    }
}

/// A telemetry event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub event_type: TelemetryEventType,
    /// Pipeline run the event belongs to
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

impl TelemetryEvent {
    pub fn new(event_type: TelemetryEventType, run_id: Uuid, metadata: serde_json::Value) -> Self {
        Self {
            event_type,
            run_id,
            timestamp: Utc::now(),
            metadata,
        }
    }
}

/// Telemetry emitter scoped to one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineTelemetry {
    run_id: Uuid,
    enabled: bool,
}

impl PipelineTelemetry {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            enabled: true,
        }
    }

    /// Emitter that drops every event.
    pub fn disabled() -> Self {
        Self {
            run_id: Uuid::nil(),
            enabled: false,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Emit an event as a tracing event and a metrics counter.
    pub fn emit(&self, event: TelemetryEvent) {
        if !self.enabled {
            return;
        }

        let span = span!(
            Level::INFO,
            "pipeline_telemetry",
            run_id = %self.run_id,
            event_type = %event.event_type,
        );
        let _guard = span.enter();

        match event.event_type {
            TelemetryEventType::RunStarted => {
                info!(metadata = %event.metadata, "Pipeline run started");
            }
            TelemetryEventType::RunCompleted => {
                info!(metadata = %event.metadata, "Pipeline run completed");
            }
            TelemetryEventType::RunFailed => {
                tracing::error!(metadata = %event.metadata, "Pipeline run failed");
            }
            TelemetryEventType::TestFailed => {
                warn!(metadata = %event.metadata, "Statistical test failed");
            }
            _ => {
                debug!(metadata = %event.metadata, "Telemetry event");
            }
        }

        self.emit_metric_counter(&event);
    }

    fn emit_metric_counter(&self, event: &TelemetryEvent) {
        let label = |key: &str| {
            event
                .metadata
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string()
        };

        match event.event_type {
            TelemetryEventType::HypothesesGenerated => {
                let count = event.metadata.get("count").and_then(|v| v.as_u64()).unwrap_or(0);
                metrics::counter!("hypogen_hypotheses_generated_total").increment(count);
            }
            TelemetryEventType::TestCompleted => {
                metrics::counter!("hypogen_tests_executed_total", "test" => label("test"))
                    .increment(1);
            }
            TelemetryEventType::TestFailed => {
                metrics::counter!(
                    "hypogen_tests_failed_total",
                    "test" => label("test"),
                    "kind" => label("kind")
                )
                .increment(1);
            }
            TelemetryEventType::RunCompleted => {
                metrics::counter!("hypogen_pipeline_runs_total", "status" => "completed")
                    .increment(1);
            }
            TelemetryEventType::RunFailed => {
                metrics::counter!("hypogen_pipeline_runs_total", "status" => "failed").increment(1);
            }
            _ => {}
        }
    }

    fn event(&self, event_type: TelemetryEventType, metadata: serde_json::Value) {
        self.emit(TelemetryEvent::new(event_type, self.run_id, metadata));
    }

    pub fn run_started(&self, rows: usize, columns: usize) {
        self.event(
            TelemetryEventType::RunStarted,
            serde_json::json!({ "rows": rows, "columns": columns }),
        );
    }

    pub fn run_completed(&self, duration_ms: u64, executed: usize, failed: usize) {
        self.event(
            TelemetryEventType::RunCompleted,
            serde_json::json!({
                "duration_ms": duration_ms,
                "tests_executed": executed,
                "tests_failed": failed,
            }),
        );
    }

    pub fn run_failed(&self, error: &str) {
        self.event(TelemetryEventType::RunFailed, serde_json::json!({ "error": error }));
    }

    pub fn hypotheses_generated(&self, count: usize) {
        self.event(
            TelemetryEventType::HypothesesGenerated,
            serde_json::json!({ "count": count }),
        );
    }

    pub fn hypothesis_validated(&self, hypothesis_id: &str, testable: bool, feasibility: f64) {
        self.event(
            TelemetryEventType::HypothesisValidated,
            serde_json::json!({
                "hypothesis_id": hypothesis_id,
                "is_testable": testable,
                "feasibility_score": feasibility,
            }),
        );
    }

    pub fn test_completed(&self, result: &TestResult) {
        self.event(
            TelemetryEventType::TestCompleted,
            serde_json::json!({
                "test": result.test.as_str(),
                "variables": result.variables,
                "p_value": result.p_value,
            }),
        );
    }

    pub fn test_failed(&self, failure: &TestFailure) {
        self.event(
            TelemetryEventType::TestFailed,
            serde_json::json!({
                "test": failure.test,
                "variables": failure.variables,
                "kind": failure.kind.to_string(),
                "error": failure.error,
            }),
        );
    }

    pub fn correction_applied(&self, method: CorrectionMethod, corrected: usize) {
        self.event(
            TelemetryEventType::CorrectionApplied,
            serde_json::json!({ "method": method.as_str(), "corrected": corrected }),
        );
    }
}

impl Default for PipelineTelemetry {
    fn default() -> Self {
        Self::new(Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{FailureKind, StatisticalTest};

    #[test]
    fn test_event_type_display() {
        assert_eq!(TelemetryEventType::RunStarted.to_string(), "run_started");
        assert_eq!(TelemetryEventType::CorrectionApplied.to_string(), "correction_applied");
    }

    #[test]
    fn test_disabled_telemetry() {
        let telemetry = PipelineTelemetry::disabled();
        assert!(!telemetry.is_enabled());
        assert!(telemetry.run_id().is_nil());

        // no-op, must not panic
        telemetry.hypotheses_generated(3);
    }

    #[test]
    fn test_emit_without_recorder() {
        let telemetry = PipelineTelemetry::new(Uuid::new_v4());
        telemetry.test_completed(&TestResult::new(StatisticalTest::LjungBox, &[], 4.2));
        telemetry.test_failed(&TestFailure {
            index: 0,
            test: "fisher_exact".into(),
            variables: vec!["region".into(), "churned".into()],
            hypothesis_id: None,
            kind: FailureKind::Specification,
            error: "not 2x2".into(),
        });
    }

    #[test]
    fn test_event_serialization() {
        let event = TelemetryEvent::new(
            TelemetryEventType::TestCompleted,
            Uuid::nil(),
            serde_json::json!({ "test": "kendall_tau" }),
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("test_completed"));
        assert!(json.contains("kendall_tau"));
    }
}
