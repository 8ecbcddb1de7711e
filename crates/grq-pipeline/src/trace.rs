//! JSON trace export for run diagnosis.
use serde_json::{json, Value};

use grq_core::{PipelineRun, GRQ_VERSION};

/// Export a completed run as a self-describing JSON document.
///
/// Carries everything needed to replay the decision chain: per-stage
/// hashes and latencies, the decisions each stage recorded, and the
/// terminal status. Safe to log as-is; the raw platform records are not
/// included.
pub fn export_trace(run: &PipelineRun) -> Value {
    json!({
        "version": GRQ_VERSION,
        "trace_id": run.state.trace_id,
        "status": run.state.status,
        "current_stage": run.state.current_stage,
        "error": run.error.as_ref().map(|e| e.to_string()),
        "security_decisions": run.state.security_decisions,
        "intent": run.state.intent,
        "selected_model": run.state.selected_model,
        "candidates": run.state.candidates,
        "mappings": run.state.mappings,
        "plan": run.state.plan,
        "stages": run.state.trace,
    })
}
