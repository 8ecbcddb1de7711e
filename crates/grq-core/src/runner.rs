//! Pipeline runner: sequences stages as a finite-state machine.
//!
//! The runner owns no business logic. It checks the auth precondition,
//! walks the linear happy path, appends each stage's output to the state,
//! records a hashed trace entry, and classifies failures as BLOCKED
//! (security) or FAILED (everything else). Terminal states are never
//! re-entered.
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use crate::context::{ExecutionContext, UserContext};
use crate::error::PipelineError;
use crate::model::{PipelineStatus, StageTrace};
use crate::stage::{PipelineStage, StageOutput};
use crate::state::PipelineState;

/// Completed run: the accumulated state plus the error that ended it, if any.
#[derive(Debug)]
pub struct PipelineRun {
    pub state: PipelineState,
    pub error: Option<PipelineError>,
}

impl PipelineRun {
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.state.status == PipelineStatus::Done
    }
}

pub struct PipelineRunner {
    stages: Vec<Box<dyn PipelineStage>>,
}

impl PipelineRunner {
    pub fn new(stages: Vec<Box<dyn PipelineStage>>) -> Self {
        Self { stages }
    }

    pub async fn run(
        &self,
        raw_query: &str,
        user: UserContext,
        ctx: &ExecutionContext,
    ) -> PipelineRun {
        let mut state = PipelineState::new(ctx.trace_id.clone(), raw_query, user);

        // Auth precondition: an expired token never enters the pipeline.
        if !state.user.is_token_valid(Utc::now()) {
            warn!(trace_id = %state.trace_id, "token outside validity window");
            state.mark_failed();
            let error = PipelineError::AuthExpired(format!(
                "token for {} outside validity window",
                state.user.user_id
            ));
            return PipelineRun { state, error: Some(error) };
        }

        for stage in &self.stages {
            let stage_id = stage.id();
            state.advance(stage_id);
            let in_hash = hash_state(&state);
            let start = Instant::now();

            match stage.run(&state, ctx).await {
                Ok(output) => {
                    let ended = apply_output(&mut state, output);
                    let latency_ms = start.elapsed().as_millis() as u64;
                    state.push_trace(StageTrace {
                        stage: stage_id,
                        in_hash,
                        out_hash: hash_state(&state),
                        latency_ms,
                    });
                    info!(
                        trace_id = %state.trace_id,
                        stage = %stage_id,
                        latency_ms,
                        "stage complete"
                    );
                    if let Some(error) = ended {
                        state.mark_blocked();
                        warn!(trace_id = %state.trace_id, stage = %stage_id, %error, "blocked");
                        return PipelineRun { state, error: Some(error) };
                    }
                }
                Err(error) => {
                    let latency_ms = start.elapsed().as_millis() as u64;
                    state.push_trace(StageTrace {
                        stage: stage_id,
                        in_hash: in_hash.clone(),
                        out_hash: in_hash,
                        latency_ms,
                    });
                    if error.is_security_block() {
                        state.mark_blocked();
                    } else {
                        state.mark_failed();
                    }
                    warn!(trace_id = %state.trace_id, stage = %stage_id, %error, "stage failed");
                    return PipelineRun { state, error: Some(error) };
                }
            }
        }

        state.mark_done();
        PipelineRun { state, error: None }
    }
}

/// Append a stage output to the state.
///
/// Returns the blocking error when the security gate did not pass; the
/// gate's decisions are retained in the state either way.
fn apply_output(state: &mut PipelineState, output: StageOutput) -> Option<PipelineError> {
    match output {
        StageOutput::Security(outcome) => {
            let blocking = outcome.blocking_decision().map(|d| PipelineError::SecurityBlocked {
                layer: d.layer.clone(),
                reason: d.reason.clone(),
            });
            let passed = outcome.passed;
            state.record_security(outcome);
            if !passed {
                return blocking.or_else(|| {
                    Some(PipelineError::SecurityBlocked {
                        layer: "unknown".to_string(),
                        reason: "gate did not pass".to_string(),
                    })
                });
            }
            None
        }
        StageOutput::Intent { analysis, entities } => {
            state.record_intent(analysis, entities);
            None
        }
        StageOutput::Discovery { candidates, selected } => {
            state.record_discovery(candidates, selected);
            None
        }
        StageOutput::Mappings(mappings) => {
            state.record_mappings(mappings);
            None
        }
        StageOutput::Plan(plan) => {
            state.record_plan(plan);
            None
        }
        StageOutput::Execution(result) => {
            state.record_execution(result);
            None
        }
        StageOutput::Response(response) => {
            state.record_response(response);
            None
        }
    }
}

fn hash_state(state: &PipelineState) -> String {
    match serde_json::to_vec(state) {
        Ok(bytes) => format!("blake3:{}", blake3::hash(&bytes)),
        Err(_) => "blake3:unhashable".to_string(),
    }
}
