//! Stage contract: one trait for every pipeline stage.
use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::error::PipelineError;
use crate::model::{
    Entity, ExecutionResult, FieldMapping, GateOutcome, IntentAnalysis, ModelCandidate, QueryPlan,
    Response, StageId,
};
use crate::state::PipelineState;

/// Typed output of one stage, appended to the state by the runner.
///
/// Stages read the state but never write it; a stage that fails therefore
/// leaves the state exactly as its predecessor did.
#[derive(Debug, Clone)]
pub enum StageOutput {
    Security(GateOutcome),
    Intent {
        analysis: IntentAnalysis,
        entities: Vec<Entity>,
    },
    Discovery {
        candidates: Vec<ModelCandidate>,
        selected: ModelCandidate,
    },
    Mappings(Vec<FieldMapping>),
    Plan(QueryPlan),
    Execution(ExecutionResult),
    Response(Response),
}

/// One step of the query intelligence pipeline.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    /// Which slot in the linear happy path this stage fills.
    fn id(&self) -> StageId;

    /// Compute this stage's output from the accumulated state.
    async fn run(
        &self,
        state: &PipelineState,
        ctx: &ExecutionContext,
    ) -> Result<StageOutput, PipelineError>;
}
