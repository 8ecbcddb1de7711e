//! Stage adapters: each wraps one component behind the stage contract.
//!
//! Stages read accumulated state and return typed output; none of them
//! holds business logic of its own. The catalog snapshot is fetched
//! lazily through a per-request handle, so a run blocked at the gate
//! never touches the platform at all.
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use grq_answer::ResponseSynthesizer;
use grq_catalog::{
    CatalogSnapshot, ExecutionClient, ModelDiscovery, SemanticScorer, SnapshotCache,
};
use grq_core::{
    rank_candidates, ExecutionContext, IntentKind, ModelCandidate, PipelineError, PipelineStage,
    PipelineState, StageId, StageOutput,
};
use grq_gate::SecurityGate;
use grq_mapping::FieldMapper;
use grq_query::{ExecutionAdapter, QueryBuilder};

/// Per-request view of the catalog: fetched at most once, on first use.
///
/// Every stage in one run sees the same snapshot even if the cache TTL
/// lapses mid-request.
pub struct SnapshotHandle {
    cache: Arc<SnapshotCache>,
    slot: OnceCell<Arc<CatalogSnapshot>>,
}

impl SnapshotHandle {
    pub fn new(cache: Arc<SnapshotCache>) -> Self {
        Self { cache, slot: OnceCell::new() }
    }

    pub async fn get(&self) -> Result<Arc<CatalogSnapshot>, PipelineError> {
        let snapshot = self.slot.get_or_try_init(|| self.cache.snapshot()).await?;
        Ok(snapshot.clone())
    }
}

fn missing(what: &str) -> PipelineError {
    // Only reachable if stages run out of order.
    PipelineError::Unknown(format!("{} missing from pipeline state", what))
}

// ============================================================================
// Stages
// ============================================================================

pub struct SecurityStage {
    gate: Arc<SecurityGate>,
}

impl SecurityStage {
    pub fn new(gate: Arc<SecurityGate>) -> Self {
        Self { gate }
    }
}

#[async_trait]
impl PipelineStage for SecurityStage {
    fn id(&self) -> StageId {
        StageId::Security
    }

    async fn run(
        &self,
        state: &PipelineState,
        _ctx: &ExecutionContext,
    ) -> Result<StageOutput, PipelineError> {
        Ok(StageOutput::Security(self.gate.evaluate(&state.raw_query, &state.user)))
    }
}

pub struct IntentStage;

#[async_trait]
impl PipelineStage for IntentStage {
    fn id(&self) -> StageId {
        StageId::Intent
    }

    async fn run(
        &self,
        state: &PipelineState,
        _ctx: &ExecutionContext,
    ) -> Result<StageOutput, PipelineError> {
        let (analysis, entities) = grq_intent::analyze(&state.raw_query)?;
        Ok(StageOutput::Intent { analysis, entities })
    }
}

pub struct DiscoveryStage {
    discovery: ModelDiscovery,
    snapshot: Arc<SnapshotHandle>,
}

impl DiscoveryStage {
    pub fn new(scorer: Arc<dyn SemanticScorer>, snapshot: Arc<SnapshotHandle>) -> Self {
        Self { discovery: ModelDiscovery::new(scorer), snapshot }
    }
}

#[async_trait]
impl PipelineStage for DiscoveryStage {
    fn id(&self) -> StageId {
        StageId::ModelDiscovery
    }

    async fn run(
        &self,
        state: &PipelineState,
        ctx: &ExecutionContext,
    ) -> Result<StageOutput, PipelineError> {
        let snapshot = self.snapshot.get().await?;

        // Catalog questions are about every model, not one of them; the
        // whole catalog is "selected" and relevance ranking is moot.
        let intent = state.intent.as_ref().ok_or_else(|| missing("intent"))?;
        if intent.kind == IntentKind::Meta {
            let mut candidates: Vec<ModelCandidate> = snapshot
                .models
                .iter()
                .map(|m| ModelCandidate {
                    model_id: m.model_id.clone(),
                    display_name: m.display_name.clone(),
                    relevance: 1.0,
                    reasoning: "catalog introspection".to_string(),
                })
                .collect();
            rank_candidates(&mut candidates);
            let selected = candidates
                .first()
                .cloned()
                .ok_or_else(|| PipelineError::ModelNotFound("catalog is empty".to_string()))?;
            return Ok(StageOutput::Discovery { candidates, selected });
        }

        let discovery = self
            .discovery
            .discover(&state.raw_query, &state.entities, &snapshot, &ctx.config)
            .await?;
        Ok(StageOutput::Discovery {
            candidates: discovery.candidates,
            selected: discovery.selected,
        })
    }
}

pub struct MappingStage {
    mapper: FieldMapper,
    snapshot: Arc<SnapshotHandle>,
}

impl MappingStage {
    pub fn new(scorer: Arc<dyn SemanticScorer>, snapshot: Arc<SnapshotHandle>) -> Self {
        Self { mapper: FieldMapper::new(scorer), snapshot }
    }
}

#[async_trait]
impl PipelineStage for MappingStage {
    fn id(&self) -> StageId {
        StageId::FieldMapping
    }

    async fn run(
        &self,
        state: &PipelineState,
        ctx: &ExecutionContext,
    ) -> Result<StageOutput, PipelineError> {
        let snapshot = self.snapshot.get().await?;
        let selected = state.selected_model.as_ref().ok_or_else(|| missing("selected model"))?;
        let mappings = self
            .mapper
            .map(&state.entities, selected, &snapshot, &ctx.config)
            .await;
        Ok(StageOutput::Mappings(mappings))
    }
}

pub struct BuildStage {
    snapshot: Arc<SnapshotHandle>,
}

impl BuildStage {
    pub fn new(snapshot: Arc<SnapshotHandle>) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl PipelineStage for BuildStage {
    fn id(&self) -> StageId {
        StageId::QueryBuild
    }

    async fn run(
        &self,
        state: &PipelineState,
        ctx: &ExecutionContext,
    ) -> Result<StageOutput, PipelineError> {
        let snapshot = self.snapshot.get().await?;
        let intent = state.intent.as_ref().ok_or_else(|| missing("intent"))?;
        let selected = state.selected_model.as_ref().ok_or_else(|| missing("selected model"))?;
        let plan = QueryBuilder::build(intent, &state.mappings, selected, &snapshot, &ctx.config)?;
        Ok(StageOutput::Plan(plan))
    }
}

pub struct ExecuteStage {
    adapter: ExecutionAdapter,
    snapshot: Arc<SnapshotHandle>,
}

impl ExecuteStage {
    pub fn new(client: Arc<dyn ExecutionClient>, snapshot: Arc<SnapshotHandle>) -> Self {
        Self { adapter: ExecutionAdapter::new(client), snapshot }
    }
}

#[async_trait]
impl PipelineStage for ExecuteStage {
    fn id(&self) -> StageId {
        StageId::Execute
    }

    async fn run(
        &self,
        state: &PipelineState,
        ctx: &ExecutionContext,
    ) -> Result<StageOutput, PipelineError> {
        let snapshot = self.snapshot.get().await?;
        let plan = state.plan.as_ref().ok_or_else(|| missing("query plan"))?;
        let result = self.adapter.execute(plan, &snapshot, &ctx.config).await?;
        Ok(StageOutput::Execution(result))
    }
}

pub struct ResponseStage {
    synthesizer: ResponseSynthesizer<'static>,
}

impl ResponseStage {
    pub fn new() -> Self {
        Self { synthesizer: ResponseSynthesizer::new() }
    }
}

impl Default for ResponseStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelineStage for ResponseStage {
    fn id(&self) -> StageId {
        StageId::Response
    }

    async fn run(
        &self,
        state: &PipelineState,
        ctx: &ExecutionContext,
    ) -> Result<StageOutput, PipelineError> {
        let selected = state.selected_model.as_ref().ok_or_else(|| missing("selected model"))?;
        let result = state.execution.as_ref().ok_or_else(|| missing("execution result"))?;
        let min_confidence = state.min_confidence().unwrap_or(1.0);
        let response = self.synthesizer.synthesize(
            &state.user,
            selected,
            &state.candidates,
            &state.mappings,
            result,
            min_confidence,
            &ctx.config,
        )?;
        Ok(StageOutput::Response(response))
    }
}
