//! Pipeline state: the single accumulating record threaded through one request.
//!
//! Each stage appends its output; no field is rewritten by a later stage.
//! The record lives for exactly one request and is never persisted.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::UserContext;
use crate::model::{
    Entity, ExecutionResult, FieldMapping, GateOutcome, IntentAnalysis, ModelCandidate,
    PipelineStatus, QueryPlan, Response, SecurityDecision, StageId, StageTrace,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub trace_id: String,
    pub raw_query: String,
    pub user: UserContext,
    pub started_at: DateTime<Utc>,

    pub security_decisions: Vec<SecurityDecision>,
    pub intent: Option<IntentAnalysis>,
    pub entities: Vec<Entity>,
    pub candidates: Vec<ModelCandidate>,
    pub selected_model: Option<ModelCandidate>,
    pub mappings: Vec<FieldMapping>,
    pub plan: Option<QueryPlan>,
    pub execution: Option<ExecutionResult>,
    pub response: Option<Response>,

    pub current_stage: StageId,
    pub status: PipelineStatus,
    pub trace: Vec<StageTrace>,
}

impl PipelineState {
    pub fn new(trace_id: impl Into<String>, raw_query: impl Into<String>, user: UserContext) -> Self {
        Self {
            trace_id: trace_id.into(),
            raw_query: raw_query.into(),
            user,
            started_at: Utc::now(),
            security_decisions: Vec::new(),
            intent: None,
            entities: Vec::new(),
            candidates: Vec::new(),
            selected_model: None,
            mappings: Vec::new(),
            plan: None,
            execution: None,
            response: None,
            current_stage: StageId::Init,
            status: PipelineStatus::Running,
            trace: Vec::new(),
        }
    }

    pub fn advance(&mut self, stage: StageId) {
        self.current_stage = stage;
    }

    pub fn record_security(&mut self, outcome: GateOutcome) {
        self.security_decisions = outcome.decisions;
    }

    pub fn record_intent(&mut self, analysis: IntentAnalysis, entities: Vec<Entity>) {
        self.intent = Some(analysis);
        self.entities = entities;
    }

    pub fn record_discovery(&mut self, candidates: Vec<ModelCandidate>, selected: ModelCandidate) {
        self.candidates = candidates;
        self.selected_model = Some(selected);
    }

    pub fn record_mappings(&mut self, mappings: Vec<FieldMapping>) {
        self.mappings = mappings;
    }

    pub fn record_plan(&mut self, plan: QueryPlan) {
        self.plan = Some(plan);
    }

    pub fn record_execution(&mut self, result: ExecutionResult) {
        self.execution = Some(result);
    }

    pub fn record_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    pub fn push_trace(&mut self, entry: StageTrace) {
        self.trace.push(entry);
    }

    pub fn mark_done(&mut self) {
        self.status = PipelineStatus::Done;
    }

    pub fn mark_blocked(&mut self) {
        self.status = PipelineStatus::Blocked;
    }

    pub fn mark_failed(&mut self) {
        self.status = PipelineStatus::Failed;
    }

    /// Lowest confidence recorded by any upstream decision, if any.
    ///
    /// Drives the response disclosure: below threshold, the answer must
    /// surface alternatives and reasoning.
    pub fn min_confidence(&self) -> Option<f64> {
        let mut min: Option<f64> = None;
        let mut consider = |value: f64| {
            min = Some(match min {
                Some(current) => current.min(value),
                None => value,
            });
        };
        if let Some(intent) = &self.intent {
            consider(intent.confidence);
        }
        if let Some(selected) = &self.selected_model {
            consider(selected.relevance);
        }
        for mapping in &self.mappings {
            consider(mapping.confidence);
        }
        min
    }
}
