//! GRQ Core: data model, stage contract, and pipeline runner.
//!
//! The query intelligence pipeline is a directed, acyclic sequence of
//! stages over one accumulating state record. This crate holds the pieces
//! every component shares: the state and decision types, the error
//! taxonomy, the `PipelineStage` trait, and the FSM runner that sequences
//! stages and propagates failures.

pub mod context;
pub mod error;
pub mod model;
pub mod runner;
pub mod stage;
pub mod state;

pub use context::{ExecutionContext, PipelineConfig, Role, UserContext};
pub use error::PipelineError;
pub use model::{
    Aggregation, CatalogEntry, ComparisonGroup, ConfidenceDisclosure, Entity, EntityRole,
    EntityType, ExecutionFailure, ExecutionResult, FieldMapping, FilterClause, GateOutcome,
    GateVerdict, IntentAnalysis, IntentKind, ModelCandidate, PipelineStatus, QueryOutcome,
    QueryPlan, Response, RoleClassification, SecurityDecision, StageId, StageTrace,
    rank_candidates,
};
pub use runner::{PipelineRun, PipelineRunner};
pub use stage::{PipelineStage, StageOutput};
pub use state::PipelineState;

/// Engine version, stamped into exported traces.
pub const GRQ_VERSION: &str = "0.1.0";
