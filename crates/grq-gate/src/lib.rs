//! GRQ Gate: ordered security validation cascade.
//!
//! Four independent layers run in a fixed order: input sanitization,
//! semantic threat analysis, business-context validation, and final
//! approval over aggregate risk. The first block halts the cascade and
//! the whole pipeline; every evaluated decision is kept in the trace.

pub mod gate;
pub mod layers;

pub use gate::SecurityGate;
pub use layers::{
    BusinessContext, FinalApproval, GateLayer, InputSanitization, SemanticThreat,
    APPROVAL_RISK_CEILING, MAX_QUERY_CHARS,
};
