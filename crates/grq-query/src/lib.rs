//! GRQ Query: structured query construction and platform execution.
//!
//! `QueryBuilder` turns intent, mappings and the selected model into a
//! deterministic `QueryPlan`; `ExecutionAdapter` runs the plan against
//! the listing-only platform with per-call timeouts and timeout-only
//! retries, then computes the aggregation client-side.

pub mod adapter;
pub mod builder;

pub use adapter::ExecutionAdapter;
pub use builder::QueryBuilder;
