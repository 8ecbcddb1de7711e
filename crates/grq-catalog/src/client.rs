//! Collaborator boundaries: the data platform and the semantic scorer.
//!
//! Both are injected as explicit capabilities so the pipeline runs
//! deterministically in tests and without a live scoring service.
use async_trait::async_trait;
use serde_json::Value;

use grq_core::{ExecutionFailure, QueryPlan};

use crate::types::{FieldDescriptor, ModelDescriptor};

/// Read-only metadata surface of the golden-record platform.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ExecutionFailure>;

    async fn describe_fields(&self, model_id: &str)
        -> Result<Vec<FieldDescriptor>, ExecutionFailure>;
}

/// Query surface of the platform.
///
/// The platform exposes listing only: it applies the plan's filters and
/// projection and returns the full, unpaginated matching set. All
/// aggregation (counts, distinct values, comparisons, caps) is computed
/// client-side by the execution adapter.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Value>, ExecutionFailure>;
}
