//! Execution adapter: the one place the pipeline touches the platform.
//!
//! The platform lists records; everything else — counts, distinct values,
//! comparison groups, caps — is computed here over the returned set.
//! Timeouts are the only failure worth retrying; unauthorized, not-found
//! and malformed answers will not improve on a second attempt.
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use grq_core::{
    Aggregation, ComparisonGroup, ExecutionFailure, ExecutionResult, PipelineConfig,
    PipelineError, QueryOutcome, QueryPlan,
};
use grq_catalog::{CatalogSnapshot, ExecutionClient};

pub struct ExecutionAdapter {
    client: Arc<dyn ExecutionClient>,
}

impl ExecutionAdapter {
    pub fn new(client: Arc<dyn ExecutionClient>) -> Self {
        Self { client }
    }

    /// Execute the plan and shape the listing into the query outcome.
    pub async fn execute(
        &self,
        plan: &QueryPlan,
        snapshot: &CatalogSnapshot,
        config: &PipelineConfig,
    ) -> Result<ExecutionResult, PipelineError> {
        let started = Instant::now();

        // Catalog questions are answered from the snapshot we already
        // hold; no platform round-trip.
        if plan.aggregation == Aggregation::Describe {
            let models = snapshot.entries();
            let total = models.len();
            return Ok(ExecutionResult {
                outcome: QueryOutcome::Catalog { models },
                total_count: total,
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }

        let records = self.fetch_with_retry(plan, config).await?;
        let total_count = records.len();
        let outcome = shape(plan, records);

        Ok(ExecutionResult {
            outcome,
            total_count,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn fetch_with_retry(
        &self,
        plan: &QueryPlan,
        config: &PipelineConfig,
    ) -> Result<Vec<Value>, PipelineError> {
        let attempts = config.retry_attempts.max(1);
        for attempt in 1..=attempts {
            let call = self.client.fetch(plan);
            let outcome =
                tokio::time::timeout(Duration::from_millis(config.call_timeout_ms), call).await;

            match outcome {
                Ok(Ok(records)) => {
                    debug!(attempt, records = records.len(), "platform listing fetched");
                    return Ok(records);
                }
                // A timed-out call and a hung call are the same failure.
                Ok(Err(ExecutionFailure::Timeout)) | Err(_) => {}
                Ok(Err(other)) => return Err(PipelineError::from(other)),
            }

            if attempt < attempts {
                let backoff = config.retry_backoff_ms.saturating_mul(1 << (attempt - 1));
                warn!(attempt, backoff_ms = backoff, "execution timed out; retrying");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
        }
        Err(PipelineError::QueryTimeout { attempts })
    }
}

/// Compute the requested aggregation over the full listing.
fn shape(plan: &QueryPlan, records: Vec<Value>) -> QueryOutcome {
    match &plan.aggregation {
        Aggregation::Count => QueryOutcome::Count { value: records.len() },
        Aggregation::List => {
            let remainder = records.len().saturating_sub(plan.result_cap);
            let mut records = records;
            records.truncate(plan.result_cap);
            QueryOutcome::Listing { records, remainder }
        }
        Aggregation::DistinctValues { fields } => {
            // One field carries the question; extra generic references
            // are redundant mentions of the same ask.
            let field_id = fields.first().cloned().unwrap_or_default();
            let mut values: Vec<String> = Vec::new();
            for record in &records {
                if let Some(value) = field_text(record, &field_id) {
                    if !values.contains(&value) {
                        values.push(value);
                    }
                }
            }
            QueryOutcome::DistinctValues { field_id, values }
        }
        Aggregation::Compare { field_id, values } => {
            let targets: Vec<String> = if values.is_empty() {
                let mut seen = Vec::new();
                for record in &records {
                    if let Some(value) = field_text(record, field_id) {
                        if !seen.contains(&value) {
                            seen.push(value);
                        }
                    }
                }
                seen
            } else {
                values.clone()
            };
            let groups = targets
                .into_iter()
                .map(|value| {
                    let count = records
                        .iter()
                        .filter(|r| field_text(r, field_id).as_deref() == Some(value.as_str()))
                        .count();
                    ComparisonGroup { value, count }
                })
                .collect();
            QueryOutcome::Comparison { field_id: field_id.clone(), groups }
        }
        Aggregation::Describe => {
            // Handled before the platform call; unreachable here but kept
            // total so shaping never panics.
            QueryOutcome::Catalog { models: Vec::new() }
        }
    }
}

fn field_text(record: &Value, field_id: &str) -> Option<String> {
    match record.get(field_id)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
