//! Request context: who is asking, and under what pipeline configuration.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Role of the requesting user, shaping the synthesized response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Broad access: narrative summaries plus strategic framing.
    Executive,
    /// Analytical needs: structured data plus suggested follow-ups.
    Analyst,
    /// Day-to-day usage: concise factual summaries with data.
    Operations,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Role::Executive => write!(f, "EXECUTIVE"),
            Role::Analyst => write!(f, "ANALYST"),
            Role::Operations => write!(f, "OPERATIONS"),
        }
    }
}

/// Immutable identity supplied by the external auth collaborator.
///
/// The pipeline never mutates this; an expired token window is a
/// precondition failure surfaced before any stage runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub role: Role,
    pub permissions: HashSet<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            role,
            permissions: HashSet::new(),
            valid_from: now,
            valid_until: now + chrono::Duration::hours(1),
        }
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    pub fn with_validity(mut self, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.valid_from = from;
        self.valid_until = until;
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Check the token validity window against a clock reading.
    pub fn is_token_valid(&self, now: DateTime<Utc>) -> bool {
        now >= self.valid_from && now < self.valid_until
    }
}

/// Tunable knobs for one pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Per-call timeout for external collaborators, in milliseconds.
    pub call_timeout_ms: u64,
    /// How many times a timed-out execution call is retried.
    pub retry_attempts: u32,
    /// Base delay for exponential retry backoff, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Hard cap on listed records; overflow surfaces as a remainder.
    pub result_cap: usize,
    /// Field mappings below this confidence are dropped.
    pub mapping_floor: f64,
    /// Intents that require a specific field (COMPARE) need this much.
    pub strict_mapping_floor: f64,
    /// Discovery fails when no model scores above this.
    pub discovery_floor: f64,
    /// Alternates at or above this score are reported alongside the winner.
    pub alternate_floor: f64,
    /// Below this minimum upstream confidence, responses carry a disclosure.
    pub disclosure_threshold: f64,
    /// Catalog snapshot time-to-live, in seconds.
    pub catalog_ttl_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 5_000,
            retry_attempts: 3,
            retry_backoff_ms: 100,
            result_cap: 10,
            mapping_floor: 0.5,
            strict_mapping_floor: 0.7,
            discovery_floor: 0.3,
            alternate_floor: 0.6,
            disclosure_threshold: 0.8,
            catalog_ttl_secs: 300,
        }
    }
}

/// Per-request execution context threaded through every stage.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub trace_id: String,
    pub started_at: DateTime<Utc>,
    pub config: PipelineConfig,
}

impl ExecutionContext {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            config,
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
