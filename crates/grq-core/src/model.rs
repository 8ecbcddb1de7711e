//! Data model shared across all pipeline stages.
//!
//! Every type here is serde-serializable so pipeline state and traces can
//! be exported as JSON for diagnosis.
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Security
// ============================================================================

/// Verdict of a single security gate layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateVerdict {
    Allow,
    Block,
}

/// One layer's decision in the security cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityDecision {
    /// Layer name (e.g. "input_sanitization").
    pub layer: String,
    pub verdict: GateVerdict,
    pub reason: String,
    /// Normalized risk estimate in [0,1].
    pub risk_score: f64,
}

impl SecurityDecision {
    pub fn allow(layer: impl Into<String>, reason: impl Into<String>, risk_score: f64) -> Self {
        Self {
            layer: layer.into(),
            verdict: GateVerdict::Allow,
            reason: reason.into(),
            risk_score: risk_score.clamp(0.0, 1.0),
        }
    }

    pub fn block(layer: impl Into<String>, reason: impl Into<String>, risk_score: f64) -> Self {
        Self {
            layer: layer.into(),
            verdict: GateVerdict::Block,
            reason: reason.into(),
            risk_score: risk_score.clamp(0.0, 1.0),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.verdict == GateVerdict::Block
    }
}

/// Aggregate result of the security cascade.
///
/// Holds every layer evaluated before the cascade stopped, not just the
/// blocking one, so a blocked run still has a full trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateOutcome {
    pub decisions: Vec<SecurityDecision>,
    pub passed: bool,
}

impl GateOutcome {
    /// The decision that stopped the cascade, if any.
    pub fn blocking_decision(&self) -> Option<&SecurityDecision> {
        self.decisions.iter().find(|d| d.is_blocked())
    }
}

// ============================================================================
// Intent & entities
// ============================================================================

/// Operation category of the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentKind {
    Count,
    List,
    Compare,
    Analyze,
    /// A question about the catalog itself ("what data do you have?").
    Meta,
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            IntentKind::Count => "COUNT",
            IntentKind::List => "LIST",
            IntentKind::Compare => "COMPARE",
            IntentKind::Analyze => "ANALYZE",
            IntentKind::Meta => "META",
        };
        write!(f, "{}", s)
    }
}

/// Classified intent with the rule that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentAnalysis {
    pub kind: IntentKind,
    pub confidence: f64,
    /// Name of the lexical rule (or fallback) that matched.
    pub matched_rule: String,
}

/// Inferred semantic kind of an extracted span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Capitalized or quoted span: likely a concrete value ("Sony").
    ProperNoun,
    /// Lowercase content word: likely names a field or category.
    DomainTerm,
    Number,
    Unknown,
}

/// A text span extracted from the question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub entity_type: EntityType,
    pub confidence: f64,
}

impl Entity {
    pub fn new(text: impl Into<String>, entity_type: EntityType, confidence: f64) -> Self {
        Self {
            text: text.into(),
            entity_type,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

// ============================================================================
// Model discovery
// ============================================================================

/// A catalog model ranked by relevance to the question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCandidate {
    pub model_id: String,
    pub display_name: String,
    /// Relevance in [0,1].
    pub relevance: f64,
    pub reasoning: String,
}

/// Sort candidates descending by relevance, ties ascending by model id.
///
/// This ordering is part of the discovery contract: identical inputs and
/// catalog state must rank identically.
pub fn rank_candidates(candidates: &mut [ModelCandidate]) {
    candidates.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.model_id.cmp(&b.model_id))
    });
}

// ============================================================================
// Field mapping
// ============================================================================

/// How an entity relates to a candidate field.
///
/// This is the single highest-value distinction in the pipeline: a term
/// naming the field's category ("companies") must never become a filter
/// value, or the query silently returns zero records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityRole {
    /// A specific value the field can hold ("Sony").
    FilterValue { reasoning: String },
    /// A term naming the field or its category itself ("advertisers").
    GenericIdentifier { reasoning: String },
}

impl EntityRole {
    pub fn filter_value(reasoning: impl Into<String>) -> Self {
        EntityRole::FilterValue { reasoning: reasoning.into() }
    }

    pub fn generic_identifier(reasoning: impl Into<String>) -> Self {
        EntityRole::GenericIdentifier { reasoning: reasoning.into() }
    }

    pub fn is_filter_value(&self) -> bool {
        matches!(self, EntityRole::FilterValue { .. })
    }

    pub fn is_generic(&self) -> bool {
        matches!(self, EntityRole::GenericIdentifier { .. })
    }

    pub fn reasoning(&self) -> &str {
        match self {
            EntityRole::FilterValue { reasoning } => reasoning,
            EntityRole::GenericIdentifier { reasoning } => reasoning,
        }
    }
}

/// Role classification plus the confidence the classifier had in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleClassification {
    pub role: EntityRole,
    pub confidence: f64,
}

/// An entity mapped onto a target field of the selected model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    pub entity: Entity,
    pub field_id: String,
    pub confidence: f64,
    pub reasoning: String,
    pub role: EntityRole,
}

impl FieldMapping {
    pub fn is_filter_value(&self) -> bool {
        self.role.is_filter_value()
    }

    pub fn is_generic(&self) -> bool {
        self.role.is_generic()
    }
}

// ============================================================================
// Query plan
// ============================================================================

/// One equality constraint, derived only from a FilterValue mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub field_id: String,
    pub value: String,
}

impl std::fmt::Display for FilterClause {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} = \"{}\"", self.field_id, self.value)
    }
}

/// What the execution adapter should compute from the listed records.
///
/// The platform only exposes listing, so every aggregation here is
/// computed client-side over the returned set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aggregation {
    Count,
    List,
    /// Unique values of the named fields, in first-seen order.
    DistinctValues { fields: Vec<String> },
    /// Per-value record counts over one field.
    Compare { field_id: String, values: Vec<String> },
    /// Catalog introspection; served from the snapshot, no platform call.
    Describe,
}

/// Deterministic structured query against the selected model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPlan {
    pub model_id: String,
    /// Fields projected into the listing.
    pub fields: Vec<String>,
    /// AND-combined equality filters.
    pub filters: Vec<FilterClause>,
    pub aggregation: Aggregation,
    /// Listing cap; overflow surfaces as an explicit remainder.
    pub result_cap: usize,
}

// ============================================================================
// Execution
// ============================================================================

/// Failure kinds at the data platform boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionFailure {
    /// The only retryable failure.
    Timeout,
    Unauthorized { detail: String },
    NotFound { detail: String },
    Malformed { detail: String },
}

/// Shaped outcome of executing a query plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryOutcome {
    /// Client-computed count over the full filtered listing.
    Count { value: usize },
    /// Capped listing with an explicit "+N more" remainder.
    Listing { records: Vec<Value>, remainder: usize },
    DistinctValues { field_id: String, values: Vec<String> },
    Comparison { field_id: String, groups: Vec<ComparisonGroup> },
    /// Catalog description for META questions.
    Catalog { models: Vec<CatalogEntry> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonGroup {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub model_id: String,
    pub display_name: String,
    pub fields: Vec<String>,
}

/// Result of the execution stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub outcome: QueryOutcome,
    /// Total records the platform matched, before capping.
    pub total_count: usize,
    pub elapsed_ms: u64,
}

// ============================================================================
// Response
// ============================================================================

/// Disclosure attached when any upstream confidence fell below threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceDisclosure {
    pub min_confidence: f64,
    /// Alternatives considered (e.g. runner-up models).
    pub alternatives: Vec<String>,
    /// Reasoning strings from the low-confidence decisions.
    pub reasoning: Vec<String>,
}

/// Role-shaped answer returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub role: crate::context::Role,
    pub summary: String,
    /// Raw shaped data; omitted for roles that only get narrative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclosure: Option<ConfidenceDisclosure>,
    pub follow_ups: Vec<String>,
}

// ============================================================================
// Pipeline bookkeeping
// ============================================================================

/// Stages of the linear happy path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageId {
    Init,
    Security,
    Intent,
    ModelDiscovery,
    FieldMapping,
    QueryBuild,
    Execute,
    Response,
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            StageId::Init => "INIT",
            StageId::Security => "SECURITY",
            StageId::Intent => "INTENT",
            StageId::ModelDiscovery => "MODEL_DISCOVERY",
            StageId::FieldMapping => "FIELD_MAPPING",
            StageId::QueryBuild => "QUERY_BUILD",
            StageId::Execute => "EXECUTE",
            StageId::Response => "RESPONSE",
        };
        write!(f, "{}", s)
    }
}

/// Terminal and non-terminal run states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    Running,
    Blocked,
    Failed,
    Done,
}

impl PipelineStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PipelineStatus::Running)
    }
}

/// Per-stage trace entry recorded by the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTrace {
    pub stage: StageId,
    /// blake3 hash of the serialized state entering the stage.
    pub in_hash: String,
    /// blake3 hash of the serialized state after the stage's output landed.
    pub out_hash: String,
    pub latency_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_candidates_descending_with_id_tiebreak() {
        let mut candidates = vec![
            ModelCandidate {
                model_id: "zeta".to_string(),
                display_name: "Zeta".to_string(),
                relevance: 0.8,
                reasoning: String::new(),
            },
            ModelCandidate {
                model_id: "alpha".to_string(),
                display_name: "Alpha".to_string(),
                relevance: 0.8,
                reasoning: String::new(),
            },
            ModelCandidate {
                model_id: "mid".to_string(),
                display_name: "Mid".to_string(),
                relevance: 0.9,
                reasoning: String::new(),
            },
        ];
        rank_candidates(&mut candidates);
        let ids: Vec<&str> = candidates.iter().map(|c| c.model_id.as_str()).collect();
        assert_eq!(ids, vec!["mid", "alpha", "zeta"]);
    }

    #[test]
    fn test_entity_role_tagging() {
        let filter = EntityRole::filter_value("proper noun, no synonym match");
        let generic = EntityRole::generic_identifier("synonym of field category");
        assert!(filter.is_filter_value());
        assert!(generic.is_generic());
        assert_eq!(generic.reasoning(), "synonym of field category");

        let json = serde_json::to_string(&generic).unwrap();
        assert!(json.contains("GENERIC_IDENTIFIER"));
    }

    #[test]
    fn test_risk_score_clamped() {
        let decision = SecurityDecision::allow("l", "ok", 1.4);
        assert_eq!(decision.risk_score, 1.0);
        let decision = SecurityDecision::block("l", "bad", -0.2);
        assert_eq!(decision.risk_score, 0.0);
    }

    #[test]
    fn test_gate_outcome_blocking_decision() {
        let outcome = GateOutcome {
            decisions: vec![
                SecurityDecision::allow("a", "ok", 0.1),
                SecurityDecision::block("b", "bad", 0.9),
            ],
            passed: false,
        };
        assert_eq!(outcome.blocking_decision().unwrap().layer, "b");
    }

    #[test]
    fn test_filter_clause_display() {
        let clause = FilterClause {
            field_id: "ADVERTISER".to_string(),
            value: "Sony".to_string(),
        };
        assert_eq!(clause.to_string(), "ADVERTISER = \"Sony\"");
    }
}
