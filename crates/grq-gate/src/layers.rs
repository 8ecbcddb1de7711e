//! The four gate layers.
//!
//! Each layer is a pure function of (query text, user context, prior
//! decisions) to a `SecurityDecision`. Layers never see downstream
//! pipeline state and never mutate anything.
use lazy_static::lazy_static;
use regex::Regex;

use grq_core::{SecurityDecision, UserContext};

/// Longest query the gate will consider.
pub const MAX_QUERY_CHARS: usize = 2_000;

/// Aggregate risk above this blocks at final approval.
pub const APPROVAL_RISK_CEILING: f64 = 0.6;

lazy_static! {
    /// Structural injection attempts: script tags, SQL fragments,
    /// template expansion.
    static ref INJECTION_PATTERNS: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(?i)<\s*script").unwrap(), "script tag"),
        (Regex::new(r"(?i);\s*drop\s+table").unwrap(), "sql drop"),
        (Regex::new(r"(?i)\bunion\s+select\b").unwrap(), "sql union"),
        (Regex::new(r"\$\{[^}]*\}").unwrap(), "template expansion"),
        (Regex::new(r"(?i)\bexec\s*\(").unwrap(), "exec call"),
    ];

    /// Phrasings that read as exfiltration or instruction override rather
    /// than a business question.
    static ref THREAT_PATTERNS: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(?i)ignore (all |the )?(previous|prior) instructions").unwrap(), "instruction override"),
        (Regex::new(r"(?i)\bsystem prompt\b").unwrap(), "prompt probing"),
        (Regex::new(r"(?i)\b(dump|export|extract) (all|every|the entire)\b").unwrap(), "bulk exfiltration"),
        (Regex::new(r"(?i)\bbypass\b.*\b(security|auth|permission)").unwrap(), "control bypass"),
        (Regex::new(r"(?i)\ball records at once\b").unwrap(), "bulk exfiltration"),
    ];

    /// Terms outside the business-data domain this platform serves.
    static ref OFF_DOMAIN_PATTERNS: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(?i)\b(password|credential|secret key|api key|token)s?\b").unwrap(), "credential material"),
        (Regex::new(r"(?i)\b(ssn|social security number)\b").unwrap(), "restricted identifier"),
    ];
}

/// One independent validation check in the cascade.
pub trait GateLayer: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(
        &self,
        query: &str,
        user: &UserContext,
        prior: &[SecurityDecision],
    ) -> SecurityDecision;
}

/// Layer 1: structural input sanitization.
pub struct InputSanitization;

impl GateLayer for InputSanitization {
    fn name(&self) -> &'static str {
        "input_sanitization"
    }

    fn evaluate(&self, query: &str, _user: &UserContext, _prior: &[SecurityDecision]) -> SecurityDecision {
        if query.len() > MAX_QUERY_CHARS {
            return SecurityDecision::block(
                self.name(),
                format!("query exceeds {} characters", MAX_QUERY_CHARS),
                0.8,
            );
        }
        if query.chars().any(|c| c.is_control() && c != '\n' && c != '\t') {
            return SecurityDecision::block(self.name(), "control characters in input", 0.9);
        }
        for (pattern, label) in INJECTION_PATTERNS.iter() {
            if pattern.is_match(query) {
                return SecurityDecision::block(
                    self.name(),
                    format!("injection pattern detected: {}", label),
                    0.95,
                );
            }
        }
        SecurityDecision::allow(self.name(), "input is structurally clean", 0.05)
    }
}

/// Layer 2: semantic threat analysis over the question's phrasing.
pub struct SemanticThreat;

impl GateLayer for SemanticThreat {
    fn name(&self) -> &'static str {
        "semantic_threat"
    }

    fn evaluate(&self, query: &str, _user: &UserContext, _prior: &[SecurityDecision]) -> SecurityDecision {
        for (pattern, label) in THREAT_PATTERNS.iter() {
            if pattern.is_match(query) {
                return SecurityDecision::block(
                    self.name(),
                    format!("threat phrasing detected: {}", label),
                    0.9,
                );
            }
        }
        // "raw" asks are suspicious but not blocking on their own.
        let risk = if query.to_lowercase().contains("raw dump") { 0.4 } else { 0.1 };
        SecurityDecision::allow(self.name(), "no threat phrasing detected", risk)
    }
}

/// Layer 3: the question must make sense for this user against business data.
pub struct BusinessContext;

impl GateLayer for BusinessContext {
    fn name(&self) -> &'static str {
        "business_context"
    }

    fn evaluate(&self, query: &str, user: &UserContext, _prior: &[SecurityDecision]) -> SecurityDecision {
        if !user.has_permission("data:read") {
            return SecurityDecision::block(
                self.name(),
                format!("user {} lacks data:read permission", user.user_id),
                0.7,
            );
        }
        for (pattern, label) in OFF_DOMAIN_PATTERNS.iter() {
            if pattern.is_match(query) {
                return SecurityDecision::block(
                    self.name(),
                    format!("request targets {}", label),
                    0.85,
                );
            }
        }
        if !query.chars().any(|c| c.is_alphabetic()) {
            return SecurityDecision::block(self.name(), "no business question present", 0.6);
        }
        SecurityDecision::allow(self.name(), "question fits the served business domain", 0.1)
    }
}

/// Layer 4: final approval over the aggregate risk of prior layers.
pub struct FinalApproval;

impl GateLayer for FinalApproval {
    fn name(&self) -> &'static str {
        "final_approval"
    }

    fn evaluate(&self, _query: &str, _user: &UserContext, prior: &[SecurityDecision]) -> SecurityDecision {
        let aggregate = if prior.is_empty() {
            0.0
        } else {
            prior.iter().map(|d| d.risk_score).sum::<f64>() / prior.len() as f64
        };
        if aggregate > APPROVAL_RISK_CEILING {
            return SecurityDecision::block(
                self.name(),
                format!("aggregate risk {:.2} above ceiling {:.2}", aggregate, APPROVAL_RISK_CEILING),
                aggregate,
            );
        }
        SecurityDecision::allow(
            self.name(),
            format!("aggregate risk {:.2} within ceiling", aggregate),
            aggregate,
        )
    }
}
