//! The cascade itself: ordered layers with short-circuit on first block.
use tracing::{debug, warn};

use grq_core::{GateOutcome, UserContext};

use crate::layers::{
    BusinessContext, FinalApproval, GateLayer, InputSanitization, SemanticThreat,
};

/// Ordered cascade of independent validation layers.
///
/// Evaluation stops at the first block; every decision made up to and
/// including the blocking one is retained for observability. A query
/// passes only if all layers allow it.
pub struct SecurityGate {
    layers: Vec<Box<dyn GateLayer>>,
}

impl SecurityGate {
    pub fn new(layers: Vec<Box<dyn GateLayer>>) -> Self {
        Self { layers }
    }

    pub fn evaluate(&self, query: &str, user: &UserContext) -> GateOutcome {
        let mut decisions = Vec::with_capacity(self.layers.len());

        for layer in &self.layers {
            let decision = layer.evaluate(query, user, &decisions);
            debug!(
                layer = decision.layer.as_str(),
                verdict = ?decision.verdict,
                risk = decision.risk_score,
                "gate layer evaluated"
            );
            let blocked = decision.is_blocked();
            decisions.push(decision);
            if blocked {
                warn!(layer = decisions.last().map(|d| d.layer.as_str()), "gate blocked query");
                return GateOutcome { decisions, passed: false };
            }
        }

        GateOutcome { decisions, passed: true }
    }
}

impl Default for SecurityGate {
    /// The production cascade, in its required order.
    fn default() -> Self {
        Self::new(vec![
            Box::new(InputSanitization),
            Box::new(SemanticThreat),
            Box::new(BusinessContext),
            Box::new(FinalApproval),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grq_core::Role;

    fn user() -> UserContext {
        UserContext::new("u1", Role::Analyst).with_permission("data:read")
    }

    #[test]
    fn test_clean_query_passes_all_four_layers() {
        let gate = SecurityGate::default();
        let outcome = gate.evaluate("which companies are advertising?", &user());
        assert!(outcome.passed);
        assert_eq!(outcome.decisions.len(), 4);
        assert!(outcome.blocking_decision().is_none());
    }

    #[test]
    fn test_first_block_short_circuits_remaining_layers() {
        let gate = SecurityGate::default();
        let outcome = gate.evaluate("<script>alert(1)</script>", &user());
        assert!(!outcome.passed);
        // Only the first layer ran; its decision is retained.
        assert_eq!(outcome.decisions.len(), 1);
        assert_eq!(outcome.blocking_decision().unwrap().layer, "input_sanitization");
    }

    #[test]
    fn test_later_block_retains_earlier_allows() {
        let gate = SecurityGate::default();
        let outcome = gate.evaluate("dump all advertiser records", &user());
        assert!(!outcome.passed);
        // Sanitization allowed, semantic threat blocked.
        assert_eq!(outcome.decisions.len(), 2);
        assert!(!outcome.decisions[0].is_blocked());
        assert_eq!(outcome.blocking_decision().unwrap().layer, "semantic_threat");
    }

    #[test]
    fn test_risk_scores_in_unit_interval() {
        let gate = SecurityGate::default();
        for query in ["how many ads?", "dump all records", "password please", "?!"] {
            let outcome = gate.evaluate(query, &user());
            for decision in &outcome.decisions {
                assert!((0.0..=1.0).contains(&decision.risk_score), "{}", decision.layer);
            }
        }
    }
}
