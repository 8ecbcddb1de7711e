//! Role-shaped response synthesis.
//!
//! The same shaped outcome reads differently per role: executives get a
//! narrative with strategic framing and no raw data, analysts get the
//! narrative plus structured data and follow-up suggestions, operations
//! gets a concise factual summary with the data attached.
use serde_json::json;
use tracing::debug;

use grq_core::{
    ConfidenceDisclosure, ExecutionResult, FieldMapping, ModelCandidate, PipelineConfig,
    PipelineError, QueryOutcome, Response, Role, UserContext,
};

use crate::templates::TemplateRenderer;

pub struct ResponseSynthesizer<'a> {
    renderer: TemplateRenderer<'a>,
}

impl Default for ResponseSynthesizer<'_> {
    fn default() -> Self {
        Self { renderer: TemplateRenderer::default() }
    }
}

impl ResponseSynthesizer<'_> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn synthesize(
        &self,
        user: &UserContext,
        selected: &ModelCandidate,
        candidates: &[ModelCandidate],
        mappings: &[FieldMapping],
        result: &ExecutionResult,
        min_confidence: f64,
        config: &PipelineConfig,
    ) -> Result<Response, PipelineError> {
        let mut summary = self.outcome_summary(selected, result)?;

        if user.role == Role::Executive {
            summary.push_str(
                &self
                    .renderer
                    .render("executive_framing", &json!({ "model": selected.display_name }))?,
            );
        }

        let data = match user.role {
            Role::Executive => None,
            Role::Analyst | Role::Operations => {
                Some(serde_json::to_value(&result.outcome).map_err(|e| {
                    PipelineError::Unknown(format!("outcome serialization: {}", e))
                })?)
            }
        };

        let follow_ups = if user.role == Role::Analyst {
            follow_ups(&result.outcome)
        } else {
            Vec::new()
        };

        let disclosure = if min_confidence < config.disclosure_threshold {
            debug!(min_confidence, "attaching confidence disclosure");
            Some(self.disclosure(selected, candidates, mappings, min_confidence, config)?)
        } else {
            None
        };

        Ok(Response {
            role: user.role,
            summary,
            data,
            disclosure,
            follow_ups,
        })
    }

    fn outcome_summary(
        &self,
        selected: &ModelCandidate,
        result: &ExecutionResult,
    ) -> Result<String, PipelineError> {
        let model = &selected.display_name;
        match &result.outcome {
            QueryOutcome::Count { value } => self
                .renderer
                .render("count", &json!({ "count": value, "model": model })),
            QueryOutcome::DistinctValues { field_id, values } => self.renderer.render(
                "distinct_values",
                &json!({
                    "count": values.len(),
                    "model": model,
                    "field": field_id,
                    "values": values,
                }),
            ),
            QueryOutcome::Listing { records, remainder } => self.renderer.render(
                "listing",
                &json!({
                    "shown": records.len(),
                    "total": result.total_count,
                    "model": model,
                    "remainder": remainder,
                }),
            ),
            QueryOutcome::Comparison { field_id, groups } => {
                let rendered: Vec<String> = groups
                    .iter()
                    .map(|g| format!("{}: {}", g.value, g.count))
                    .collect();
                self.renderer
                    .render("comparison", &json!({ "field": field_id, "groups": rendered }))
            }
            QueryOutcome::Catalog { models } => {
                let names: Vec<&str> = models.iter().map(|m| m.display_name.as_str()).collect();
                self.renderer.render("catalog", &json!({ "models": names }))
            }
        }
    }

    fn disclosure(
        &self,
        selected: &ModelCandidate,
        candidates: &[ModelCandidate],
        mappings: &[FieldMapping],
        min_confidence: f64,
        config: &PipelineConfig,
    ) -> Result<ConfidenceDisclosure, PipelineError> {
        let alternatives: Vec<String> = candidates
            .iter()
            .filter(|c| c.model_id != selected.model_id)
            .map(|c| c.display_name.clone())
            .collect();

        let mut reasoning =
            vec![self.renderer.render("disclosure", &json!({ "confidence": min_confidence }))?];
        if !selected.reasoning.is_empty() && selected.relevance < config.disclosure_threshold {
            reasoning.push(selected.reasoning.clone());
        }
        for mapping in mappings.iter().filter(|m| m.confidence < config.disclosure_threshold) {
            reasoning.push(mapping.reasoning.clone());
        }

        Ok(ConfidenceDisclosure {
            min_confidence,
            alternatives,
            reasoning,
        })
    }
}

/// Analyst follow-up suggestions, one step deeper into the same data.
fn follow_ups(outcome: &QueryOutcome) -> Vec<String> {
    match outcome {
        QueryOutcome::Count { .. } => {
            vec!["List the records behind this count.".to_string()]
        }
        QueryOutcome::DistinctValues { field_id, .. } => {
            vec![format!("Count records for a specific {} value.", field_id)]
        }
        QueryOutcome::Listing { remainder, .. } if *remainder > 0 => {
            vec![format!("Narrow the filters to see the remaining {} records.", remainder)]
        }
        QueryOutcome::Listing { .. } => {
            vec!["Compare these records by a field of interest.".to_string()]
        }
        QueryOutcome::Comparison { field_id, .. } => {
            vec![format!("List the records for the leading {} value.", field_id)]
        }
        QueryOutcome::Catalog { .. } => {
            vec!["Ask a count or listing question about any of these models.".to_string()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grq_core::QueryOutcome;

    fn selected() -> ModelCandidate {
        ModelCandidate {
            model_id: "advertisements".to_string(),
            display_name: "Advertisements".to_string(),
            relevance: 1.0,
            reasoning: "exact name match".to_string(),
        }
    }

    fn count_result(value: usize) -> ExecutionResult {
        ExecutionResult {
            outcome: QueryOutcome::Count { value },
            total_count: value,
            elapsed_ms: 4,
        }
    }

    #[test]
    fn test_executive_gets_narrative_without_raw_data() {
        let user = UserContext::new("u1", Role::Executive);
        let response = ResponseSynthesizer::new()
            .synthesize(&user, &selected(), &[], &[], &count_result(6), 0.95, &PipelineConfig::default())
            .unwrap();

        assert!(response.summary.starts_with("Found 6 records in Advertisements."));
        assert!(response.summary.contains("golden record"));
        assert!(response.data.is_none());
        assert!(response.follow_ups.is_empty());
    }

    #[test]
    fn test_analyst_gets_data_and_follow_ups() {
        let user = UserContext::new("u1", Role::Analyst);
        let response = ResponseSynthesizer::new()
            .synthesize(&user, &selected(), &[], &[], &count_result(6), 0.95, &PipelineConfig::default())
            .unwrap();

        assert!(response.data.is_some());
        assert_eq!(response.follow_ups.len(), 1);
    }

    #[test]
    fn test_operations_gets_data_without_follow_ups() {
        let user = UserContext::new("u1", Role::Operations);
        let response = ResponseSynthesizer::new()
            .synthesize(&user, &selected(), &[], &[], &count_result(6), 0.95, &PipelineConfig::default())
            .unwrap();

        assert_eq!(response.summary, "Found 6 records in Advertisements.");
        assert!(response.data.is_some());
        assert!(response.follow_ups.is_empty());
    }

    #[test]
    fn test_disclosure_attached_below_threshold() {
        let user = UserContext::new("u1", Role::Analyst);
        let runner_up = ModelCandidate {
            model_id: "advertisement_archive".to_string(),
            display_name: "Advertisement Archive".to_string(),
            relevance: 0.65,
            reasoning: "partial name overlap".to_string(),
        };
        let candidates = vec![selected(), runner_up];
        let response = ResponseSynthesizer::new()
            .synthesize(&user, &selected(), &candidates, &[], &count_result(6), 0.72, &PipelineConfig::default())
            .unwrap();

        let disclosure = response.disclosure.expect("disclosure expected");
        assert_eq!(disclosure.min_confidence, 0.72);
        assert_eq!(disclosure.alternatives, vec!["Advertisement Archive".to_string()]);
        assert!(disclosure.reasoning[0].contains("72%"));
    }

    #[test]
    fn test_no_disclosure_at_or_above_threshold() {
        let user = UserContext::new("u1", Role::Operations);
        let response = ResponseSynthesizer::new()
            .synthesize(&user, &selected(), &[], &[], &count_result(6), 0.8, &PipelineConfig::default())
            .unwrap();
        assert!(response.disclosure.is_none());
    }

    #[test]
    fn test_distinct_values_summary_names_the_values() {
        let user = UserContext::new("u1", Role::Operations);
        let result = ExecutionResult {
            outcome: QueryOutcome::DistinctValues {
                field_id: "ADVERTISER".to_string(),
                values: vec!["Sony".to_string(), "Apple".to_string(), "Microsoft".to_string()],
            },
            total_count: 6,
            elapsed_ms: 3,
        };
        let response = ResponseSynthesizer::new()
            .synthesize(&user, &selected(), &[], &[], &result, 0.95, &PipelineConfig::default())
            .unwrap();
        assert_eq!(
            response.summary,
            "Advertisements has 3 distinct ADVERTISER values: Sony, Apple, Microsoft."
        );
    }
}
