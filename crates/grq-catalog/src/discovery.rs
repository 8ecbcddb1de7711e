//! Model discovery: rank catalog models by relevance to the question.
use std::sync::Arc;

use tracing::debug;

use grq_core::{rank_candidates, Entity, ModelCandidate, PipelineConfig, PipelineError};

use crate::scoring::{ScoreCandidate, SemanticScorer};
use crate::types::CatalogSnapshot;

/// Ranked discovery result: the winner plus alternates above the floor.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub selected: ModelCandidate,
    /// The winner and every alternate scoring at or above the alternate
    /// floor, in rank order.
    pub candidates: Vec<ModelCandidate>,
}

pub struct ModelDiscovery {
    scorer: Arc<dyn SemanticScorer>,
}

impl ModelDiscovery {
    pub fn new(scorer: Arc<dyn SemanticScorer>) -> Self {
        Self { scorer }
    }

    /// Rank every model in the snapshot against the question.
    ///
    /// Deterministic for identical inputs and snapshot: scores come from
    /// the injected scorer and ordering is fixed by `rank_candidates`
    /// (descending score, ties ascending by model id).
    pub async fn discover(
        &self,
        raw_query: &str,
        entities: &[Entity],
        snapshot: &CatalogSnapshot,
        config: &PipelineConfig,
    ) -> Result<Discovery, PipelineError> {
        if snapshot.models.is_empty() {
            return Err(PipelineError::ModelNotFound("catalog is empty".to_string()));
        }

        // Entities sharpen the signal: the question plus every extracted
        // span is what the scorer sees.
        let mut text = raw_query.to_string();
        for entity in entities {
            text.push(' ');
            text.push_str(&entity.text);
        }

        let score_candidates: Vec<ScoreCandidate> = snapshot
            .models
            .iter()
            .map(|m| ScoreCandidate {
                id: m.model_id.clone(),
                label: m.display_name.clone(),
            })
            .collect();

        let scored = self.scorer.score_relevance(&text, &score_candidates).await;

        let mut candidates: Vec<ModelCandidate> = scored
            .into_iter()
            .filter_map(|s| {
                snapshot.model(&s.id).map(|m| ModelCandidate {
                    model_id: m.model_id.clone(),
                    display_name: m.display_name.clone(),
                    relevance: s.score.clamp(0.0, 1.0),
                    reasoning: s.reasoning,
                })
            })
            .collect();
        rank_candidates(&mut candidates);

        let best = candidates.first().cloned().ok_or_else(|| {
            PipelineError::ModelNotFound("scorer returned no candidates".to_string())
        })?;
        if best.relevance <= config.discovery_floor {
            return Err(PipelineError::ModelNotFound(format!(
                "best candidate \"{}\" scored {:.2}, floor is {:.2}",
                best.display_name, best.relevance, config.discovery_floor
            )));
        }

        let kept: Vec<ModelCandidate> = candidates
            .into_iter()
            .enumerate()
            .filter(|(rank, c)| *rank == 0 || c.relevance >= config.alternate_floor)
            .map(|(_, c)| c)
            .collect();

        debug!(
            selected = best.model_id.as_str(),
            relevance = best.relevance,
            alternates = kept.len() - 1,
            "model discovery complete"
        );

        Ok(Discovery { selected: best, candidates: kept })
    }
}
