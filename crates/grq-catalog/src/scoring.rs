//! Semantic scoring capability and its deterministic lexical fallback.
//!
//! The pipeline never reaches for an LLM through ambient state: whatever
//! scorer it was constructed with answers both questions the pipeline
//! asks (model relevance, entity role). `LexicalScorer` is the fallback
//! implementation and the reference for determinism — same inputs, same
//! catalog snapshot, same answers.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use grq_core::{Entity, EntityRole, EntityType, RoleClassification};

use crate::lexical::{overlap, same_stem, stem, tokenize};
use crate::lexicon::FieldLexicon;
use crate::types::FieldDescriptor;

/// A model put up for relevance scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreCandidate {
    pub id: String,
    pub label: String,
}

/// A scored model with the scorer's reasoning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub id: String,
    pub score: f64,
    pub reasoning: String,
}

/// The optional semantic collaborator, as an explicit capability.
#[async_trait]
pub trait SemanticScorer: Send + Sync {
    /// Score each candidate's relevance to the text, in [0,1].
    async fn score_relevance(
        &self,
        text: &str,
        candidates: &[ScoreCandidate],
    ) -> Vec<ScoredCandidate>;

    /// Decide whether the entity names the field's category or a value
    /// the field can hold. Must be deterministic per (entity, field).
    async fn classify_entity_role(
        &self,
        entity: &Entity,
        field: &FieldDescriptor,
    ) -> RoleClassification;
}

/// Deterministic, LLM-free scorer built on stems and the synonym lexicon.
pub struct LexicalScorer {
    lexicon: FieldLexicon,
}

impl LexicalScorer {
    pub fn new(lexicon: FieldLexicon) -> Self {
        Self { lexicon }
    }

    /// All the ways this field is named: id tokens, display tokens, and
    /// lexicon synonyms (on the descriptor or configured separately).
    fn name_terms(&self, field: &FieldDescriptor) -> Vec<String> {
        let mut terms = tokenize(&field.field_id);
        terms.extend(tokenize(&field.display_name));
        for synonym in field
            .synonyms
            .iter()
            .chain(self.lexicon.terms_for(&field.field_id).iter())
        {
            terms.push(synonym.to_lowercase());
        }
        terms.sort();
        terms.dedup();
        terms
    }
}

impl Default for LexicalScorer {
    fn default() -> Self {
        Self::new(FieldLexicon::default_domain())
    }
}

#[async_trait]
impl SemanticScorer for LexicalScorer {
    async fn score_relevance(
        &self,
        text: &str,
        candidates: &[ScoreCandidate],
    ) -> Vec<ScoredCandidate> {
        let query_tokens = tokenize(text);
        candidates
            .iter()
            .map(|candidate| {
                let id_score = overlap(&query_tokens, &tokenize(&candidate.id));
                let label_score = overlap(&query_tokens, &tokenize(&candidate.label));
                let score = id_score.max(label_score);
                let reasoning = if score >= 1.0 {
                    format!("question names \"{}\" directly", candidate.label)
                } else if score > 0.0 {
                    format!("partial token overlap with \"{}\"", candidate.label)
                } else {
                    format!("no lexical overlap with \"{}\"", candidate.label)
                };
                ScoredCandidate {
                    id: candidate.id.clone(),
                    score,
                    reasoning,
                }
            })
            .collect()
    }

    async fn classify_entity_role(
        &self,
        entity: &Entity,
        field: &FieldDescriptor,
    ) -> RoleClassification {
        let terms = self.name_terms(field);
        let entity_lower = entity.text.to_lowercase();
        let entity_tokens = tokenize(&entity_lower);

        // Exact phrase or token equality with any name term.
        if terms.iter().any(|t| *t == entity_lower) {
            return RoleClassification {
                role: EntityRole::generic_identifier(format!(
                    "\"{}\" names the {} field's category directly",
                    entity.text, field.field_id
                )),
                confidence: 0.95,
            };
        }

        // Stem-level match: every entity token folds onto a name term.
        let all_stem_match = !entity_tokens.is_empty()
            && entity_tokens
                .iter()
                .all(|token| terms.iter().any(|term| same_stem(token, term)));
        if all_stem_match {
            return RoleClassification {
                role: EntityRole::generic_identifier(format!(
                    "\"{}\" folds to the same stem as {} ({})",
                    entity.text,
                    field.field_id,
                    stem(&entity_lower)
                )),
                confidence: 0.85,
            };
        }

        // Not a category term: the shape of the span decides how
        // plausible a concrete value it is.
        let (confidence, shape) = match entity.entity_type {
            EntityType::ProperNoun => (0.85, "proper-noun shape"),
            EntityType::Number => (0.8, "numeric literal"),
            EntityType::DomainTerm => (0.4, "lowercase term with no category match"),
            EntityType::Unknown => (0.35, "unrecognized shape"),
        };
        RoleClassification {
            role: EntityRole::filter_value(format!(
                "\"{}\" is not a category term for {}; {}",
                entity.text, field.field_id, shape
            )),
            confidence,
        }
    }
}
