//! The field mapper: entities onto fields, with explicit roles.
//!
//! For every entity the mapper asks the scorer how it relates to each
//! field of the selected model and keeps at most one mapping per entity.
//! The role on each mapping — filter value versus generic identifier —
//! is the contract that keeps a category word like "companies" from ever
//! becoming `ADVERTISER = "companies"` and silently matching nothing.
//!
//! The mapper never hard-fails: entities that map nowhere confidently
//! are dropped, and an empty mapping set just means an emptier query.
use std::sync::Arc;

use tracing::debug;

use grq_core::{
    Entity, EntityType, FieldMapping, ModelCandidate, PipelineConfig, RoleClassification,
};
use grq_catalog::lexical::{same_stem, tokenize};
use grq_catalog::{CatalogSnapshot, FieldDescriptor, SemanticScorer};

/// Generic classifications at or above this tier count as exact name
/// matches and survive model-reference suppression.
const EXACT_GENERIC_TIER: f64 = 0.9;

pub struct FieldMapper {
    scorer: Arc<dyn SemanticScorer>,
}

struct Classified<'a> {
    field: &'a FieldDescriptor,
    classification: RoleClassification,
}

impl FieldMapper {
    pub fn new(scorer: Arc<dyn SemanticScorer>) -> Self {
        Self { scorer }
    }

    /// Map entities onto the selected model's fields.
    ///
    /// Deterministic per catalog snapshot: the scorer is deterministic by
    /// contract and every tie here breaks on ascending field id.
    pub async fn map(
        &self,
        entities: &[Entity],
        selected: &ModelCandidate,
        snapshot: &CatalogSnapshot,
        config: &PipelineConfig,
    ) -> Vec<FieldMapping> {
        let fields = snapshot.fields_of(&selected.model_id);
        if fields.is_empty() {
            debug!(model = selected.model_id.as_str(), "model has no described fields");
            return Vec::new();
        }

        let model_tokens: Vec<String> = {
            let mut tokens = tokenize(&selected.model_id);
            tokens.extend(tokenize(&selected.display_name));
            tokens
        };

        // First pass: classify every (entity, field) pair and settle the
        // generic identifiers. Generic targets steer filter values later.
        let mut generic_mappings: Vec<FieldMapping> = Vec::new();
        let mut pending_values: Vec<(&Entity, Vec<Classified>)> = Vec::new();

        for entity in entities {
            if entity.entity_type == EntityType::Number {
                // Bare numerals carry no field signal on their own.
                continue;
            }

            let mut classified = Vec::with_capacity(fields.len());
            for field in fields {
                let classification = self.scorer.classify_entity_role(entity, field).await;
                classified.push(Classified { field, classification });
            }

            let best_generic: Option<(String, RoleClassification)> = classified
                .iter()
                .filter(|c| c.classification.role.is_generic())
                .max_by(|a, b| {
                    a.classification
                        .confidence
                        .partial_cmp(&b.classification.confidence)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        // Ties break toward the lexically smaller field id.
                        .then_with(|| b.field.field_id.cmp(&a.field.field_id))
                })
                .map(|c| (c.field.field_id.clone(), c.classification.clone()));

            let exact_generic = best_generic
                .as_ref()
                .map(|(_, c)| c.confidence >= EXACT_GENERIC_TIER)
                .unwrap_or(false);

            // An entity that just restates the model's own name is a
            // model reference, not a field mapping — unless a field
            // claims it by exact name or synonym.
            if !exact_generic && names_model(entity, &model_tokens) {
                debug!(entity = entity.text.as_str(), "entity names the model itself; skipped");
                continue;
            }

            match best_generic {
                Some((field_id, c)) if c.confidence >= config.mapping_floor => {
                    generic_mappings.push(FieldMapping {
                        entity: entity.clone(),
                        field_id,
                        confidence: c.confidence.clamp(0.0, 1.0),
                        reasoning: c.role.reasoning().to_string(),
                        role: c.role,
                    });
                }
                _ => pending_values.push((entity, classified)),
            }
        }

        // Second pass: place filter values. A value belongs to the field
        // the question generically referenced; without one, the first
        // string-typed field (ascending id) is the deterministic default.
        let generic_target: Option<String> = generic_mappings
            .iter()
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.field_id.cmp(&a.field_id))
            })
            .map(|m| m.field_id.clone());

        let mut mappings = generic_mappings;
        for (entity, classified) in pending_values {
            let target = generic_target
                .clone()
                .or_else(|| default_value_field(fields));
            let Some(target_id) = target else { continue };

            let Some(chosen) = classified.iter().find(|c| c.field.field_id == target_id) else {
                continue;
            };
            if !chosen.classification.role.is_filter_value() {
                continue;
            }
            if chosen.classification.confidence < config.mapping_floor {
                debug!(
                    entity = entity.text.as_str(),
                    confidence = chosen.classification.confidence,
                    "mapping below confidence floor; dropped"
                );
                continue;
            }

            let steer = if generic_target.is_some() {
                "field generically referenced elsewhere in the question"
            } else {
                "default string-typed field of the model"
            };
            mappings.push(FieldMapping {
                entity: entity.clone(),
                field_id: target_id.clone(),
                confidence: chosen.classification.confidence.clamp(0.0, 1.0),
                reasoning: format!("{}; target: {}", chosen.classification.role.reasoning(), steer),
                role: chosen.classification.role.clone(),
            });
        }

        mappings
    }
}

/// Whether every token of the entity folds onto the model's own name.
fn names_model(entity: &Entity, model_tokens: &[String]) -> bool {
    let entity_tokens = tokenize(&entity.text);
    !entity_tokens.is_empty()
        && entity_tokens
            .iter()
            .all(|t| model_tokens.iter().any(|m| same_stem(t, m)))
}

/// First string-typed field by ascending id, falling back to any field.
fn default_value_field(fields: &[FieldDescriptor]) -> Option<String> {
    let mut string_fields: Vec<&FieldDescriptor> = fields
        .iter()
        .filter(|f| f.data_type == grq_catalog::DataType::String)
        .collect();
    string_fields.sort_by(|a, b| a.field_id.cmp(&b.field_id));
    string_fields
        .first()
        .map(|f| f.field_id.clone())
        .or_else(|| {
            let mut all: Vec<&FieldDescriptor> = fields.iter().collect();
            all.sort_by(|a, b| a.field_id.cmp(&b.field_id));
            all.first().map(|f| f.field_id.clone())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use grq_catalog::{DataType, FieldLexicon, LexicalScorer, ModelDescriptor};
    use std::collections::HashMap;

    fn snapshot() -> CatalogSnapshot {
        let fields = vec![
            FieldDescriptor::new("ADVERTISER", "Advertiser", DataType::String).with_synonyms(
                vec![
                    "advertiser".into(),
                    "advertisers".into(),
                    "company".into(),
                    "companies".into(),
                    "advertising".into(),
                ],
            ),
            FieldDescriptor::new("BRAND", "Brand", DataType::String)
                .with_synonyms(vec!["brand".into(), "brands".into()]),
            FieldDescriptor::new("SPEND", "Spend", DataType::Number),
        ];
        let mut map = HashMap::new();
        map.insert("advertisements".to_string(), fields);
        CatalogSnapshot {
            fetched_at: chrono::Utc::now(),
            models: vec![ModelDescriptor {
                model_id: "advertisements".to_string(),
                display_name: "Advertisements".to_string(),
            }],
            fields: map,
        }
    }

    fn model() -> ModelCandidate {
        ModelCandidate {
            model_id: "advertisements".to_string(),
            display_name: "Advertisements".to_string(),
            relevance: 1.0,
            reasoning: String::new(),
        }
    }

    fn mapper() -> FieldMapper {
        FieldMapper::new(Arc::new(LexicalScorer::new(FieldLexicon::default_domain())))
    }

    #[tokio::test]
    async fn test_category_terms_map_as_generic_identifiers() {
        let entities = vec![
            Entity::new("companies", EntityType::DomainTerm, 0.7),
            Entity::new("advertising", EntityType::DomainTerm, 0.7),
        ];
        let mappings = mapper()
            .map(&entities, &model(), &snapshot(), &PipelineConfig::default())
            .await;

        assert_eq!(mappings.len(), 2);
        for mapping in &mappings {
            assert_eq!(mapping.field_id, "ADVERTISER");
            assert!(mapping.is_generic(), "{:?}", mapping.role);
            assert!((0.0..=1.0).contains(&mapping.confidence));
        }
    }

    #[tokio::test]
    async fn test_proper_noun_maps_as_filter_value_on_referenced_field() {
        let entities = vec![
            Entity::new("Sony", EntityType::ProperNoun, 0.85),
            Entity::new("advertising", EntityType::DomainTerm, 0.7),
        ];
        let mappings = mapper()
            .map(&entities, &model(), &snapshot(), &PipelineConfig::default())
            .await;

        let sony = mappings.iter().find(|m| m.entity.text == "Sony").unwrap();
        assert!(sony.is_filter_value());
        assert_eq!(sony.field_id, "ADVERTISER");
    }

    #[tokio::test]
    async fn test_model_reference_entity_is_not_mapped() {
        // "advertisements" names the model, not a field; mapping it would
        // turn a plain count into a distinct-values query.
        let entities = vec![Entity::new("advertisements", EntityType::DomainTerm, 0.7)];
        let mappings = mapper()
            .map(&entities, &model(), &snapshot(), &PipelineConfig::default())
            .await;
        assert!(mappings.is_empty());
    }

    #[tokio::test]
    async fn test_unconfident_entities_drop_without_failing() {
        let entities = vec![Entity::new("somewhere", EntityType::DomainTerm, 0.7)];
        let mappings = mapper()
            .map(&entities, &model(), &snapshot(), &PipelineConfig::default())
            .await;
        // Below the 0.5 floor: dropped, but the mapper still succeeds.
        assert!(mappings.is_empty());
    }

    #[tokio::test]
    async fn test_one_mapping_per_entity() {
        let entities = vec![
            Entity::new("companies", EntityType::DomainTerm, 0.7),
            Entity::new("Sony", EntityType::ProperNoun, 0.85),
            Entity::new("brands", EntityType::DomainTerm, 0.7),
        ];
        let mappings = mapper()
            .map(&entities, &model(), &snapshot(), &PipelineConfig::default())
            .await;
        for entity in &entities {
            let count = mappings.iter().filter(|m| m.entity.text == entity.text).count();
            assert!(count <= 1, "entity {} mapped {} times", entity.text, count);
        }
        // "brands" claims BRAND, not ADVERTISER.
        let brands = mappings.iter().find(|m| m.entity.text == "brands").unwrap();
        assert_eq!(brands.field_id, "BRAND");
    }

    #[tokio::test]
    async fn test_mapping_is_deterministic() {
        let entities = vec![
            Entity::new("companies", EntityType::DomainTerm, 0.7),
            Entity::new("Sony", EntityType::ProperNoun, 0.85),
        ];
        let m = mapper();
        let config = PipelineConfig::default();
        let a = m.map(&entities, &model(), &snapshot(), &config).await;
        let b = m.map(&entities, &model(), &snapshot(), &config).await;
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.field_id, y.field_id);
            assert_eq!(x.confidence, y.confidence);
            assert_eq!(x.role, y.role);
        }
    }
}
