//! Query construction: intent plus mappings into a structured plan.
//!
//! Construction is pure and deterministic. The one non-obvious rule lives
//! here: a COUNT or LIST question whose mappings are all generic
//! identifiers is really asking "which values exist", so it becomes a
//! distinct-values query instead of a filtered one. Building
//! `ADVERTISER = "companies"` would match nothing and lie with a zero.
use tracing::debug;

use grq_core::{
    Aggregation, FieldMapping, FilterClause, IntentAnalysis, IntentKind, ModelCandidate,
    PipelineConfig, PipelineError, QueryPlan,
};
use grq_catalog::CatalogSnapshot;

pub struct QueryBuilder;

impl QueryBuilder {
    /// Build the structured query for the selected model.
    pub fn build(
        intent: &IntentAnalysis,
        mappings: &[FieldMapping],
        selected: &ModelCandidate,
        snapshot: &CatalogSnapshot,
        config: &PipelineConfig,
    ) -> Result<QueryPlan, PipelineError> {
        let mut filters: Vec<FilterClause> = mappings
            .iter()
            .filter(|m| m.is_filter_value())
            .map(|m| FilterClause {
                field_id: m.field_id.clone(),
                value: m.entity.text.clone(),
            })
            .collect();

        let generic_fields = generic_fields(mappings);

        let aggregation = match intent.kind {
            IntentKind::Meta => Aggregation::Describe,
            IntentKind::Count if filters.is_empty() && !generic_fields.is_empty() => {
                debug!(fields = ?generic_fields, "count redirected to distinct values");
                Aggregation::DistinctValues { fields: generic_fields }
            }
            IntentKind::Count => Aggregation::Count,
            IntentKind::List if filters.is_empty() && !generic_fields.is_empty() => {
                debug!(fields = ?generic_fields, "list redirected to distinct values");
                Aggregation::DistinctValues { fields: generic_fields }
            }
            IntentKind::List | IntentKind::Analyze => Aggregation::List,
            IntentKind::Compare => {
                let compare = Self::comparison(mappings, &filters, config)?;
                // The comparison values partition the listing between
                // themselves; left in the filters they would AND-combine
                // into an empty set and every group would count zero.
                if let Aggregation::Compare { field_id, .. } = &compare {
                    filters.retain(|f| f.field_id != *field_id);
                }
                compare
            }
        };

        // Project every described field so listings are self-contained.
        let fields: Vec<String> = snapshot
            .fields_of(&selected.model_id)
            .iter()
            .map(|f| f.field_id.clone())
            .collect();

        Ok(QueryPlan {
            model_id: selected.model_id.clone(),
            fields,
            filters,
            aggregation,
            result_cap: config.result_cap,
        })
    }

    /// A comparison needs one field it is confident about; guessing the
    /// axis of a comparison produces confidently wrong answers.
    fn comparison(
        mappings: &[FieldMapping],
        filters: &[FilterClause],
        config: &PipelineConfig,
    ) -> Result<Aggregation, PipelineError> {
        let anchor = mappings
            .iter()
            .filter(|m| m.confidence >= config.strict_mapping_floor)
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.field_id.cmp(&a.field_id))
            })
            .ok_or_else(|| {
                PipelineError::FieldMappingLowConfidence(format!(
                    "comparison needs a field mapped at >= {:.2}",
                    config.strict_mapping_floor
                ))
            })?;

        let values: Vec<String> = filters
            .iter()
            .filter(|f| f.field_id == anchor.field_id)
            .map(|f| f.value.clone())
            .collect();

        Ok(Aggregation::Compare {
            field_id: anchor.field_id.clone(),
            values,
        })
    }
}

/// Field ids referenced generically, deduplicated in mapping order.
fn generic_fields(mappings: &[FieldMapping]) -> Vec<String> {
    let mut fields = Vec::new();
    for mapping in mappings.iter().filter(|m| m.is_generic()) {
        if !fields.contains(&mapping.field_id) {
            fields.push(mapping.field_id.clone());
        }
    }
    fields
}
