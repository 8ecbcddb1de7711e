//! GRQ Intent: natural-language question analysis.
//!
//! Classifies the question into an intent kind and extracts typed
//! entities. Everything here is deterministic and lexical; a semantic
//! scoring collaborator refines these signals downstream when available.
//!
//! # Example
//!
//! ```
//! use grq_intent::analyze;
//! use grq_core::IntentKind;
//!
//! let (analysis, entities) = analyze("How many advertisements do we have?").unwrap();
//! assert_eq!(analysis.kind, IntentKind::Count);
//! assert_eq!(entities[0].text, "advertisements");
//! ```

pub mod classifier;
pub mod entities;
pub mod normalizer;

use grq_core::{Entity, IntentAnalysis, PipelineError};

/// Analyze a raw question: classify intent and extract entities.
///
/// Fails with `UnparsableQuery` only when normalization leaves nothing
/// classifiable; anything else falls back to a low-confidence LIST.
pub fn analyze(raw: &str) -> Result<(IntentAnalysis, Vec<Entity>), PipelineError> {
    let normalized = normalizer::normalize(raw);
    if !normalizer::has_usable_tokens(&normalized) {
        return Err(PipelineError::UnparsableQuery(format!(
            "no usable tokens in {:?}",
            raw
        )));
    }
    let analysis = classifier::classify(&normalized);
    let entities = entities::extract(raw);
    Ok((analysis, entities))
}
