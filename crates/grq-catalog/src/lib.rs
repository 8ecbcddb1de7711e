//! GRQ Catalog: metadata for the golden-record platform and the
//! collaborator seams the pipeline depends on.
//!
//! Holds the model/field descriptor types, the `CatalogClient` and
//! `ExecutionClient` platform boundaries, the `SemanticScorer` capability
//! with its deterministic lexical fallback, a TTL snapshot cache, and
//! model discovery.

pub mod cache;
pub mod client;
pub mod discovery;
pub mod lexical;
pub mod lexicon;
pub mod scoring;
pub mod types;

pub use cache::SnapshotCache;
pub use client::{CatalogClient, ExecutionClient};
pub use discovery::{Discovery, ModelDiscovery};
pub use lexicon::FieldLexicon;
pub use scoring::{LexicalScorer, ScoreCandidate, ScoredCandidate, SemanticScorer};
pub use types::{CatalogSnapshot, DataType, FieldDescriptor, ModelDescriptor};
