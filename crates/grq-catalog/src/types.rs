//! Catalog metadata types.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use grq_core::CatalogEntry;

/// Storage type of a field as the platform reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Number,
    Boolean,
    Date,
}

/// A golden-record collection ("model") as listed by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub model_id: String,
    pub display_name: String,
}

/// A field of a model, enriched with category synonyms from the lexicon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub field_id: String,
    pub display_name: String,
    pub data_type: DataType,
    /// Category terms naming this field ("companies" for ADVERTISER).
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl FieldDescriptor {
    pub fn new(field_id: impl Into<String>, display_name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            field_id: field_id.into(),
            display_name: display_name.into(),
            data_type,
            synonyms: Vec::new(),
        }
    }

    pub fn with_synonyms(mut self, synonyms: Vec<String>) -> Self {
        self.synonyms = synonyms;
        self
    }
}

/// Immutable view of the catalog at one point in time.
///
/// Built in one piece by the cache and shared behind an `Arc`; readers
/// never observe a partially refreshed catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub fetched_at: DateTime<Utc>,
    pub models: Vec<ModelDescriptor>,
    /// Fields keyed by model id.
    pub fields: HashMap<String, Vec<FieldDescriptor>>,
}

impl CatalogSnapshot {
    pub fn model(&self, model_id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.model_id == model_id)
    }

    pub fn fields_of(&self, model_id: &str) -> &[FieldDescriptor] {
        self.fields.get(model_id).map(|f| f.as_slice()).unwrap_or(&[])
    }

    /// Flat description of the catalog for META answers.
    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.models
            .iter()
            .map(|m| CatalogEntry {
                model_id: m.model_id.clone(),
                display_name: m.display_name.clone(),
                fields: self
                    .fields_of(&m.model_id)
                    .iter()
                    .map(|f| f.field_id.clone())
                    .collect(),
            })
            .collect()
    }
}
