//! Field synonym lexicon.
//!
//! Maps field ids to the category terms people use for them ("companies"
//! for ADVERTISER). The compiled-in defaults cover the advertising
//! domain; deployments can replace or extend them from a YAML file.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use grq_core::PipelineError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldLexicon {
    /// Synonyms keyed by field id.
    pub synonyms: HashMap<String, Vec<String>>,
}

impl FieldLexicon {
    /// Compiled-in defaults for the advertising golden-record domain.
    pub fn default_domain() -> Self {
        let mut synonyms = HashMap::new();
        synonyms.insert(
            "ADVERTISER".to_string(),
            vec![
                "advertiser", "advertisers", "company", "companies", "advertising",
                "brand owner", "client", "clients",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        );
        synonyms.insert(
            "BRAND".to_string(),
            vec!["brand", "brands", "label", "labels"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        synonyms.insert(
            "CHANNEL".to_string(),
            vec!["channel", "channels", "medium", "media", "platform", "platforms"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        synonyms.insert(
            "CAMPAIGN".to_string(),
            vec!["campaign", "campaigns", "promotion", "promotions"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        synonyms.insert(
            "SPEND".to_string(),
            vec!["spend", "budget", "cost", "costs", "spending"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        Self { synonyms }
    }

    /// Parse a lexicon from YAML of the form `FIELD_ID: [term, term]`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PipelineError> {
        let synonyms: HashMap<String, Vec<String>> = serde_yaml::from_str(yaml)
            .map_err(|e| PipelineError::Unknown(format!("lexicon parse: {}", e)))?;
        Ok(Self { synonyms })
    }

    /// Merge another lexicon in; its terms win on key collision.
    pub fn merged_with(mut self, other: FieldLexicon) -> Self {
        for (field, terms) in other.synonyms {
            self.synonyms.insert(field, terms);
        }
        self
    }

    pub fn terms_for(&self, field_id: &str) -> &[String] {
        self.synonyms.get(field_id).map(|v| v.as_slice()).unwrap_or(&[])
    }
}
