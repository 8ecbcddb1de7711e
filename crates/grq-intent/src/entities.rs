//! Entity extraction from the raw question text.
//!
//! Extraction runs over the original (un-normalized) text because
//! capitalization and quoting are the strongest value signals: "Sony" is
//! almost certainly a concrete value, "companies" almost certainly names
//! a category. The distinction is finished later by the field mapper.
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use grq_core::{Entity, EntityType};

lazy_static! {
    /// Quoted spans are values verbatim.
    static ref QUOTED: Regex = Regex::new(r#""([^"]+)"|'([^']+)'"#).unwrap();

    /// Words that carry no entity content: function words plus the
    /// intent keywords the classifier already consumed.
    static ref STOPWORDS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for word in [
            "a", "an", "the", "and", "or", "not", "no", "of", "in", "on", "at",
            "to", "for", "with", "by", "from", "about", "as", "into", "over",
            "is", "are", "was", "were", "be", "been", "being", "am",
            "do", "does", "did", "done", "have", "has", "had", "having",
            "we", "our", "ours", "us", "you", "your", "i", "me", "my",
            "it", "its", "this", "that", "these", "those", "there",
            "can", "could", "should", "would", "will", "shall", "may", "might",
            "how", "many", "much", "what", "which", "who", "whom", "where",
            "when", "why", "all", "any", "some", "each", "every",
            "count", "number", "total", "list", "show", "display", "give",
            "find", "tell", "compare", "versus", "vs", "between", "against",
            "analyze", "analyse", "trend", "currently", "right", "now",
            "please", "hey", "hi",
        ] {
            s.insert(word);
        }
        s
    };
}

/// Extract typed entities from raw text, in order of appearance.
pub fn extract(raw: &str) -> Vec<Entity> {
    let mut entities: Vec<Entity> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut push = |entity: Entity, seen: &mut HashSet<String>| {
        let key = entity.text.to_lowercase();
        if seen.insert(key) {
            entities.push(entity);
        }
    };

    for cap in QUOTED.captures_iter(raw) {
        let text = cap
            .get(1)
            .or_else(|| cap.get(2))
            .map(|m| m.as_str().trim())
            .unwrap_or("");
        if !text.is_empty() {
            push(Entity::new(text, EntityType::ProperNoun, 0.95), &mut seen);
        }
    }

    let stripped = QUOTED.replace_all(raw, " ");
    let tokens: Vec<&str> = stripped
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty())
        .collect();

    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];

        if token.chars().all(|c| c.is_ascii_digit()) {
            push(Entity::new(token, EntityType::Number, 0.9), &mut seen);
            i += 1;
            continue;
        }

        if is_capitalized(token) && !STOPWORDS.contains(token.to_lowercase().as_str()) {
            // Merge runs of capitalized tokens ("New Balance").
            let start = i;
            let mut end = i + 1;
            while end < tokens.len()
                && is_capitalized(tokens[end])
                && !STOPWORDS.contains(tokens[end].to_lowercase().as_str())
            {
                end += 1;
            }
            let phrase = tokens[start..end].join(" ");
            // Sentence-initial capitalization is a weaker signal.
            let confidence = if start == 0 { 0.75 } else { 0.85 };
            push(Entity::new(phrase, EntityType::ProperNoun, confidence), &mut seen);
            i = end;
            continue;
        }

        let lower = token.to_lowercase();
        if lower.len() >= 3 && !STOPWORDS.contains(lower.as_str()) {
            push(Entity::new(lower, EntityType::DomainTerm, 0.7), &mut seen);
        }
        i += 1;
    }

    entities
}

fn is_capitalized(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.is_uppercase() && chars.all(|c| c.is_alphanumeric()),
        None => false,
    }
}
