//! Text normalization ahead of intent classification.
//!
//! Lowercases, collapses whitespace, expands common contractions, and
//! strips trailing punctuation so the lexical rules match reliably.
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref CONTRACTIONS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("what's", "what is");
        m.insert("who's", "who is");
        m.insert("how's", "how is");
        m.insert("there's", "there is");
        m.insert("don't", "do not");
        m.insert("doesn't", "does not");
        m.insert("isn't", "is not");
        m.insert("aren't", "are not");
        m.insert("can't", "cannot");
        m.insert("won't", "will not");
        m.insert("we're", "we are");
        m.insert("we've", "we have");
        m.insert("they're", "they are");
        m
    };

    static ref MULTI_SPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Normalize text for rule matching.
pub fn normalize(text: &str) -> String {
    let mut result = text.trim().to_lowercase();

    for (contraction, expansion) in CONTRACTIONS.iter() {
        result = result.replace(contraction, expansion);
    }

    result = MULTI_SPACE.replace_all(&result, " ").to_string();

    while result.ends_with('.') || result.ends_with('?') || result.ends_with('!') {
        result.pop();
    }

    result.trim().to_string()
}

/// Whether normalization left anything classifiable behind.
pub fn has_usable_tokens(normalized: &str) -> bool {
    normalized.chars().any(|c| c.is_alphanumeric())
}
