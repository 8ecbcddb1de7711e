//! Lexical utilities shared by discovery scoring and role classification.
//!
//! The stemmer is deliberately crude: it only has to fold the plural and
//! derivational variants that occur in catalog names and business
//! questions ("advertisements" / "advertising" / "advertisers"), and it
//! must be deterministic.

/// Suffixes folded by `stem`, longest first.
const SUFFIXES: [&str; 8] = ["ements", "ement", "ings", "ing", "ers", "er", "es", "s"];

/// Minimum characters a stem keeps.
const MIN_STEM: usize = 4;

/// Fold a word to a comparison stem.
pub fn stem(word: &str) -> String {
    let lower = word.to_lowercase();

    // "companies" and "company" both fold to "compani".
    if lower.len() > MIN_STEM + 2 {
        if let Some(base) = lower.strip_suffix("ies") {
            return format!("{}i", base);
        }
    }

    for suffix in SUFFIXES {
        if lower.len() >= suffix.len() + MIN_STEM {
            if let Some(base) = lower.strip_suffix(suffix) {
                return fold_trailing_y(base);
            }
        }
    }
    fold_trailing_y(&lower)
}

fn fold_trailing_y(word: &str) -> String {
    match word.strip_suffix('y') {
        Some(base) if base.len() >= 3 => format!("{}i", base),
        _ => word.to_string(),
    }
}

/// Split identifier or prose into lowercase tokens.
///
/// Handles snake_case field ids ("AD_SPEND"), display names, and raw
/// question text alike.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Whether two words fold to the same stem.
pub fn same_stem(a: &str, b: &str) -> bool {
    stem(a) == stem(b)
}

/// Best stem-level overlap between a query's tokens and a label's tokens,
/// in [0,1]. Exact stem hits score 1.0; otherwise the fraction of label
/// tokens covered.
pub fn overlap(query_tokens: &[String], label_tokens: &[String]) -> f64 {
    if label_tokens.is_empty() || query_tokens.is_empty() {
        return 0.0;
    }
    let mut covered = 0usize;
    for label in label_tokens {
        if query_tokens.iter().any(|q| same_stem(q, label)) {
            covered += 1;
        }
    }
    covered as f64 / label_tokens.len() as f64
}
