//! Lexical intent classification.
//!
//! An ordered rule table maps normalized text to one of the five intent
//! kinds. Rules are checked top to bottom; the first hit wins. When no
//! rule matches, the classifier falls back to LIST with low confidence
//! rather than failing — only token-free input is unparsable.
use lazy_static::lazy_static;
use regex::Regex;

use grq_core::{IntentAnalysis, IntentKind};

struct IntentRule {
    name: &'static str,
    kind: IntentKind,
    pattern: Regex,
    confidence: f64,
}

lazy_static! {
    static ref RULES: Vec<IntentRule> = vec![
        IntentRule {
            name: "count_phrase",
            kind: IntentKind::Count,
            pattern: Regex::new(r"\b(how many|count of|number of|total number|how much)\b").unwrap(),
            confidence: 0.95,
        },
        IntentRule {
            name: "compare_phrase",
            kind: IntentKind::Compare,
            pattern: Regex::new(r"\b(compare|versus|vs\.?|difference between|compared (to|with))\b").unwrap(),
            confidence: 0.9,
        },
        IntentRule {
            name: "analyze_phrase",
            kind: IntentKind::Analyze,
            pattern: Regex::new(r"\b(why|analy[sz]e|analysis|trend|insight|pattern|explain)\b").unwrap(),
            confidence: 0.85,
        },
        IntentRule {
            name: "catalog_meta",
            kind: IntentKind::Meta,
            pattern: Regex::new(
                r"\b((what|which) (data |golden )?(models?|tables?|datasets?|collections?|fields?)\b|what data (do you|is) |what can you (do|answer|tell)|what do you know)"
            ).unwrap(),
            confidence: 0.9,
        },
        IntentRule {
            name: "list_phrase",
            kind: IntentKind::List,
            pattern: Regex::new(r"\b(list|show|display|give me|find|which|what|who)\b").unwrap(),
            confidence: 0.85,
        },
    ];
}

/// Default when nothing matches: listing is the safest interpretation.
const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Classify normalized text into an intent.
pub fn classify(normalized: &str) -> IntentAnalysis {
    for rule in RULES.iter() {
        if rule.pattern.is_match(normalized) {
            return IntentAnalysis {
                kind: rule.kind,
                confidence: rule.confidence,
                matched_rule: rule.name.to_string(),
            };
        }
    }
    IntentAnalysis {
        kind: IntentKind::List,
        confidence: FALLBACK_CONFIDENCE,
        matched_rule: "default_list".to_string(),
    }
}
