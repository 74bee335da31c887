// clonewatch/src/engine/explain.rs
//
// Display explanation: pick a source sentence, strip code fences, and trim
// to a sentence boundary under the character limit.

use crate::events::{BrandMismatch, JudgmentSignal};

pub const DEFAULT_MAX_CHARS: usize = 600;
pub const ELLIPSIS: &str = "...";

const NO_INDICATORS: &str = "No strong phishing indicators were found for this page.";

/// Judgment explanation if any, else a mismatch sentence when the brand
/// check fired, else a generic all-clear.
pub fn explanation_source(judgment: &JudgmentSignal, mismatch: &BrandMismatch) -> String {
    if !judgment.explanation.trim().is_empty() {
        return judgment.explanation.clone();
    }
    if mismatch.score > 0.0 {
        let domain = if mismatch.registered_domain.is_empty() {
            "an unknown domain"
        } else {
            mismatch.registered_domain.as_str()
        };
        return if mismatch.allowed_domains.is_empty() {
            format!(
                "The page presents itself as {} but is served from {}, which cannot be verified against any known {} domain.",
                mismatch.brand, domain, mismatch.brand
            )
        } else {
            format!(
                "The page presents itself as {} but is served from {}, not from {}.",
                mismatch.brand, domain, mismatch.allowed_domains.join(", ")
            )
        };
    }
    NO_INDICATORS.to_string()
}

/// Remove code fences; if still longer than `max_chars`, cut at the last
/// `.`, `!` or `?` inside the limit (not at position 0), else hard-cut and
/// append an ellipsis.
pub fn trim(text: &str, max_chars: usize) -> String {
    let t = text.replace("```json", "").replace("```", "");
    let t = t.trim();
    if t.chars().count() <= max_chars {
        return t.to_string();
    }

    let cut = crate::events::clip_chars(t, max_chars);
    match cut.rfind(|c: char| matches!(c, '.' | '!' | '?')) {
        Some(idx) if idx > 0 => cut[..=idx].to_string(),
        _ => format!("{cut}{ELLIPSIS}"),
    }
}
