// clonewatch/src/engine/normalize.rs
//
// Turns whatever the judgment service sent back into a JudgmentSignal.
//
// Fallback chain for the outer payload:
//   1. already a JSON object        → use it
//   2. whole text parses as object  → use it
//   3. first '{' .. last '}' parses → use it (code fences, commentary)
//   4. otherwise                    → defaults, raw text as explanation
//
// The service sometimes double-encodes its answer inside `explanation`.
// The same chain (2, 3) is run over the explanation string and any object
// found there is merged over the outer fields. Nothing here fails.

use serde_json::{Map, Value};
use tracing::debug;

use crate::events::JudgmentSignal;

/// Raw judgment service output.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamJudgment {
    Structured(Value),
    Text(String),
}

pub fn normalize(raw: UpstreamJudgment) -> JudgmentSignal {
    let text = match raw {
        UpstreamJudgment::Structured(Value::Object(map)) => return with_nested(from_map(&map)),
        UpstreamJudgment::Structured(Value::String(s))   => s,
        UpstreamJudgment::Structured(other)              => other.to_string(),
        UpstreamJudgment::Text(s)                        => s,
    };

    match extract_json_object(&text) {
        Some(map) => with_nested(from_map(&map)),
        None => {
            debug!(len = text.len(), "judgment payload is not JSON, keeping raw text");
            JudgmentSignal::with_explanation(text)
        }
    }
}

/// First JSON object found in `text`: the whole trimmed text, else the slice
/// from the first `{` to the last `}`. Non-object JSON does not count.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let t = text.trim();
    if t.is_empty() { return None; }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(t) {
        return Some(map);
    }

    let start = t.find('{')?;
    let end   = t.rfind('}')?;
    if end <= start { return None; }

    match serde_json::from_str::<Value>(&t[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn from_map(map: &Map<String, Value>) -> JudgmentSignal {
    JudgmentSignal {
        likelihood:      map.get("likelihood")
                            .and_then(coerce_likelihood)
                            .unwrap_or(JudgmentSignal::DEFAULT_LIKELIHOOD),
        suspected_brand: map.get("suspected_brand").map(text_of).unwrap_or_default(),
        explanation:     map.get("explanation").map(text_of).unwrap_or_default(),
    }
}

fn with_nested(mut judgment: JudgmentSignal) -> JudgmentSignal {
    let Some(nested) = extract_json_object(&judgment.explanation) else {
        return judgment;
    };
    debug!(keys = nested.len(), "merging JSON embedded in judgment explanation");

    if let Some(likelihood) = nested.get("likelihood").and_then(coerce_likelihood) {
        judgment.likelihood = likelihood;
    }
    if let Some(brand) = nested.get("suspected_brand").map(text_of) {
        if !brand.is_empty() {
            judgment.suspected_brand = brand;
        }
    }
    if let Some(explanation) = nested.get("explanation") {
        judgment.explanation = text_of(explanation);
    }
    judgment
}

/// Integer likelihood from a number or numeric string, clamped to 0–100.
fn coerce_likelihood(v: &Value) -> Option<u8> {
    let n = match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64))?,
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))?
        }
        _ => return None,
    };
    Some(n.clamp(0, 100) as u8)
}

fn text_of(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null      => String::new(),
        other            => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> JudgmentSignal {
        normalize(UpstreamJudgment::Text(s.to_string()))
    }

    #[test]
    fn structured_object_is_used_directly() {
        let j = normalize(UpstreamJudgment::Structured(json!({
            "likelihood": 85, "suspected_brand": "PayPal", "explanation": "Clone of PayPal login page."
        })));
        assert_eq!(j.likelihood, 85);
        assert_eq!(j.suspected_brand, "PayPal");
        assert_eq!(j.explanation, "Clone of PayPal login page.");
    }

    #[test]
    fn likelihood_is_clamped_both_ways() {
        assert_eq!(text(r#"{"likelihood": -5}"#).likelihood, 0);
        assert_eq!(text(r#"{"likelihood": 250}"#).likelihood, 100);
        assert_eq!(text(r#"{"likelihood": "77"}"#).likelihood, 77);
        assert_eq!(text(r#"{"likelihood": 64.9}"#).likelihood, 64);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let j = text(r#"{"suspected_brand": null}"#);
        assert_eq!(j, JudgmentSignal::default());
    }

    #[test]
    fn uncoercible_likelihood_keeps_default() {
        assert_eq!(text(r#"{"likelihood": "very high"}"#).likelihood, 50);
        assert_eq!(text(r#"{"likelihood": true}"#).likelihood, 50);
    }

    #[test]
    fn code_fenced_json_is_extracted() {
        let j = text("```json\n{\"likelihood\": 91, \"suspected_brand\": \"Netflix\", \"explanation\": \"x\"}\n```");
        assert_eq!(j.likelihood, 91);
        assert_eq!(j.suspected_brand, "Netflix");
    }

    #[test]
    fn commentary_around_json_is_ignored() {
        let j = text("Here is my answer: {\"likelihood\": 12} hope it helps");
        assert_eq!(j.likelihood, 12);
    }

    #[test]
    fn unparseable_text_becomes_explanation_verbatim() {
        let raw = "I think this is {probably} a clone";
        let j = text(raw);
        assert_eq!(j.likelihood, 50);
        assert_eq!(j.suspected_brand, "");
        assert_eq!(j.explanation, raw);
    }

    #[test]
    fn non_object_json_falls_back_to_raw_text() {
        let j = text("[1, 2, 3]");
        assert_eq!(j.explanation, "[1, 2, 3]");
        assert_eq!(j.likelihood, 50);
    }

    #[test]
    fn nested_json_in_explanation_overrides_numbers_and_brand() {
        let explanation = r#"some text {"likelihood": 90, "suspected_brand": "Acme"} trailing"#;
        let j = normalize(UpstreamJudgment::Structured(json!({
            "likelihood": 40, "suspected_brand": "", "explanation": explanation
        })));
        assert_eq!(j.likelihood, 90);
        assert_eq!(j.suspected_brand, "Acme");
        assert_eq!(j.explanation, explanation);
    }

    #[test]
    fn nested_explanation_replaces_outer_when_present() {
        let j = normalize(UpstreamJudgment::Structured(json!({
            "likelihood": 40,
            "explanation": "```json {\"likelihood\": 70, \"explanation\": \"Fake bank portal.\"} ```"
        })));
        assert_eq!(j.likelihood, 70);
        assert_eq!(j.explanation, "Fake bank portal.");
    }

    #[test]
    fn empty_nested_brand_does_not_erase_outer_brand() {
        let j = normalize(UpstreamJudgment::Structured(json!({
            "suspected_brand": "PayPal",
            "explanation": "{\"suspected_brand\": \"\", \"likelihood\": 300}"
        })));
        assert_eq!(j.suspected_brand, "PayPal");
        assert_eq!(j.likelihood, 100);
    }

    #[test]
    fn nested_likelihood_coercion_failure_is_ignored() {
        let j = normalize(UpstreamJudgment::Structured(json!({
            "likelihood": 33,
            "explanation": "{\"likelihood\": \"n/a\"}"
        })));
        assert_eq!(j.likelihood, 33);
    }

    #[test]
    fn extract_requires_closing_brace_after_opening() {
        assert!(extract_json_object("} nothing {").is_none());
        assert!(extract_json_object("").is_none());
        assert!(extract_json_object("plain prose.").is_none());
    }
}
