// clonewatch/src/events.rs
//
// Shared domain types flowing through clonewatch: the incoming analysis
// request, the four per-request signals, and the result payload that is
// cached and returned to the caller.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Page text beyond this many characters is dropped on intake.
pub const PAGE_TEXT_LIMIT: usize = 3000;

// ── Request ───────────────────────────────────────────────────────────────────

/// One page to judge. Capturing the page (screenshot, HTML, title) happens
/// upstream; the engine only sees the captured artefacts.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub url:        String,
    pub image:      Option<Vec<u8>>,
    pub page_title: String,
    pub page_text:  String,
}

impl AnalysisRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.page_title = title.into();
        self
    }

    pub fn with_page_text(mut self, text: &str) -> Self {
        self.page_text = clip_chars(text, PAGE_TEXT_LIMIT).to_string();
        self
    }

    /// Image bytes, treating an empty buffer the same as no image.
    pub fn image_bytes(&self) -> Option<&[u8]> {
        self.image.as_deref().filter(|b| !b.is_empty())
    }
}

/// Longest prefix of `s` holding at most `max` characters.
pub fn clip_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── Signals ───────────────────────────────────────────────────────────────────

/// URL / domain risk, 0–100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeuristicSignal {
    pub risk:              f64,
    pub registered_domain: String,
    #[serde(default)]
    pub host:              String,
    #[serde(default)]
    pub flags:             Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Logo {
    pub description: String,
    pub score:       f64,
}

/// Logos and OCR text extracted from the page image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionSignal {
    #[serde(default)]
    pub logos: Vec<Logo>,
    #[serde(default)]
    pub text:  String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VisionSignal {
    /// Empty signal standing in for a failed vision call.
    pub fn degraded(error: impl Into<String>) -> Self {
        Self { error: Some(error.into()), ..Self::default() }
    }

    pub fn has_logos(&self) -> bool {
        !self.logos.is_empty()
    }

    /// Highest-scoring logo, description as reported (possibly blank).
    /// Among equal scores the earliest one wins.
    pub fn top_logo(&self) -> Option<&Logo> {
        let mut ranked: Vec<&Logo> = self.logos.iter().collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.into_iter().next()
    }
}

/// Multimodal brand-impersonation judgment after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentSignal {
    pub likelihood:      u8,
    pub suspected_brand: String,
    pub explanation:     String,
}

impl JudgmentSignal {
    pub const DEFAULT_LIKELIHOOD: u8 = 50;

    pub fn with_explanation(explanation: impl Into<String>) -> Self {
        Self { explanation: explanation.into(), ..Self::default() }
    }
}

impl Default for JudgmentSignal {
    fn default() -> Self {
        Self {
            likelihood:      Self::DEFAULT_LIKELIHOOD,
            suspected_brand: String::new(),
            explanation:     String::new(),
        }
    }
}

/// Claimed brand versus the domain actually serving the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandMismatch {
    pub brand:             String,
    pub allowed_domains:   Vec<String>,
    pub registered_domain: String,
    pub score:             f64,
}

// ── Decision ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Clean,
    Suspicious,
    Clone,
}

impl Decision {
    pub fn advice(self) -> &'static str {
        match self {
            Decision::Clone      => "Do NOT enter credentials or personal info.",
            Decision::Suspicious => "Be cautious: this site may be a clone. Double-check the domain.",
            Decision::Clean      => "Looks safe, but always verify before logging in.",
        }
    }

    pub fn is_flagged(self) -> bool {
        self != Decision::Clean
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Clean      => "clean",
            Decision::Suspicious => "suspicious",
            Decision::Clone      => "clone",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ── Result ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    pub heuristics:     HeuristicSignal,
    pub vision:         VisionSignal,
    pub judgment:       JudgmentSignal,
    pub brand_mismatch: BrandMismatch,
}

/// Weighted contribution of each signal to the final score, one decimal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub judgment:     f64,
    pub vision_brand: f64,
    pub heuristics:   f64,
}

/// Everything computed for one request. Cached verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub url:         String,
    pub decision:    Decision,
    pub score:       f64,
    pub advice:      String,
    pub explanation: String,
    pub signals:     Signals,
    pub breakdown:   ScoreBreakdown,
    pub errors:      BTreeMap<String, String>,
}

/// What the caller receives: the payload plus whether it came from cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub cached:  bool,
    #[serde(flatten)]
    pub payload: ResultPayload,
}
