// clonewatch/src/engine/weights.rs
//
// Per-request weight adjustment. Base weights come from config; stronger
// corroborating evidence bumps the matching signal by a fixed bonus and the
// set is renormalized to sum to 1.

use serde::{Deserialize, Serialize};

/// Added to a signal's weight when its evidence is strong.
pub const EVIDENCE_BONUS: f64 = 0.1;

/// Page text longer than this counts as strong evidence for the judgment.
pub const RICH_TEXT_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightSet {
    pub heuristics:   f64,
    pub vision_brand: f64,
    #[serde(alias = "gemini")]
    pub judgment:     f64,
}

impl Default for WeightSet {
    fn default() -> Self {
        Self { heuristics: 0.2, vision_brand: 0.4, judgment: 0.4 }
    }
}

impl WeightSet {
    pub fn total(&self) -> f64 {
        self.heuristics + self.vision_brand + self.judgment
    }

    /// Weights scaled to sum to 1. An all-zero set stays all zero.
    pub fn normalized(&self) -> Self {
        let total = self.total();
        let total = if total == 0.0 { 1.0 } else { total };
        Self {
            heuristics:   self.heuristics   / total,
            vision_brand: self.vision_brand / total,
            judgment:     self.judgment     / total,
        }
    }

    /// Bonus for detected logos (vision) and rich page text (judgment), then
    /// renormalized.
    pub fn adjusted(&self, logos_detected: bool, page_text_chars: usize) -> Self {
        let mut w = *self;
        if logos_detected {
            w.vision_brand += EVIDENCE_BONUS;
        }
        if page_text_chars > RICH_TEXT_CHARS {
            w.judgment += EVIDENCE_BONUS;
        }
        w.normalized()
    }
}
