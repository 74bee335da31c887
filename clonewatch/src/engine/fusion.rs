// clonewatch/src/engine/fusion.rs
//
// Weighted signal fusion + three-band decision.
//
//   score = w.judgment     × judgment likelihood
//         + w.vision_brand × brand mismatch score
//         + w.heuristics   × heuristic URL risk
//
// Every input is on a 0–100 scale, so with renormalized weights the score is
// too. Bands are inclusive at their lower bound:
//   score ≥ clone      → Clone
//   score ≥ suspicious → Suspicious
//   otherwise          → Clean
// Comparison uses full precision; only the reported score is rounded.

use serde::{Deserialize, Serialize};

use crate::engine::weights::WeightSet;
use crate::events::{Decision, ScoreBreakdown};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub suspicious: f64,
    pub clone:      f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { suspicious: 30.0, clone: 60.0 }
    }
}

impl Thresholds {
    pub fn classify(&self, score: f64) -> Decision {
        if score >= self.clone {
            Decision::Clone
        } else if score >= self.suspicious {
            Decision::Suspicious
        } else {
            Decision::Clean
        }
    }
}

/// Raw per-signal values fed into fusion, each 0–100.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SignalValues {
    pub judgment:   f64,
    pub mismatch:   f64,
    pub heuristics: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedScore {
    /// Full-precision score used for classification.
    pub raw:       f64,
    /// `raw` rounded to one decimal for display.
    pub score:     f64,
    pub decision:  Decision,
    pub breakdown: ScoreBreakdown,
}

pub struct FusionEngine {
    thresholds: Thresholds,
}

impl FusionEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// `weights` are expected to be normalized already.
    pub fn fuse(&self, weights: &WeightSet, values: &SignalValues) -> FusedScore {
        let judgment   = weights.judgment     * sanitize(values.judgment);
        let mismatch   = weights.vision_brand * sanitize(values.mismatch);
        let heuristics = weights.heuristics   * sanitize(values.heuristics);

        let raw = judgment + mismatch + heuristics;

        FusedScore {
            raw,
            score:    round1(raw),
            decision: self.thresholds.classify(raw),
            breakdown: ScoreBreakdown {
                judgment:     round1(judgment),
                vision_brand: round1(mismatch),
                heuristics:   round1(heuristics),
            },
        }
    }
}

impl Default for FusionEngine {
    fn default() -> Self { Self::new(Thresholds::default()) }
}

/// Missing or garbage values count as 0; everything is held to 0–100.
fn sanitize(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 100.0) } else { 0.0 }
}

pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
