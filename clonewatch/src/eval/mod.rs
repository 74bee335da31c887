// clonewatch/src/eval/mod.rs
//
// Agreement between replayed decisions and the `expected` labels carried by
// captured cases.
//
// Two views:
//   1. three-way: exact decision agreement (accuracy) + confusion counts
//   2. binary:    positive = suspicious or clone, negative = clean,
//                 giving precision / recall / F1 / FPR
//
// Unlabeled cases are counted but do not enter either view.

pub mod report;

use std::collections::BTreeMap;

use crate::events::Decision;

// ── Binary counters ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub tp: u64,  // true positive
    pub fp: u64,  // false positive
    pub tn: u64,  // true negative
    pub fn_: u64, // false negative
}

impl Metrics {
    pub fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true,  true)  => self.tp  += 1,
            (true,  false) => self.fp  += 1,
            (false, true)  => self.fn_ += 1,
            (false, false) => self.tn  += 1,
        }
    }

    pub fn precision(&self) -> f64 {
        let denom = self.tp + self.fp;
        if denom == 0 { 1.0 } else { self.tp as f64 / denom as f64 }
    }

    pub fn recall(&self) -> f64 {
        let denom = self.tp + self.fn_;
        if denom == 0 { 0.0 } else { self.tp as f64 / denom as f64 }
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }

    pub fn fpr(&self) -> f64 {
        let denom = self.fp + self.tn;
        if denom == 0 { 0.0 } else { self.fp as f64 / denom as f64 }
    }
}

// ── Replay summary ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct EvalSummary {
    pub n_cases:   usize,
    pub n_labeled: usize,
    pub n_agree:   usize,
    pub n_cached:  usize,
    pub n_errored: usize,
    pub binary:    Metrics,
    /// (expected, actual) → count, labeled cases only.
    pub confusion: BTreeMap<(Decision, Decision), u64>,
    pub decisions: BTreeMap<Decision, u64>,
}

impl EvalSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// `had_errors` is whether any collaborator degraded for this case.
    pub fn record(&mut self, expected: Option<Decision>, actual: Decision, cached: bool, had_errors: bool) {
        self.n_cases += 1;
        *self.decisions.entry(actual).or_default() += 1;
        if cached     { self.n_cached  += 1; }
        if had_errors { self.n_errored += 1; }

        let Some(expected) = expected else { return };
        self.n_labeled += 1;
        if expected == actual {
            self.n_agree += 1;
        }
        *self.confusion.entry((expected, actual)).or_default() += 1;
        self.binary.record(actual.is_flagged(), expected.is_flagged());
    }

    pub fn accuracy(&self) -> f64 {
        if self.n_labeled == 0 { 0.0 } else { self.n_agree as f64 / self.n_labeled as f64 }
    }

    pub fn has_labels(&self) -> bool {
        self.n_labeled > 0
    }
}
