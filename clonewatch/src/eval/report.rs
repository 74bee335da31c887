// clonewatch/src/eval/report.rs
//
// Markdown and JSON rendering of a replay summary.

use std::fmt::Write;

use super::EvalSummary;
use crate::events::Decision;

const ORDER: [Decision; 3] = [Decision::Clean, Decision::Suspicious, Decision::Clone];

/// Markdown report: headline table, decision counts and, when labels were
/// present, the three-way confusion matrix.
pub fn markdown(s: &EvalSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# clonewatch replay summary\n");
    let _ = writeln!(
        out,
        "**Cases**: {}  **Labeled**: {}  **Cached**: {}  **Degraded**: {}\n",
        s.n_cases, s.n_labeled, s.n_cached, s.n_errored
    );

    let _ = writeln!(out, "| Decision   | Count |");
    let _ = writeln!(out, "|------------|-------|");
    for d in ORDER {
        let _ = writeln!(out, "| {:10} | {:5} |", d, s.decisions.get(&d).copied().unwrap_or(0));
    }

    if !s.has_labels() {
        return out;
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "| Metric    | Value  |");
    let _ = writeln!(out, "|-----------|--------|");
    let _ = writeln!(out, "| Accuracy  | {:.4} |", s.accuracy());
    let _ = writeln!(out, "| Precision | {:.4} |", s.binary.precision());
    let _ = writeln!(out, "| Recall    | {:.4} |", s.binary.recall());
    let _ = writeln!(out, "| F1        | {:.4} |", s.binary.f1());
    let _ = writeln!(out, "| FPR       | {:.4} |", s.binary.fpr());

    let _ = writeln!(out, "\n### Confusion (rows = expected, columns = actual)\n");
    let _ = writeln!(out, "| expected \\ actual | clean | suspicious | clone |");
    let _ = writeln!(out, "|-------------------|-------|------------|-------|");
    for expected in ORDER {
        let cell = |actual| s.confusion.get(&(expected, actual)).copied().unwrap_or(0);
        let _ = writeln!(
            out,
            "| {:17} | {:5} | {:10} | {:5} |",
            expected, cell(Decision::Clean), cell(Decision::Suspicious), cell(Decision::Clone)
        );
    }
    out
}

/// Serialize the summary for downstream consumption.
pub fn to_json(s: &EvalSummary) -> String {
    let decisions: serde_json::Map<String, serde_json::Value> = ORDER.iter()
        .map(|d| (d.to_string(), s.decisions.get(d).copied().unwrap_or(0).into()))
        .collect();

    serde_json::json!({
        "n_cases":   s.n_cases,
        "n_labeled": s.n_labeled,
        "n_cached":  s.n_cached,
        "n_errored": s.n_errored,
        "accuracy":  s.accuracy(),
        "precision": s.binary.precision(),
        "recall":    s.binary.recall(),
        "f1":        s.binary.f1(),
        "fpr":       s.binary.fpr(),
        "decisions": decisions,
    })
    .to_string()
}
