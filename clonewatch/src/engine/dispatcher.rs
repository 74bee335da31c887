// clonewatch/src/engine/dispatcher.rs
//
// Writes analysis results to output JSONL files.
//   every result      → results.jsonl
//   decision=clone    → clone_alerts.jsonl
//   decision=suspicious → review_queue.jsonl
// Wire these files to a takedown queue / analyst tooling downstream.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::events::{AnalysisOutcome, Decision};

pub const RESULTS_FILE:      &str = "results.jsonl";
pub const CLONE_ALERTS_FILE: &str = "clone_alerts.jsonl";
pub const REVIEW_QUEUE_FILE: &str = "review_queue.jsonl";

/// One dispatched line: the outcome plus where it came from.
#[derive(Debug, Serialize)]
pub struct DispatchRecord<'a> {
    pub case:          usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected:      Option<Decision>,
    #[serde(flatten)]
    pub outcome:       &'a AnalysisOutcome,
    pub dispatched_at: DateTime<Utc>,
}

pub struct Dispatcher {
    out:  PathBuf,
    // one writer at a time so lines never interleave
    lock: Mutex<()>,
}

impl Dispatcher {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let out: PathBuf = output_dir.into();
        std::fs::create_dir_all(&out)
            .with_context(|| format!("cannot create output directory {}", out.display()))?;
        Ok(Self { out, lock: Mutex::new(()) })
    }

    pub fn output_dir(&self) -> &Path {
        &self.out
    }

    /// Append the outcome to the result log and, for flagged decisions, to
    /// the matching queue. Returns the queue file used, if any.
    pub async fn dispatch(
        &self,
        case:     usize,
        expected: Option<Decision>,
        outcome:  &AnalysisOutcome,
    ) -> Result<Option<&'static str>> {
        let record = DispatchRecord { case, expected, outcome, dispatched_at: Utc::now() };
        let line = serde_json::to_string(&record)? + "\n";

        let queue = match outcome.payload.decision {
            Decision::Clone      => Some(CLONE_ALERTS_FILE),
            Decision::Suspicious => Some(REVIEW_QUEUE_FILE),
            Decision::Clean      => None,
        };

        let _guard = self.lock.lock().await;
        if let Some(file) = queue {
            self.write(file, &line).await?;
            info!(
                case,
                url      = %outcome.payload.url,
                decision = %outcome.payload.decision,
                score    = outcome.payload.score,
                queue    = file,
                "dispatched"
            );
        }
        self.write(RESULTS_FILE, &line).await?;

        Ok(queue)
    }

    async fn write(&self, file: &str, content: &str) -> Result<()> {
        let path = self.out.join(file);
        let mut f = OpenOptions::new().create(true).append(true)
            .open(&path).await
            .with_context(|| format!("cannot open {}", path.display()))?;
        f.write_all(content.as_bytes()).await?;
        Ok(())
    }
}
