// clonewatch/src/workers/mod.rs
//
// Signal producers. Heuristics run in-process; vision and judgment reach
// external services through the client traits defined here.

pub mod heuristics;
pub mod judgment;
pub mod vision;

pub use heuristics::HeuristicAnalyzer;
pub use judgment::{JudgmentClient, JudgmentContext, JudgmentOutcome, RecordedJudgment};
pub use vision::{RecordedVision, VisionClient};
