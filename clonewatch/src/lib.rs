// clonewatch/src/lib.rs
//
// clonewatch: phishing-clone signal fusion and decision engine.
//
// A captured page (URL, screenshot, title, text) is scored from three
// signals (URL heuristics, vision logos, a multimodal brand judgment) plus a
// brand/domain mismatch check, fused into a 0–100 score and mapped to
// clean / suspicious / clone. Results are cached by request fingerprint.

pub mod cases;
pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod events;
pub mod state;
pub mod workers;

pub use config::AppConfig;
pub use engine::pipeline::Pipeline;
pub use error::{CaseError, ConfigError, UpstreamError};
pub use events::{AnalysisOutcome, AnalysisRequest, Decision, ResultPayload};
pub use state::cache::FingerprintCache;
