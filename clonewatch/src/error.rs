// clonewatch/src/error.rs
//
// Error types. Upstream failures never abort an analysis; they are rendered
// into the result's `errors` map. Config and case errors abort at startup.

use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by an external collaborator (vision or judgment service).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("upstream rejected request: {0}")]
    Rejected(String),

    #[error("upstream timed out after {0}ms")]
    Timeout(u64),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("cannot parse config {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("weight `{name}` must be a finite non-negative number, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("thresholds must satisfy 0 <= suspicious ({suspicious}) <= clone ({clone}) <= 100")]
    InvalidThresholds { suspicious: f64, clone: f64 },

    #[error("retry attempts must be at least 1")]
    ZeroAttempts,

    #[error("brand #{index} has an empty name")]
    EmptyBrandName { index: usize },
}

/// Failure loading a captured case for `analyze` / `replay`.
#[derive(Debug, Error)]
pub enum CaseError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("line {line}: {source}")]
    Parse { line: usize, source: serde_json::Error },

    #[error("line {line}: image_hex is not valid hex: {source}")]
    ImageHex { line: usize, source: hex::FromHexError },
}
