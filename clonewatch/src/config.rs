// clonewatch/src/config.rs
//
// Process-wide configuration, loaded once at startup and shared read-only.
// Every field has a default, so a missing file or a partial one is fine.
//
// {
//   "weights":    { "heuristics": 0.2, "vision_brand": 0.4, "judgment": 0.4 },
//   "thresholds": { "suspicious": 30, "clone": 60 },
//   "cache_ttl_secs": 600,
//   "retry":      { "attempts": 2, "delay_ms": 5000 },
//   "explanation_max_chars": 600,
//   "brands":     [ { "name": "PayPal", "domains": ["paypal.com"] } ]
// }

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::brand::{Brand, BrandRegistry};
use crate::engine::explain::DEFAULT_MAX_CHARS;
use crate::engine::fusion::Thresholds;
use crate::engine::retry::RetryPolicy;
use crate::engine::weights::WeightSet;
use crate::error::ConfigError;
use crate::state::cache::DEFAULT_TTL_SECS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub weights:               WeightSet,
    pub thresholds:            Thresholds,
    pub cache_ttl_secs:        u64,
    pub retry:                 RetryPolicy,
    pub explanation_max_chars: usize,
    pub brands:                BrandRegistry,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            weights:               WeightSet::default(),
            thresholds:            Thresholds::default(),
            cache_ttl_secs:        DEFAULT_TTL_SECS as u64,
            retry:                 RetryPolicy::default(),
            explanation_max_chars: DEFAULT_MAX_CHARS,
            brands:                default_brands(),
        }
    }
}

impl AppConfig {
    /// Read `path` if given, else use defaults. The result is validated and
    /// the brand registry normalized.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let cfg = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
                let cfg = Self::from_json(&raw)
                    .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
                info!(path = %path.display(), brands = cfg.brands.brands().len(), "config loaded");
                cfg
            }
            None => Self::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let mut cfg: Self = serde_json::from_str(raw)?;
        cfg.brands = BrandRegistry::new(cfg.brands.brands().to_vec());
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        for (name, value) in [
            ("heuristics",   w.heuristics),
            ("vision_brand", w.vision_brand),
            ("judgment",     w.judgment),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }

        let Thresholds { suspicious, clone } = self.thresholds;
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(suspicious) || !in_range(clone) || suspicious > clone {
            return Err(ConfigError::InvalidThresholds { suspicious, clone });
        }

        if self.retry.attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }

        if let Some(index) = self.brands.brands().iter().position(|b| b.name.trim().is_empty()) {
            return Err(ConfigError::EmptyBrandName { index });
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        let secs = self.cache_ttl_secs.min(i64::MAX as u64 / 1000) as i64;
        chrono::Duration::seconds(secs)
    }
}

/// Commonly impersonated brands shipped as the default registry.
pub fn default_brands() -> BrandRegistry {
    BrandRegistry::new(vec![
        Brand::new("PayPal",    &["paypal.com", "paypal.me", "paypalobjects.com"]),
        Brand::new("Google",    &["google.com", "gmail.com", "youtube.com"]),
        Brand::new("Microsoft", &["microsoft.com", "live.com", "office.com", "microsoftonline.com", "outlook.com"]),
        Brand::new("Apple",     &["apple.com", "icloud.com"]),
        Brand::new("Amazon",    &["amazon.com", "amazon.co.uk", "amazon.de"]),
        Brand::new("Facebook",  &["facebook.com", "fb.com", "messenger.com"]),
        Brand::new("Netflix",   &["netflix.com"]),
    ])
}
