// clonewatch/src/engine/retry.rs
//
// Bounded retry with a fixed pause between attempts. Only the judgment call
// goes through here; vision and heuristics are single-shot.
//
// There is no timeout around the wrapped call. A hung upstream stalls the
// calling task until the call itself gives up.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay_ms: delay.as_millis() as u64 }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 2, delay_ms: 5_000 }
    }
}

/// Run `op` until it succeeds or `policy.attempts` attempts have failed,
/// sleeping `policy.delay()` between attempts but not after the last one.
/// The final error is returned unchanged.
pub async fn invoke<T, E, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    F:   FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E:   Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!(call = label, attempt, of = attempts, error = %e, "upstream call failed, retrying");
                tokio::time::sleep(policy.delay()).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(call = label, attempts, error = %e, "upstream call failed, giving up");
                return Err(e);
            }
        }
    }
}
