// clonewatch/src/state/cache.rs
//
// Fingerprint → result cache with lazy TTL expiry.
// DashMap = sharded concurrent HashMap, shared across tokio tasks.
//
// Design:
//   - Key is SHA-256 over the URL plus at most the first 100 image bytes.
//     Distinct images sharing a URL and leading bytes collide.
//   - Entries are checked on read; an expired entry is removed by the read
//     that finds it. Nothing sweeps in the background.
//   - Two tasks racing on one fingerprint may both compute; last store wins.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::events::ResultPayload;

/// Leading image bytes folded into the fingerprint.
pub const IMAGE_SAMPLE_BYTES: usize = 100;

pub const DEFAULT_TTL_SECS: i64 = 10 * 60;

// ── Fingerprint ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestFingerprint(String);

impl RequestFingerprint {
    pub fn derive(url: &str, image: Option<&[u8]>) -> Self {
        let mut h = Sha256::new();
        h.update(url.as_bytes());
        if let Some(bytes) = image {
            h.update(&bytes[..bytes.len().min(IMAGE_SAMPLE_BYTES)]);
        }
        Self(hex::encode(h.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 16 hex chars is plenty for log correlation
        write!(f, "{}", &self.0[..16])
    }
}

// ── Cache ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct CacheEntry {
    payload:     ResultPayload,
    inserted_at: DateTime<Utc>,
}

pub struct FingerprintCache {
    entries: DashMap<RequestFingerprint, CacheEntry>,
    ttl:     Duration,
}

impl FingerprintCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: DashMap::new(), ttl }
    }

    pub fn lookup(&self, fp: &RequestFingerprint) -> Option<ResultPayload> {
        self.lookup_at(fp, Utc::now())
    }

    /// Lookup against an explicit clock. An entry older than the TTL is
    /// evicted and reported as absent.
    pub fn lookup_at(&self, fp: &RequestFingerprint, now: DateTime<Utc>) -> Option<ResultPayload> {
        let ttl = self.ttl;
        let expired = |_: &RequestFingerprint, e: &CacheEntry| now - e.inserted_at > ttl;

        // check + remove under one shard lock
        if self.entries.remove_if(fp, expired).is_some() {
            debug!(fingerprint = %fp, "cache entry expired");
            return None;
        }
        self.entries.get(fp).map(|e| e.payload.clone())
    }

    pub fn store(&self, fp: RequestFingerprint, payload: ResultPayload) {
        self.store_at(fp, payload, Utc::now());
    }

    pub fn store_at(&self, fp: RequestFingerprint, payload: ResultPayload, inserted_at: DateTime<Utc>) {
        self.entries.insert(fp, CacheEntry { payload, inserted_at });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FingerprintCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECS))
    }
}
