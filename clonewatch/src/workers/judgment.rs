// clonewatch/src/workers/judgment.rs
//
// Judgment worker: multimodal "is this a clone of a known brand" call.
// The only signal that is retried. Whatever comes back goes through the
// normalizer; exhausted retries become a default judgment whose explanation
// names the failure.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, warn};

use crate::engine::brand::BrandRegistry;
use crate::engine::normalize::{normalize, UpstreamJudgment};
use crate::engine::retry::{self, RetryPolicy};
use crate::error::UpstreamError;
use crate::events::{clip_chars, JudgmentSignal};

/// Characters of page text forwarded to the judgment service.
pub const SNIPPET_CHARS: usize = 1200;

const INSTRUCTION: &str = "\
You are a security analyst. Given a webpage screenshot and context, judge whether \
it is likely a clone (phishing) of any authorized site.\n\
Return a JSON with keys: likelihood (0-100), suspected_brand (string or ''), \
explanation (1-3 sentences).";

/// Everything the judgment service is given for one page.
#[derive(Debug, Clone, Copy)]
pub struct JudgmentContext<'a> {
    pub image:      &'a [u8],
    pub url:        &'a str,
    pub page_title: &'a str,
    pub snippet:    &'a str,
    pub brands:     &'a BrandRegistry,
}

impl<'a> JudgmentContext<'a> {
    pub fn new(
        image:      &'a [u8],
        url:        &'a str,
        page_title: &'a str,
        page_text:  &'a str,
        brands:     &'a BrandRegistry,
    ) -> Self {
        Self { image, url, page_title, snippet: clip_chars(page_text, SNIPPET_CHARS), brands }
    }

    /// Textual part of the request; the image travels alongside it.
    pub fn prompt(&self) -> String {
        let authorized = self.brands.brands().iter()
            .map(|b| format!("{} (domains: {})", b.name, b.domains.join(", ")))
            .collect::<Vec<_>>()
            .join(", ");
        let authorized = if authorized.is_empty() { "(none provided)".to_string() } else { authorized };

        format!(
            "URL: {}\nTitle: {}\nAuthorized brands: {}\nText snippet: {}\n\n{}",
            self.url, self.page_title, authorized, self.snippet, INSTRUCTION
        )
    }
}

/// External multimodal judgment service.
pub trait JudgmentClient: Send + Sync {
    fn judge(&self, ctx: &JudgmentContext<'_>)
        -> impl Future<Output = Result<UpstreamJudgment, UpstreamError>> + Send;
}

/// Outcome of the judgment step: the normalized signal plus the error that
/// exhausted the retries, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgmentOutcome {
    pub signal: JudgmentSignal,
    pub error:  Option<String>,
}

/// Call the service with retry. `None` context (no image) skips the call
/// and yields the default judgment.
pub async fn gather<J: JudgmentClient>(
    client: &J,
    ctx:    Option<JudgmentContext<'_>>,
    policy: RetryPolicy,
) -> JudgmentOutcome {
    let Some(ctx) = ctx else {
        return JudgmentOutcome { signal: JudgmentSignal::default(), error: None };
    };

    let ctx = &ctx;
    match retry::invoke(policy, "judgment", move || client.judge(ctx)).await {
        Ok(raw) => {
            let signal = normalize(raw);
            debug!(likelihood = signal.likelihood, brand = %signal.suspected_brand, "judgment");
            JudgmentOutcome { signal, error: None }
        }
        Err(e) => {
            warn!(error = %e, "judgment unavailable, using default");
            let reason = format!("judgment_failed: {e}");
            JudgmentOutcome {
                signal: JudgmentSignal::with_explanation(reason.clone()),
                error:  Some(reason),
            }
        }
    }
}

/// Replays captured judgment responses in order; the last one repeats.
#[derive(Debug)]
pub struct RecordedJudgment {
    responses: Vec<Result<UpstreamJudgment, UpstreamError>>,
    calls:     AtomicUsize,
}

impl RecordedJudgment {
    pub fn new(responses: Vec<Result<UpstreamJudgment, UpstreamError>>) -> Self {
        Self { responses, calls: AtomicUsize::new(0) }
    }

    pub fn single(response: Result<UpstreamJudgment, UpstreamError>) -> Self {
        Self::new(vec![response])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl JudgmentClient for RecordedJudgment {
    async fn judge(&self, _ctx: &JudgmentContext<'_>) -> Result<UpstreamJudgment, UpstreamError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(n).or_else(|| self.responses.last()) {
            Some(r) => r.clone(),
            None => Err(UpstreamError::Unavailable("no recorded judgment".into())),
        }
    }
}
