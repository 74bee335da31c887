// clonewatch/src/engine/pipeline.rs
//
// One analysis, start to finish:
//
//   fingerprint → cache lookup (hit ⇒ return)
//     → heuristics → vision → judgment (retry + normalize)
//     → brand mismatch → weight adjustment → fusion → explanation
//     → cache store → return
//
// Signals are gathered strictly in sequence. Nothing in here fails: every
// collaborator failure is absorbed into a degraded signal plus an entry in
// the result's `errors` map.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::AppConfig;
use crate::engine::brand;
use crate::engine::explain;
use crate::engine::fusion::{FusionEngine, SignalValues};
use crate::events::{AnalysisOutcome, AnalysisRequest, ResultPayload, Signals};
use crate::state::cache::{FingerprintCache, RequestFingerprint};
use crate::workers::heuristics::HeuristicAnalyzer;
use crate::workers::judgment::{self, JudgmentClient, JudgmentContext, JudgmentOutcome};
use crate::workers::vision::{self, VisionClient};

pub struct Pipeline {
    config:     Arc<AppConfig>,
    cache:      Arc<FingerprintCache>,
    heuristics: HeuristicAnalyzer,
    fusion:     FusionEngine,
}

impl Pipeline {
    pub fn new(config: Arc<AppConfig>, cache: Arc<FingerprintCache>) -> Self {
        Self {
            heuristics: HeuristicAnalyzer::new(config.brands.clone()),
            fusion:     FusionEngine::new(config.thresholds),
            config,
            cache,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &FingerprintCache {
        &self.cache
    }

    pub async fn analyze<V, J>(
        &self,
        req:             &AnalysisRequest,
        vision_client:   &V,
        judgment_client: &J,
    ) -> AnalysisOutcome
    where
        V: VisionClient,
        J: JudgmentClient,
    {
        let image = req.image_bytes();
        let fp    = RequestFingerprint::derive(&req.url, image);

        if let Some(payload) = self.cache.lookup(&fp) {
            info!(fingerprint = %fp, decision = %payload.decision, "cache hit");
            return AnalysisOutcome { cached: true, payload };
        }
        debug!(fingerprint = %fp, "cache miss");

        let mut errors = BTreeMap::new();

        // ── Signals ───────────────────────────────────────────────────────────
        let heuristics = self.heuristics.analyze(&req.url, &req.page_text);

        let mut vision = vision::gather(vision_client, image).await;
        if let Some(e) = vision.error.take() {
            errors.insert("vision".to_string(), e);
        }

        let ctx = image.map(|image| JudgmentContext::new(
            image, &req.url, &req.page_title, &req.page_text, &self.config.brands,
        ));
        let JudgmentOutcome { signal: judgment, error } =
            judgment::gather(judgment_client, ctx, self.config.retry).await;
        if let Some(e) = error {
            errors.insert("judgment".to_string(), e);
        }

        // ── Scoring ───────────────────────────────────────────────────────────
        let mismatch = brand::assess(&self.config.brands, &judgment, &vision, &heuristics);
        let weights  = self.config.weights.adjusted(vision.has_logos(), req.page_text.chars().count());
        let fused    = self.fusion.fuse(&weights, &SignalValues {
            judgment:   f64::from(judgment.likelihood),
            mismatch:   mismatch.score,
            heuristics: heuristics.risk,
        });

        let explanation = explain::trim(
            &explain::explanation_source(&judgment, &mismatch),
            self.config.explanation_max_chars,
        );

        info!(
            fingerprint = %fp,
            decision    = %fused.decision,
            score       = fused.score,
            brand       = %mismatch.brand,
            mismatch    = mismatch.score,
            risk        = heuristics.risk,
            likelihood  = judgment.likelihood,
            errors      = errors.len(),
            "analysis complete"
        );

        let payload = ResultPayload {
            url:       req.url.clone(),
            decision:  fused.decision,
            score:     fused.score,
            advice:    fused.decision.advice().to_string(),
            explanation,
            signals:   Signals { heuristics, vision, judgment, brand_mismatch: mismatch },
            breakdown: fused.breakdown,
            errors,
        };

        self.cache.store(fp, payload.clone());
        AnalysisOutcome { cached: false, payload }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::engine::normalize::UpstreamJudgment;
    use crate::engine::retry::RetryPolicy;
    use crate::error::UpstreamError;
    use crate::events::{Decision, Logo, VisionSignal};
    use crate::workers::judgment::RecordedJudgment;
    use crate::workers::vision::RecordedVision;

    /// Vision client that counts how often it is reached.
    struct CountingVision {
        inner: RecordedVision,
        calls: AtomicUsize,
    }

    impl VisionClient for CountingVision {
        async fn analyze(&self, image: &[u8]) -> Result<VisionSignal, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.analyze(image).await
        }
    }

    fn pipeline() -> Pipeline {
        let config = AppConfig { retry: RetryPolicy { attempts: 2, delay_ms: 0 }, ..AppConfig::default() };
        Pipeline::new(Arc::new(config), Arc::new(FingerprintCache::default()))
    }

    fn paypal_vision() -> VisionSignal {
        VisionSignal {
            logos: vec![Logo { description: "PayPal".into(), score: 0.95 }],
            text:  "PayPal Log in".into(),
            error: None,
        }
    }

    fn paypal_judgment() -> UpstreamJudgment {
        UpstreamJudgment::Text(
            r#"{"likelihood": 85, "suspected_brand": "PayPal", "explanation": "Clone of PayPal login page."}"#.into(),
        )
    }

    fn phishing_request() -> AnalysisRequest {
        AnalysisRequest::new("http://paypal-security-update.fake-domain.com")
            .with_image(b"\x89PNG fake screenshot bytes".to_vec())
    }

    #[tokio::test]
    async fn phishing_page_is_a_clone() {
        let p = pipeline();
        let out = p.analyze(
            &phishing_request(),
            &RecordedVision::new(Ok(paypal_vision())),
            &RecordedJudgment::single(Ok(paypal_judgment())),
        ).await;

        assert!(!out.cached);
        let r = &out.payload;
        assert_eq!(r.decision, Decision::Clone);
        assert_eq!(r.signals.brand_mismatch.brand, "PayPal");
        assert_eq!(r.signals.brand_mismatch.registered_domain, "fake-domain.com");
        assert_eq!(r.signals.brand_mismatch.score, 100.0);
        assert_eq!(r.explanation, "Clone of PayPal login page.");
        assert_eq!(r.advice, Decision::Clone.advice());
        assert!(r.errors.is_empty());

        // weights 0.2/0.4/0.4 with the logo bonus: 0.2/0.5/0.4 over 1.1
        assert_eq!(r.score, 86.4);
        assert_eq!(r.breakdown.judgment, 30.9);
        assert_eq!(r.breakdown.vision_brand, 45.5);
        assert_eq!(r.breakdown.heuristics, 10.0);
    }

    #[tokio::test]
    async fn second_identical_request_is_served_from_cache() {
        let p = pipeline();
        let vision = CountingVision {
            inner: RecordedVision::new(Ok(paypal_vision())),
            calls: AtomicUsize::new(0),
        };
        let judgment = RecordedJudgment::single(Ok(paypal_judgment()));

        let first  = p.analyze(&phishing_request(), &vision, &judgment).await;
        let second = p.analyze(&phishing_request(), &vision, &judgment).await;

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(
            serde_json::to_string(&first.payload).unwrap(),
            serde_json::to_string(&second.payload).unwrap(),
        );
        assert_eq!(vision.calls.load(Ordering::SeqCst), 1);
        assert_eq!(judgment.calls(), 1);
        assert_eq!(p.cache().len(), 1);
    }

    #[tokio::test]
    async fn same_url_with_different_image_is_recomputed() {
        let p = pipeline();
        let vision   = RecordedVision::new(Ok(paypal_vision()));
        let judgment = RecordedJudgment::single(Ok(paypal_judgment()));

        p.analyze(&phishing_request(), &vision, &judgment).await;
        let other = AnalysisRequest::new("http://paypal-security-update.fake-domain.com")
            .with_image(b"another screenshot".to_vec());
        let out = p.analyze(&other, &vision, &judgment).await;

        assert!(!out.cached);
        assert_eq!(judgment.calls(), 2);
    }

    #[tokio::test]
    async fn no_image_skips_collaborators() {
        let p = pipeline();
        let vision = CountingVision {
            inner: RecordedVision::new(Ok(paypal_vision())),
            calls: AtomicUsize::new(0),
        };
        let judgment = RecordedJudgment::single(Ok(paypal_judgment()));

        let out = p.analyze(&AnalysisRequest::new("https://example.com/"), &vision, &judgment).await;

        assert_eq!(vision.calls.load(Ordering::SeqCst), 0);
        assert_eq!(judgment.calls(), 0);
        let r = out.payload;
        assert_eq!(r.signals.vision, VisionSignal::default());
        assert_eq!(r.signals.judgment.likelihood, 50);
        assert_eq!(r.signals.brand_mismatch.score, 0.0);
        // only the default judgment contributes: 0.4 × 50
        assert_eq!(r.score, 20.0);
        assert_eq!(r.decision, Decision::Clean);
    }

    #[tokio::test]
    async fn vision_failure_is_recorded_not_fatal() {
        let p = pipeline();
        let vision = CountingVision {
            inner: RecordedVision::new(Err(UpstreamError::Rejected("image too large".into()))),
            calls: AtomicUsize::new(0),
        };
        let out = p.analyze(
            &phishing_request(),
            &vision,
            &RecordedJudgment::single(Ok(paypal_judgment())),
        ).await;

        // vision is never retried
        assert_eq!(vision.calls.load(Ordering::SeqCst), 1);
        let r = out.payload;
        assert_eq!(r.errors.get("vision").map(String::as_str),
                   Some("vision_failed: upstream rejected request: image too large"));
        assert_eq!(r.signals.vision.error, None);
        assert!(r.signals.vision.logos.is_empty());
        // brand still comes from the judgment
        assert_eq!(r.signals.brand_mismatch.score, 100.0);
        assert_eq!(r.decision, Decision::Clone);
    }

    #[tokio::test]
    async fn exhausted_judgment_falls_back_to_default() {
        let p = pipeline();
        let judgment = RecordedJudgment::single(Err(UpstreamError::Timeout(30_000)));
        let out = p.analyze(
            &phishing_request(),
            &RecordedVision::new(Ok(paypal_vision())),
            &judgment,
        ).await;

        assert_eq!(judgment.calls(), 2);
        let r = out.payload;
        assert_eq!(r.signals.judgment.likelihood, 50);
        assert_eq!(r.signals.judgment.suspected_brand, "");
        assert!(r.errors["judgment"].starts_with("judgment_failed: "));
        assert!(r.explanation.starts_with("judgment_failed: "));
        // brand falls back to the top logo
        assert_eq!(r.signals.brand_mismatch.brand, "PayPal");
        assert_eq!(r.signals.brand_mismatch.score, 100.0);
    }

    #[tokio::test]
    async fn legitimate_domain_has_no_mismatch() {
        let p = pipeline();
        let req = AnalysisRequest::new("https://www.paypal.com/signin").with_image(b"png".to_vec());
        let judgment = RecordedJudgment::single(Ok(UpstreamJudgment::Text(
            r#"{"likelihood": 5, "suspected_brand": "PayPal", "explanation": "Official PayPal sign-in."}"#.into(),
        )));
        let out = p.analyze(&req, &RecordedVision::new(Ok(paypal_vision())), &judgment).await;

        let r = out.payload;
        assert_eq!(r.signals.brand_mismatch.registered_domain, "paypal.com");
        assert_eq!(r.signals.brand_mismatch.score, 0.0);
        assert_eq!(r.decision, Decision::Clean);
    }
}
