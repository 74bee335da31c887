// clonewatch/src/workers/vision.rs
//
// Vision worker: logos + OCR text from the page image.
// Single attempt. A failed call degrades to an empty signal carrying the
// error string; it never fails the analysis.

use std::future::Future;

use tracing::warn;

use crate::error::UpstreamError;
use crate::events::VisionSignal;

/// External image analysis service.
pub trait VisionClient: Send + Sync {
    fn analyze(&self, image: &[u8]) -> impl Future<Output = Result<VisionSignal, UpstreamError>> + Send;
}

pub async fn gather<V: VisionClient>(client: &V, image: Option<&[u8]>) -> VisionSignal {
    let Some(image) = image else {
        return VisionSignal::default();
    };
    match client.analyze(image).await {
        Ok(signal) => signal,
        Err(e) => {
            warn!(error = %e, "vision call failed, continuing without it");
            VisionSignal::degraded(format!("vision_failed: {e}"))
        }
    }
}

/// Replays a captured vision response.
#[derive(Debug, Clone)]
pub struct RecordedVision {
    response: Result<VisionSignal, UpstreamError>,
}

impl RecordedVision {
    pub fn new(response: Result<VisionSignal, UpstreamError>) -> Self {
        Self { response }
    }
}

impl VisionClient for RecordedVision {
    async fn analyze(&self, _image: &[u8]) -> Result<VisionSignal, UpstreamError> {
        self.response.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Logo;

    fn paypal() -> VisionSignal {
        VisionSignal {
            logos: vec![Logo { description: "PayPal".into(), score: 0.95 }],
            text:  "Log in to your PayPal account".into(),
            error: None,
        }
    }

    #[tokio::test]
    async fn no_image_means_empty_signal_without_calling() {
        let client = RecordedVision::new(Ok(paypal()));
        assert_eq!(gather(&client, None).await, VisionSignal::default());
    }

    #[tokio::test]
    async fn success_passes_through() {
        let client = RecordedVision::new(Ok(paypal()));
        assert_eq!(gather(&client, Some(&b"png"[..])).await, paypal());
    }

    #[tokio::test]
    async fn failure_degrades_to_empty_with_error() {
        let client = RecordedVision::new(Err(UpstreamError::Unavailable("quota".into())));
        let v = gather(&client, Some(&b"png"[..])).await;
        assert!(v.logos.is_empty());
        assert!(v.text.is_empty());
        assert_eq!(v.error.as_deref(), Some("vision_failed: upstream unavailable: quota"));
    }
}
