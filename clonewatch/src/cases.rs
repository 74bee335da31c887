// clonewatch/src/cases.rs
//
// Captured analysis cases for `replay`. One JSON object per line:
//
//   {
//     "url":            "http://paypal-security-update.fake-domain.com",
//     "image_path":     "shots/paypal.png",      // relative to the case file
//     "image_hex":      "89504e47...",           // alternative to image_path
//     "title":          "Log in to your account",
//     "page_text":      "...",
//     "vision":         { "logos": [{ "description": "PayPal", "score": 0.95 }], "text": "" },
//     "vision_error":   "quota exceeded",
//     "judgment":       "```json {\"likelihood\": 85} ```",   // or an object
//     "judgment_error": "deadline exceeded",
//     "expected":       "clone"
//   }
//
// Everything but `url` is optional. The recorded collaborator outputs stand
// in for the live services.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::engine::normalize::UpstreamJudgment;
use crate::error::{CaseError, UpstreamError};
use crate::events::{AnalysisRequest, Decision, VisionSignal};
use crate::workers::judgment::RecordedJudgment;
use crate::workers::vision::RecordedVision;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Case {
    /// 1-based line in the case file.
    #[serde(skip)]
    pub line:           usize,
    pub url:            String,
    #[serde(default)]
    pub image_path:     Option<PathBuf>,
    #[serde(default)]
    pub image_hex:      Option<String>,
    #[serde(default)]
    pub title:          String,
    #[serde(default)]
    pub page_text:      String,
    #[serde(default)]
    pub vision:         Option<VisionSignal>,
    #[serde(default)]
    pub vision_error:   Option<String>,
    #[serde(default)]
    pub judgment:       Option<Value>,
    #[serde(default)]
    pub judgment_error: Option<String>,
    #[serde(default)]
    pub expected:       Option<Decision>,
}

impl Case {
    /// Build the request, reading the image relative to `base` if needed.
    pub async fn request(&self, base: &Path) -> Result<AnalysisRequest, CaseError> {
        let mut req = AnalysisRequest::new(self.url.clone())
            .with_title(self.title.clone())
            .with_page_text(&self.page_text);

        if let Some(hex_image) = &self.image_hex {
            let bytes = hex::decode(hex_image.trim())
                .map_err(|source| CaseError::ImageHex { line: self.line, source })?;
            req = req.with_image(bytes);
        } else if let Some(rel) = &self.image_path {
            let path = base.join(rel);
            let bytes = tokio::fs::read(&path).await
                .map_err(|source| CaseError::Read { path, source })?;
            req = req.with_image(bytes);
        }
        Ok(req)
    }

    pub fn vision_client(&self) -> RecordedVision {
        match (&self.vision_error, &self.vision) {
            (Some(e), _)    => RecordedVision::new(Err(UpstreamError::Unavailable(e.clone()))),
            (None, Some(v)) => RecordedVision::new(Ok(v.clone())),
            (None, None)    => RecordedVision::new(Ok(VisionSignal::default())),
        }
    }

    /// A recorded error fails every attempt. No judgment at all replays as
    /// an empty reply, which normalizes to the default signal.
    pub fn judgment_client(&self) -> RecordedJudgment {
        if let Some(e) = &self.judgment_error {
            return RecordedJudgment::single(Err(UpstreamError::Unavailable(e.clone())));
        }
        let reply = match &self.judgment {
            Some(Value::String(s)) => UpstreamJudgment::Text(s.clone()),
            Some(v)                => UpstreamJudgment::Structured(v.clone()),
            None                   => UpstreamJudgment::Text(String::new()),
        };
        RecordedJudgment::single(Ok(reply))
    }
}

/// Parse a JSONL case file body. Blank lines and `#` comments are skipped;
/// a malformed line is an error.
pub fn parse_cases(content: &str) -> Result<Vec<Case>, CaseError> {
    let mut cases = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') { continue; }

        let mut case: Case = serde_json::from_str(line)
            .map_err(|source| CaseError::Parse { line: line_no, source })?;
        case.line = line_no;
        if case.url.trim().is_empty() {
            warn!(line = line_no, "case has an empty url");
        }
        cases.push(case);
    }
    Ok(cases)
}

pub async fn load_cases(path: &Path) -> Result<Vec<Case>, CaseError> {
    let content = tokio::fs::read_to_string(path).await
        .map_err(|source| CaseError::Read { path: path.to_path_buf(), source })?;
    let cases = parse_cases(&content)?;
    info!(path = %path.display(), cases = cases.len(), "cases loaded");
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::brand::BrandRegistry;
    use crate::engine::retry::RetryPolicy;
    use crate::workers::judgment::{gather, JudgmentContext, JudgmentOutcome};

    const FILE: &str = r#"
# captured 2024-05-02
{"url": "http://paypal-security-update.fake-domain.com", "image_hex": "89504e47", "vision": {"logos": [{"description": "PayPal", "score": 0.95}]}, "judgment": {"likelihood": 85, "suspected_brand": "PayPal"}, "expected": "clone"}

{"url": "https://example.com", "judgment_error": "deadline exceeded"}
"#;

    #[test]
    fn parses_cases_and_tracks_line_numbers() {
        let cases = parse_cases(FILE).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].line, 3);
        assert_eq!(cases[0].expected, Some(Decision::Clone));
        assert_eq!(cases[1].line, 5);
        assert_eq!(cases[1].expected, None);
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let err = parse_cases("{\"url\": \"a\"}\n{not json").unwrap_err();
        assert!(matches!(err, CaseError::Parse { line: 2, .. }));
    }

    #[tokio::test]
    async fn hex_image_is_decoded() {
        let cases = parse_cases(FILE).unwrap();
        let req = cases[0].request(Path::new(".")).await.unwrap();
        assert_eq!(req.image_bytes(), Some(&[0x89, 0x50, 0x4e, 0x47][..]));
        assert_eq!(cases[1].request(Path::new(".")).await.unwrap().image_bytes(), None);
    }

    #[tokio::test]
    async fn bad_hex_is_an_error() {
        let case = Case { line: 7, url: "u".into(), image_hex: Some("zz".into()), ..Case::default() };
        let err = case.request(Path::new(".")).await.unwrap_err();
        assert!(matches!(err, CaseError::ImageHex { line: 7, .. }));
    }

    #[tokio::test]
    async fn missing_image_file_is_a_read_error() {
        let case = Case {
            url:        "u".into(),
            image_path: Some("does-not-exist.png".into()),
            ..Case::default()
        };
        let err = case.request(Path::new("/nonexistent")).await.unwrap_err();
        assert!(matches!(err, CaseError::Read { .. }));
    }

    #[tokio::test]
    async fn recorded_judgment_error_fails_every_attempt() {
        let cases = parse_cases(FILE).unwrap();
        let client = cases[1].judgment_client();
        let brands = BrandRegistry::default();
        let ctx = JudgmentContext::new(b"img", "u", "", "", &brands);
        let policy = RetryPolicy { attempts: 2, delay_ms: 0 };
        let JudgmentOutcome { error, .. } = gather(&client, Some(ctx), policy).await;
        assert_eq!(error.as_deref(), Some("judgment_failed: upstream unavailable: deadline exceeded"));
        assert_eq!(client.calls(), 2);
    }
}
