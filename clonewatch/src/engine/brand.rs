// clonewatch/src/engine/brand.rs
//
// Brand resolution + domain mismatch scoring.
//
// The claimed brand comes from the judgment signal when it names one, else
// from the best vision logo. It is resolved against the registry by
// case-insensitive substring: the first registered name contained in the
// claim wins, in registry order.
//
// Mismatch score (0–100):
//   no claimed brand                         →   0
//   claimed brand, registered domain allowed →   0
//   claimed brand not in registry            →  70
//   claimed brand, domain not allowed        → 100

use serde::{Deserialize, Serialize};

use crate::events::{BrandMismatch, HeuristicSignal, JudgmentSignal, VisionSignal};

pub const UNRESOLVED_BRAND_SCORE: f64 = 70.0;
pub const MISMATCH_SCORE:         f64 = 100.0;

// ── Registry ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub name:    String,
    #[serde(default)]
    pub domains: Vec<String>,
}

impl Brand {
    pub fn new(name: &str, domains: &[&str]) -> Self {
        Self {
            name:    name.to_string(),
            domains: domains.iter().map(|d| d.to_string()).collect(),
        }
    }
}

/// Known brands and the domains they legitimately serve from. Read-only
/// after load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrandRegistry {
    brands: Vec<Brand>,
}

impl BrandRegistry {
    /// Builds a registry with domains lower-cased, `www.` stripped and
    /// de-duplicated. Brand order is preserved.
    pub fn new(brands: Vec<Brand>) -> Self {
        let brands = brands.into_iter().map(|b| {
            let mut domains: Vec<String> = Vec::with_capacity(b.domains.len());
            for d in b.domains.iter().map(|d| normalize_domain(d)) {
                if !d.is_empty() && !domains.contains(&d) {
                    domains.push(d);
                }
            }
            Brand { name: b.name.trim().to_string(), domains }
        }).collect();
        Self { brands }
    }

    pub fn brands(&self) -> &[Brand] {
        &self.brands
    }

    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
    }

    /// First brand whose name occurs in `candidate`, ignoring case.
    pub fn resolve(&self, candidate: &str) -> Option<&Brand> {
        let candidate = candidate.to_lowercase();
        if candidate.trim().is_empty() { return None; }
        self.brands.iter()
            .filter(|b| !b.name.is_empty())
            .find(|b| candidate.contains(&b.name.to_lowercase()))
    }

    /// Authorized domains for `candidate`; empty when unresolved.
    pub fn authorized_domains(&self, candidate: &str) -> Vec<String> {
        self.resolve(candidate).map(|b| b.domains.clone()).unwrap_or_default()
    }
}

pub fn normalize_domain(domain: &str) -> String {
    let d = domain.trim().trim_end_matches('.').to_lowercase();
    d.strip_prefix("www.").map(str::to_string).unwrap_or(d)
}

// ── Claimed brand ─────────────────────────────────────────────────────────────

/// Judgment's suspected brand, else the top vision logo's description. A top
/// logo without a description means no claimed brand.
pub fn claimed_brand(judgment: &JudgmentSignal, vision: &VisionSignal) -> String {
    let suspected = judgment.suspected_brand.trim();
    if !suspected.is_empty() {
        return suspected.to_string();
    }
    vision.top_logo().map(|l| l.description.trim().to_string()).unwrap_or_default()
}

// ── Mismatch ──────────────────────────────────────────────────────────────────

/// True when `registered` equals or is a subdomain of any authorized domain.
pub fn domain_authorized(registered: &str, authorized: &[String]) -> bool {
    let reg = normalize_domain(registered);
    if reg.is_empty() { return false; }
    authorized.iter().any(|a| {
        let a = normalize_domain(a);
        !a.is_empty() && (reg == a || reg.ends_with(&format!(".{a}")))
    })
}

pub fn mismatch_score(brand: &str, registered: &str, authorized: &[String]) -> f64 {
    if brand.trim().is_empty() {
        return 0.0;
    }
    if authorized.is_empty() {
        return UNRESOLVED_BRAND_SCORE;
    }
    if domain_authorized(registered, authorized) { 0.0 } else { MISMATCH_SCORE }
}

/// Resolve the claimed brand and score it against the page's domain.
pub fn assess(
    registry:   &BrandRegistry,
    judgment:   &JudgmentSignal,
    vision:     &VisionSignal,
    heuristics: &HeuristicSignal,
) -> BrandMismatch {
    let brand    = claimed_brand(judgment, vision);
    let allowed  = registry.authorized_domains(&brand);
    let score    = mismatch_score(&brand, &heuristics.registered_domain, &allowed);
    BrandMismatch {
        brand,
        allowed_domains:   allowed,
        registered_domain: heuristics.registered_domain.clone(),
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Logo;

    fn registry() -> BrandRegistry {
        BrandRegistry::new(vec![
            Brand::new("PayPal", &["paypal.com", "WWW.PayPal.me", "paypal.com"]),
            Brand::new("Pay", &["pay.example"]),
            Brand::new("Google", &["google.com", "youtube.com"]),
        ])
    }

    fn domains(ds: &[&str]) -> Vec<String> {
        ds.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn registry_normalizes_domains() {
        let r = registry();
        assert_eq!(r.brands()[0].domains, domains(&["paypal.com", "paypal.me"]));
    }

    #[test]
    fn resolve_is_case_insensitive_substring() {
        let r = registry();
        assert_eq!(r.resolve("PAYPAL Holdings").map(|b| b.name.as_str()), Some("PayPal"));
        assert_eq!(r.resolve("google workspace").map(|b| b.name.as_str()), Some("Google"));
        assert!(r.resolve("Acme Bank").is_none());
        assert!(r.resolve("").is_none());
    }

    #[test]
    fn resolve_takes_first_registry_match_not_best() {
        let r = BrandRegistry::new(vec![
            Brand::new("Pay", &["pay.example"]),
            Brand::new("PayPal", &["paypal.com"]),
        ]);
        assert_eq!(r.resolve("PayPal").map(|b| b.name.as_str()), Some("Pay"));
    }

    #[test]
    fn claimed_brand_prefers_judgment_then_top_logo() {
        let vision = VisionSignal {
            logos: vec![
                Logo { description: "Visa".into(), score: 0.5 },
                Logo { description: "Google".into(), score: 0.8 },
            ],
            ..VisionSignal::default()
        };
        let named = JudgmentSignal { suspected_brand: "PayPal".into(), ..JudgmentSignal::default() };
        assert_eq!(claimed_brand(&named, &vision), "PayPal");
        assert_eq!(claimed_brand(&JudgmentSignal::default(), &vision), "Google");
        assert_eq!(claimed_brand(&JudgmentSignal::default(), &VisionSignal::default()), "");
    }

    #[test]
    fn blank_top_logo_is_not_replaced_by_a_weaker_one() {
        let vision = VisionSignal {
            logos: vec![
                Logo { description: "".into(), score: 0.99 },
                Logo { description: "PayPal".into(), score: 0.2 },
            ],
            ..VisionSignal::default()
        };
        assert_eq!(claimed_brand(&JudgmentSignal::default(), &vision), "");
        let registry = BrandRegistry::new(vec![Brand::new("PayPal", &["paypal.com"])]);
        let page = HeuristicSignal { registered_domain: "evil.test".into(), ..HeuristicSignal::default() };
        let m = assess(&registry, &JudgmentSignal::default(), &vision, &page);
        assert_eq!(m.brand, "");
        assert_eq!(m.score, 0.0);
    }

    #[test]
    fn empty_brand_scores_zero_regardless_of_domain() {
        assert_eq!(mismatch_score("", "evil.test", &domains(&["paypal.com"])), 0.0);
        assert_eq!(mismatch_score("", "", &[]), 0.0);
        assert_eq!(mismatch_score("  ", "paypal.com", &[]), 0.0);
    }

    #[test]
    fn unresolved_brand_scores_elevated() {
        assert_eq!(mismatch_score("Acme Bank", "acme-login.test", &[]), UNRESOLVED_BRAND_SCORE);
    }

    #[test]
    fn authorized_domain_and_subdomains_score_zero() {
        let allowed = domains(&["paypal.com"]);
        assert_eq!(mismatch_score("PayPal", "paypal.com", &allowed), 0.0);
        assert_eq!(mismatch_score("PayPal", "www.paypal.com", &allowed), 0.0);
        assert_eq!(mismatch_score("PayPal", "checkout.paypal.com", &allowed), 0.0);
    }

    #[test]
    fn foreign_domain_scores_full_mismatch() {
        let allowed = domains(&["paypal.com"]);
        assert_eq!(mismatch_score("PayPal", "fake-domain.com", &allowed), MISMATCH_SCORE);
        assert_eq!(mismatch_score("PayPal", "notpaypal.com", &allowed), MISMATCH_SCORE);
        assert_eq!(mismatch_score("PayPal", "", &allowed), MISMATCH_SCORE);
    }

    #[test]
    fn assess_keeps_unresolved_brand_for_display() {
        let heur = HeuristicSignal { registered_domain: "acme-login.test".into(), ..Default::default() };
        let judgment = JudgmentSignal { suspected_brand: "Acme Bank".into(), ..Default::default() };
        let m = assess(&registry(), &judgment, &VisionSignal::default(), &heur);
        assert_eq!(m.brand, "Acme Bank");
        assert!(m.allowed_domains.is_empty());
        assert_eq!(m.registered_domain, "acme-login.test");
        assert_eq!(m.score, UNRESOLVED_BRAND_SCORE);
    }
}
