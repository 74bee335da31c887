// clonewatch/src/workers/heuristics.rs
//
// URL / domain heuristics worker.
// Additive risk points, capped at 100. Each hit leaves a flag so the
// result explains where the number came from.
//
// Host-level checks run on the URL alone; the lure check scans extracted page
// text with an Aho-Corasick automaton (one pass regardless of pattern count).
// Brand names from the registry are matched as whole labels against the part
// of the host that is NOT the registered domain (paypal.evil.test) and
// against registered domains that embed a brand without being one of its own
// (paypal-login.test). Hosts under a registry brand's own domain skip the
// brand and security-word checks.

use std::net::IpAddr;
use std::sync::OnceLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use tracing::debug;

use crate::engine::brand::{domain_authorized, normalize_domain, BrandRegistry};
use crate::events::HeuristicSignal;

static LURE_AC: OnceLock<Option<(AhoCorasick, Vec<&'static str>)>> = OnceLock::new();

// Second-level labels under which registrations happen one level deeper
const MULTI_PART_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "me.uk",
    "com.au", "net.au", "org.au",
    "co.jp", "ne.jp", "or.jp",
    "co.in", "net.in", "org.in",
    "com.br", "com.cn", "com.mx", "com.tr", "com.sg", "com.hk",
    "co.nz", "co.za", "co.kr",
];

const SUSPICIOUS_TLDS: &[&str] = &[
    "zip", "mov", "xyz", "top", "tk", "ml", "ga", "cf", "gq",
    "work", "click", "link", "rest", "country", "support", "icu",
];

const HOST_SECURITY_WORDS: &[&str] = &[
    "secure", "login", "signin", "verify", "update", "account", "banking", "webscr", "auth",
];

// Pattern → label pairs scanned in page text
const LURE_PATTERNS: &[(&str, &str)] = &[
    ("verify your account", "verify_account"),
    ("verify your identity", "verify_identity"),
    ("confirm your identity", "verify_identity"),
    ("account has been suspended", "account_suspended"),
    ("account will be suspended", "account_suspended"),
    ("account has been locked", "account_locked"),
    ("unusual activity", "unusual_activity"),
    ("unusual sign-in", "unusual_activity"),
    ("update your payment", "payment_update"),
    ("update billing", "payment_update"),
    ("enter your password", "credential_prompt"),
    ("re-enter your password", "credential_prompt"),
    ("social security number", "sensitive_data"),
    ("card verification", "sensitive_data"),
    ("within 24 hours", "urgency"),
    ("immediately", "urgency"),
];

const IP_HOST_POINTS:         f64 = 30.0;
const USERINFO_POINTS:        f64 = 20.0;
const PLAIN_HTTP_POINTS:      f64 = 10.0;
const PUNYCODE_POINTS:        f64 = 20.0;
const HYPHEN_POINTS:          f64 = 10.0;
const DEEP_SUBDOMAIN_POINTS:  f64 = 10.0;
const SUSPICIOUS_TLD_POINTS:  f64 = 15.0;
const LONG_URL_POINTS:        f64 = 10.0;
const BRAND_SUBDOMAIN_POINTS: f64 = 25.0;
const BRAND_LOOKALIKE_POINTS: f64 = 20.0;
const HOST_WORD_POINTS:       f64 = 10.0;
const LURE_POINTS_EACH:       f64 = 5.0;
const LURE_POINTS_MAX:        f64 = 15.0;

const LONG_URL_CHARS:  usize = 75;
const MAX_HYPHENS:     usize = 2;
const MAX_HOST_LABELS: usize = 4;

fn lure_automaton() -> Option<&'static (AhoCorasick, Vec<&'static str>)> {
    LURE_AC.get_or_init(|| {
        let patterns: Vec<&str> = LURE_PATTERNS.iter().map(|(p, _)| *p).collect();
        let labels:   Vec<&str> = LURE_PATTERNS.iter().map(|(_, l)| *l).collect();
        AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostFirst)
            .build(&patterns)
            .ok()
            .map(|ac| (ac, labels))
    })
    .as_ref()
}

pub struct HeuristicAnalyzer {
    registry: BrandRegistry,
}

impl HeuristicAnalyzer {
    pub fn new(registry: BrandRegistry) -> Self {
        Self { registry }
    }

    pub fn analyze(&self, url: &str, page_text: &str) -> HeuristicSignal {
        let url = url.trim();
        if url.is_empty() {
            return HeuristicSignal::default();
        }

        let parts = UrlParts::parse(url);
        let registered = registered_domain(&parts.host);
        let mut risk  = 0.0f64;
        let mut flags = Vec::new();

        // ── Host shape ────────────────────────────────────────────────────────
        if parts.is_ip() {
            risk += IP_HOST_POINTS;
            flags.push("ip_host".to_string());
        }
        if url.contains('@') {
            risk += USERINFO_POINTS;
            flags.push("at_symbol".to_string());
        }
        if parts.scheme.eq_ignore_ascii_case("http") {
            risk += PLAIN_HTTP_POINTS;
            flags.push("plain_http".to_string());
        }
        if parts.host.split('.').any(|l| l.starts_with("xn--")) {
            risk += PUNYCODE_POINTS;
            flags.push("punycode_host".to_string());
        }
        let hyphens = parts.host.matches('-').count();
        if hyphens > MAX_HYPHENS {
            risk += HYPHEN_POINTS;
            flags.push(format!("hyphenated_host:{hyphens}"));
        }
        let labels = parts.host.split('.').filter(|l| !l.is_empty()).count();
        if !parts.is_ip() && labels > MAX_HOST_LABELS {
            risk += DEEP_SUBDOMAIN_POINTS;
            flags.push(format!("deep_subdomain:{labels}"));
        }
        if let Some(tld) = parts.host.rsplit('.').next() {
            if !parts.is_ip() && SUSPICIOUS_TLDS.contains(&tld) {
                risk += SUSPICIOUS_TLD_POINTS;
                flags.push(format!("suspicious_tld:{tld}"));
            }
        }
        let url_len = url.chars().count();
        if url_len > LONG_URL_CHARS {
            risk += LONG_URL_POINTS;
            flags.push(format!("long_url:{url_len}"));
        }

        // ── Brand names in the wrong place ───────────────────────────────────
        let subdomain = parts.host
            .strip_suffix(registered.as_str())
            .unwrap_or("")
            .trim_end_matches('.');
        let own_domain = self.registry.brands().iter()
            .any(|b| domain_authorized(&registered, &b.domains));
        if !own_domain {
            for brand in self.registry.brands() {
                let name = brand.name.to_lowercase().replace(' ', "");
                if name.is_empty() { continue; }
                if has_label(subdomain, &name) {
                    risk += BRAND_SUBDOMAIN_POINTS;
                    flags.push(format!("brand_in_subdomain:{name}"));
                    break;
                }
                if has_label(&registered, &name) {
                    risk += BRAND_LOOKALIKE_POINTS;
                    flags.push(format!("brand_lookalike_domain:{name}"));
                    break;
                }
            }

            if let Some(word) = HOST_SECURITY_WORDS.iter().find(|w| parts.host.contains(*w)) {
                risk += HOST_WORD_POINTS;
                flags.push(format!("security_word_in_host:{word}"));
            }
        }

        // ── Page text lures ───────────────────────────────────────────────────
        if let Some((ac, lure_labels)) = lure_automaton() {
            let mut hits: Vec<&str> = ac.find_iter(page_text)
                .map(|m| lure_labels[m.pattern().as_usize()])
                .collect();
            hits.sort_unstable();
            hits.dedup();
            if !hits.is_empty() {
                risk += (hits.len() as f64 * LURE_POINTS_EACH).min(LURE_POINTS_MAX);
                flags.extend(hits.iter().map(|h| format!("lure:{h}")));
            }
        }

        let risk = risk.min(100.0);
        debug!(host = %parts.host, registered = %registered, risk, "heuristics");

        HeuristicSignal {
            risk,
            registered_domain: registered,
            host: parts.host,
            flags,
        }
    }
}

// ── URL pieces ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct UrlParts {
    scheme: String,
    host:   String,
}

impl UrlParts {
    fn parse(url: &str) -> Self {
        let (scheme, rest) = match url.find("://") {
            Some(i) => (&url[..i], &url[i + 3..]),
            None    => ("", url),
        };
        let authority = rest.split(|c: char| matches!(c, '/' | '?' | '#')).next().unwrap_or("");
        let host_port = authority.rsplit('@').next().unwrap_or("");

        let host = if let Some(v6) = host_port.strip_prefix('[') {
            v6.split(']').next().unwrap_or("")
        } else {
            host_port.split(':').next().unwrap_or("")
        };

        Self {
            scheme: scheme.to_ascii_lowercase(),
            host:   normalize_domain(host),
        }
    }

    fn is_ip(&self) -> bool {
        self.host.parse::<IpAddr>().is_ok()
    }
}

/// True when `name` is a whole dot- or hyphen-delimited label of `host`.
fn has_label(host: &str, name: &str) -> bool {
    host.split(|c: char| c == '.' || c == '-').any(|l| l == name)
}

/// Registrable part of a host: last two labels, or three under a known
/// multi-part suffix. IP literals are returned as-is.
pub fn registered_domain(host: &str) -> String {
    let host = normalize_domain(host);
    if host.parse::<IpAddr>().is_ok() {
        return host;
    }
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }
    let last_two = labels[labels.len() - 2..].join(".");
    let keep = if MULTI_PART_SUFFIXES.contains(&last_two.as_str()) { 3 } else { 2 };
    labels[labels.len() - keep..].join(".")
}
