//! SSL-fallback policy: the insecure-verification allowlist retry, and the
//! RIS-only HTTPS→HTTP downgrade fallback, each gated by configuration and
//! each counted so operators can see how often the escape hatches fire.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// RIS response markers that must appear in a downgraded-HTTP body before it's
/// accepted as a legitimate substitute for the HTTPS response that failed.
pub const RIS_MARKERS: &[&str] = &["sitzung", "gremium", "tagesordnung", "sessionnet", "ratsinformationssystem", "vorlage"];

pub fn default_insecure_allowlist() -> HashSet<String> {
    let mut set = HashSet::new();
    set.insert("ssl.ratsinfo-online.net".to_string());
    set
}

/// Returns true iff the downgraded-HTTP body contains at least one RIS marker
/// (case-insensitive, substring match against lowercased body).
pub fn body_has_ris_marker(body: &str) -> bool {
    let lower = body.to_lowercase();
    RIS_MARKERS.iter().any(|marker| lower.contains(marker))
}

#[derive(Debug, Default)]
pub struct SslCounters {
    pub ssl_errors_total: AtomicU64,
    pub ssl_fallback_used_total: AtomicU64,
    pub http_fallback_used_total: AtomicU64,
}

impl SslCounters {
    pub fn record_ssl_error(&self) {
        self.ssl_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ssl_fallback(&self) {
        self.ssl_fallback_used_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_http_fallback(&self) {
        self.http_fallback_used_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.ssl_errors_total.load(Ordering::Relaxed),
            self.ssl_fallback_used_total.load(Ordering::Relaxed),
            self.http_fallback_used_total.load(Ordering::Relaxed),
        )
    }
}

/// Process-wide SSL policy: the allowlist of hosts permitted to retry with
/// verification disabled, whether the RIS HTTP downgrade fallback is enabled,
/// and the counters above.
pub struct SslPolicy {
    insecure_allowlist: HashSet<String>,
    allow_http_fallback: bool,
    pub counters: SslCounters,
}

impl SslPolicy {
    pub fn new(insecure_allowlist: HashSet<String>, allow_http_fallback: bool) -> Self {
        Self {
            insecure_allowlist,
            allow_http_fallback,
            counters: SslCounters::default(),
        }
    }

    pub fn host_is_allowlisted(&self, host: &str) -> bool {
        self.insecure_allowlist.contains(host)
    }

    pub fn http_fallback_enabled(&self) -> bool {
        self.allow_http_fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allowlist_seeds_ratsinfo_online() {
        let allowlist = default_insecure_allowlist();
        assert!(allowlist.contains("ssl.ratsinfo-online.net"));
    }

    #[test]
    fn body_marker_detection_is_case_insensitive() {
        assert!(body_has_ris_marker("Die TAGESORDNUNG der naechsten Sitzung"));
        assert!(!body_has_ris_marker("Eine ganz andere Webseite ueber Wetter"));
    }

    #[test]
    fn policy_gates_on_allowlist_and_fallback_flag() {
        let mut allowlist = HashSet::new();
        allowlist.insert("ssl.ratsinfo-online.net".to_string());
        let policy = SslPolicy::new(allowlist, true);

        assert!(policy.host_is_allowlisted("ssl.ratsinfo-online.net"));
        assert!(!policy.host_is_allowlisted("other.example.de"));
        assert!(policy.http_fallback_enabled());
    }

    #[test]
    fn counters_accumulate_independently() {
        let counters = SslCounters::default();
        counters.record_ssl_error();
        counters.record_ssl_error();
        counters.record_ssl_fallback();
        counters.record_http_fallback();
        assert_eq!(counters.snapshot(), (2, 1, 1));
    }
}
