//! Shared diagnostics shape emitted by every discovery adapter. Adapters never
//! throw silently — every failure is caught, classified, and folded into one
//! of these.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use bess_core::model::DiscoveryDiagnostics as ModelDiagnostics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    SiteDriven,
    PatternGuessing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    Found,
    NoSeedUrl,
    AllUrls404,
    SslBlocked,
    NoMarkersFound,
    FoundButEmpty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    pub method: DiscoveryMethod,
    pub attempted_urls: Vec<String>,
    pub failed_urls: HashMap<String, String>,
    pub reason_code: ReasonCode,
}

impl Diagnostics {
    pub fn new(method: DiscoveryMethod) -> Self {
        Self {
            method,
            attempted_urls: Vec::new(),
            failed_urls: HashMap::new(),
            reason_code: ReasonCode::NoSeedUrl,
        }
    }

    pub fn attempt(&mut self, url: impl Into<String>) {
        self.attempted_urls.push(url.into());
    }

    pub fn fail(&mut self, url: impl Into<String>, reason: impl Into<String>) {
        self.failed_urls.insert(url.into(), reason.into());
    }

    /// Infers a `reason_code` from the outcome so far, unless one was already
    /// explicitly set to something other than the default. Call once an
    /// adapter has finished attempting all its URLs.
    pub fn conclude(&mut self, items_found: usize) {
        self.reason_code = if self.attempted_urls.is_empty() {
            ReasonCode::NoSeedUrl
        } else if !self.failed_urls.is_empty() && self.failed_urls.len() == self.attempted_urls.len() {
            ReasonCode::AllUrls404
        } else if items_found == 0 {
            ReasonCode::NoMarkersFound
        } else {
            ReasonCode::Found
        };
    }

    fn as_plain_string<T: Serialize>(value: &T) -> String {
        match serde_json::to_value(value) {
            Ok(serde_json::Value::String(s)) => s,
            _ => "unknown".to_string(),
        }
    }

    /// Flattens into the plain-string shape `CrawlStats` persists, since the
    /// storage layer doesn't need the enum's compile-time guarantees once the
    /// diagnostics are about to be written down.
    pub fn to_model(&self) -> ModelDiagnostics {
        ModelDiagnostics {
            method: Self::as_plain_string(&self.method),
            attempted_urls: self.attempted_urls.clone(),
            failed_urls: self.failed_urls.clone(),
            reason_code: Self::as_plain_string(&self.reason_code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conclude_defaults_to_no_seed_url_when_nothing_attempted() {
        let mut d = Diagnostics::new(DiscoveryMethod::SiteDriven);
        d.conclude(0);
        assert_eq!(d.reason_code, ReasonCode::NoSeedUrl);
    }

    #[test]
    fn conclude_flags_all_urls_404() {
        let mut d = Diagnostics::new(DiscoveryMethod::SiteDriven);
        d.attempt("https://example.de/a");
        d.fail("https://example.de/a", "404");
        d.conclude(0);
        assert_eq!(d.reason_code, ReasonCode::AllUrls404);
    }

    #[test]
    fn conclude_reports_found_when_items_present() {
        let mut d = Diagnostics::new(DiscoveryMethod::SiteDriven);
        d.attempt("https://example.de/a");
        d.conclude(3);
        assert_eq!(d.reason_code, ReasonCode::Found);
    }
}
