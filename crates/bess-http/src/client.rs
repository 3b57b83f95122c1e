//! The single chokepoint for all outbound requests: fixed User-Agent, cached,
//! robots-aware, rate-limited, retried with backoff, and SSL-fallback-aware.

use std::time::Duration;

use rand::Rng;
use url::Url;

use crate::cache::{CacheMeta, DiskCache};
use crate::error::{HttpError, Result};
use crate::rate_limit::{ConcurrencyLimiter, HostRateLimiters};
use crate::robots::RobotsCache;
use crate::ssl::SslPolicy;

pub const USER_AGENT: &str = "BESS-Forensic-Crawler/1.0 (Research/Transparency)";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const PDF_SIZE_GUARD_DEFAULT_MB: u64 = 25;

#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub body: Vec<u8>,
    pub status: u16,
    pub from_cache: bool,
    pub used_ssl_fallback: bool,
    pub used_http_fallback: bool,
}

pub struct ClientConfig {
    pub global_concurrency: usize,
    pub per_domain_concurrency: usize,
    pub timeout_s: u64,
    pub retries: u32,
    pub pdf_max_size_mb: u64,
    pub cache_base: std::path::PathBuf,
    pub insecure_ssl_allowlist: std::collections::HashSet<String>,
    pub allow_http_fallback: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            global_concurrency: 100,
            per_domain_concurrency: 2,
            timeout_s: DEFAULT_READ_TIMEOUT.as_secs(),
            retries: MAX_RETRIES,
            pdf_max_size_mb: PDF_SIZE_GUARD_DEFAULT_MB,
            cache_base: std::path::PathBuf::from(".cache/http"),
            insecure_ssl_allowlist: crate::ssl::default_insecure_allowlist(),
            allow_http_fallback: false,
        }
    }
}

/// HTTP chokepoint. One instance is shared (via `Arc`) across every worker in
/// the process; its internal maps are the process-wide shared state described
/// in the concurrency model (robots cache, rate limiter buckets, HTTP cache).
pub struct HttpClient {
    verifying: reqwest::Client,
    insecure: reqwest::Client,
    robots: RobotsCache,
    rate_limiters: HostRateLimiters,
    concurrency: ConcurrencyLimiter,
    cache: DiskCache,
    ssl_policy: SslPolicy,
    retries: u32,
    pdf_max_size_bytes: u64,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Self {
        let verifying = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.timeout_s))
            .build()
            .expect("reqwest client builds with static config");

        let insecure = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.timeout_s))
            .danger_accept_invalid_certs(true)
            .build()
            .expect("reqwest client builds with static config");

        Self {
            verifying,
            insecure,
            robots: RobotsCache::new(),
            rate_limiters: HostRateLimiters::new(Duration::from_secs(1), crate::rate_limit::default_host_overrides()),
            concurrency: ConcurrencyLimiter::new(config.global_concurrency, config.per_domain_concurrency),
            cache: DiskCache::new(config.cache_base),
            ssl_policy: SslPolicy::new(config.insecure_ssl_allowlist, config.allow_http_fallback),
            retries: config.retries,
            pdf_max_size_bytes: config.pdf_max_size_mb * 1024 * 1024,
        }
    }

    pub fn ssl_policy(&self) -> &SslPolicy {
        &self.ssl_policy
    }

    /// HEAD `url` to read `Content-Length`; used as the PDF size guard before
    /// ever issuing the GET. Returns `None` if the server didn't send a length.
    pub async fn head_content_length(&self, url: &str) -> Result<Option<u64>> {
        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let host = parsed.host_str().unwrap_or("").to_string();
        let _permit = self.concurrency.acquire(&host).await;
        self.rate_limiters.until_ready(&host).await;

        let response = self
            .verifying
            .head(url)
            .send()
            .await
            .map_err(|e| HttpError::Network {
                url: url.to_string(),
                attempts: 1,
                source: e,
            })?;
        Ok(response.content_length())
    }

    /// Returns `Ok(true)` iff a PDF at `url` should be skipped under fast-mode's
    /// size guard (only meaningful after a successful HEAD).
    pub async fn pdf_exceeds_size_guard(&self, url: &str) -> Result<bool> {
        match self.head_content_length(url).await? {
            Some(len) => Ok(len > self.pdf_max_size_bytes),
            None => Ok(false),
        }
    }

    /// Fetch `url` through the full chokepoint: robots check, rate limit,
    /// concurrency guard, conditional cache GET, retry-with-backoff, and SSL
    /// fallback policy.
    pub async fn get(&self, url: &str) -> Result<FetchedResponse> {
        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let host = parsed.host_str().unwrap_or("").to_string();
        let origin = format!("{}://{}", parsed.scheme(), host);

        let robots = self.robots.get_or_fetch(&self.verifying, &host, &origin).await;
        if !robots.is_allowed(USER_AGENT, parsed.path()) {
            tracing::info!(url = %url, "ROBOTS_DISALLOW");
            return Err(HttpError::RobotsDisallow { url: url.to_string() });
        }
        if let Some(delay) = robots.crawl_delay(USER_AGENT) {
            self.rate_limiters.set_override(&host, delay).await;
        }

        let cached = self.cache.get(url).await.ok().flatten();

        let _permit = self.concurrency.acquire(&host).await;
        self.rate_limiters.until_ready(&host).await;

        match self.attempt_with_retries(&self.verifying, url, cached.as_ref()).await {
            Ok(response) => Ok(response),
            Err(err) if is_ssl_error(&err) => {
                self.ssl_policy.counters.record_ssl_error();
                self.ssl_fallback(url, &host, &parsed, &err).await
            }
            Err(err) => Err(err),
        }
    }

    async fn ssl_fallback(&self, url: &str, host: &str, parsed: &Url, original: &HttpError) -> Result<FetchedResponse> {
        if self.ssl_policy.host_is_allowlisted(host) {
            if let Ok(mut response) = self.attempt_with_retries(&self.insecure, url, None).await {
                self.ssl_policy.counters.record_ssl_fallback();
                tracing::warn!(url = %url, "SSL_FALLBACK_VERIFY_FALSE");
                response.used_ssl_fallback = true;
                return Ok(response);
            }
        }

        if parsed.scheme() == "https" && self.ssl_policy.http_fallback_enabled() {
            let http_url = format!("http://{}{}", host, &url[url.find(parsed.path()).unwrap_or(0)..]);
            if let Ok(response) = self.attempt_with_retries(&self.verifying, &http_url, None).await {
                if response.status == 200 {
                    let body_text = String::from_utf8_lossy(&response.body);
                    if crate::ssl::body_has_ris_marker(&body_text) {
                        self.ssl_policy.counters.record_http_fallback();
                        tracing::warn!(url = %url, "RIS_HTTP_FALLBACK_USED");
                        let mut response = response;
                        response.used_http_fallback = true;
                        return Ok(response);
                    }
                }
            }
        }

        Err(HttpError::Ssl {
            url: url.to_string(),
            reason: original.to_string(),
        })
    }

    async fn attempt_with_retries(&self, client: &reqwest::Client, url: &str, cached: Option<&crate::cache::CachedResponse>) -> Result<FetchedResponse> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = client.get(url);
            if let Some(cached) = cached {
                if let Some(etag) = &cached.meta.etag {
                    request = request.header(reqwest::header::IF_NONE_MATCH, etag);
                }
                if let Some(last_modified) = &cached.meta.last_modified {
                    request = request.header(reqwest::header::IF_MODIFIED_SINCE, last_modified);
                }
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.as_u16() == 304 {
                        if let Some(cached) = cached {
                            return Ok(FetchedResponse {
                                body: cached.body.clone(),
                                status: 304,
                                from_cache: true,
                                used_ssl_fallback: false,
                                used_http_fallback: false,
                            });
                        }
                    }

                    if status.is_server_error() || status.as_u16() == 408 || status.as_u16() == 429 {
                        if attempt >= self.retries {
                            let source = response.error_for_status().expect_err("status was checked to be an error above");
                            return Err(HttpError::Network {
                                url: url.to_string(),
                                attempts: attempt,
                                source,
                            });
                        }
                        backoff_sleep(attempt).await;
                        continue;
                    }

                    if status.is_client_error() {
                        return Err(HttpError::Http4xx {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }

                    let etag = response.headers().get(reqwest::header::ETAG).and_then(|v| v.to_str().ok()).map(String::from);
                    let last_modified = response
                        .headers()
                        .get(reqwest::header::LAST_MODIFIED)
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    let http_status = status.as_u16();
                    let body = response.bytes().await.map(|b| b.to_vec()).map_err(|e| HttpError::Network {
                        url: url.to_string(),
                        attempts: attempt,
                        source: e,
                    })?;

                    let meta = CacheMeta {
                        url: url.to_string(),
                        etag,
                        last_modified,
                        http_status,
                    };
                    let _ = self.cache.put(url, &body, &meta).await;

                    return Ok(FetchedResponse {
                        body,
                        status: http_status,
                        from_cache: false,
                        used_ssl_fallback: false,
                        used_http_fallback: false,
                    });
                }
                Err(err) => {
                    if err.is_connect() && looks_like_ssl_error(&err) {
                        return Err(HttpError::Ssl {
                            url: url.to_string(),
                            reason: err.to_string(),
                        });
                    }
                    if attempt >= self.retries {
                        return Err(HttpError::Network {
                            url: url.to_string(),
                            attempts: attempt,
                            source: err,
                        });
                    }
                    backoff_sleep(attempt).await;
                }
            }
        }
    }
}

fn looks_like_ssl_error(err: &reqwest::Error) -> bool {
    let text = err.to_string().to_lowercase();
    text.contains("certificate") || text.contains("ssl") || text.contains("tls")
}

fn is_ssl_error(err: &HttpError) -> bool {
    matches!(err, HttpError::Ssl { .. })
}

async fn backoff_sleep(attempt: u32) {
    let base_ms = 200u64 * 2u64.pow(attempt.saturating_sub(1));
    let jitter_ms: u64 = rand::thread_rng().gen_range(0..100);
    tokio::time::sleep(Duration::from_millis(base_ms + jitter_ms)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_is_fixed() {
        assert_eq!(USER_AGENT, "BESS-Forensic-Crawler/1.0 (Research/Transparency)");
    }

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.global_concurrency, 100);
        assert_eq!(config.per_domain_concurrency, 2);
        assert_eq!(config.pdf_max_size_mb, 25);
        assert!(!config.allow_http_fallback);
    }
}
