//! Environment-variable configuration, loaded once at startup.

use std::collections::HashSet;
use std::path::PathBuf;

use bess_core::model::Mode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub mode: Mode,
    pub global_concurrency: usize,
    pub per_domain_concurrency: usize,
    pub timeout_s: u64,
    pub retries: u32,
    pub pdf_max_size_mb: u64,
    pub cache_base: PathBuf,
    pub text_cache_base: PathBuf,
    pub ssl_insecure_allowlist: HashSet<String>,
    pub allow_http_fallback: bool,
    pub database_url: Option<String>,
}

fn env_var(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env_var(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue { var: name, value: raw }),
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mode = match env_var("CRAWL_MODE").as_deref() {
            None | Some("fast") => Mode::Fast,
            Some("deep") => Mode::Deep,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: "CRAWL_MODE",
                    value: other.to_string(),
                })
            }
        };

        let allow_http_fallback = match env_var("CRAWL_ALLOW_HTTP_FALLBACK").as_deref() {
            None | Some("false") => false,
            Some("true") => true,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: "CRAWL_ALLOW_HTTP_FALLBACK",
                    value: other.to_string(),
                })
            }
        };

        let mut ssl_insecure_allowlist = bess_http::default_insecure_allowlist();
        if let Some(raw) = env_var("CRAWL_SSL_INSECURE_ALLOWLIST") {
            ssl_insecure_allowlist.extend(raw.split(',').map(|h| h.trim().to_string()).filter(|h| !h.is_empty()));
        }

        Ok(Self {
            mode,
            global_concurrency: parse_env("CRAWL_GLOBAL_CONCURRENCY", 100usize)?,
            per_domain_concurrency: parse_env("CRAWL_PER_DOMAIN_CONCURRENCY", 2usize)?,
            timeout_s: parse_env("CRAWL_TIMEOUT_S", 30u64)?,
            retries: parse_env("CRAWL_RETRIES", 3u32)?,
            pdf_max_size_mb: parse_env("CRAWL_PDF_MAX_SIZE_MB", 25u64)?,
            cache_base: env_var("CRAWL_CACHE_BASE").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".cache/http")),
            text_cache_base: env_var("CRAWL_TEXT_CACHE_BASE").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".cache/pdf_text")),
            ssl_insecure_allowlist,
            allow_http_fallback,
            database_url: env_var("DATABASE_URL"),
        })
    }

    pub fn to_client_config(&self) -> bess_http::ClientConfig {
        bess_http::ClientConfig {
            global_concurrency: self.global_concurrency,
            per_domain_concurrency: self.per_domain_concurrency,
            timeout_s: self.timeout_s,
            retries: self.retries,
            pdf_max_size_mb: self.pdf_max_size_mb,
            cache_base: self.cache_base.clone(),
            insecure_ssl_allowlist: self.ssl_insecure_allowlist.clone(),
            allow_http_fallback: self.allow_http_fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_falls_back_to_default_when_unset() {
        std::env::remove_var("CRAWL_RETRIES_TEST_UNUSED");
        let value: u32 = parse_env("CRAWL_RETRIES_TEST_UNUSED", 3).unwrap();
        assert_eq!(value, 3);
    }
}
