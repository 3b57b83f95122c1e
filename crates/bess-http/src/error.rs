//! Typed errors for the HTTP chokepoint.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("robots.txt disallows {url}")]
    RobotsDisallow { url: String },

    #[error("terminal http status {status} for {url}")]
    Http4xx { url: String, status: u16 },

    #[error("network error after {attempts} attempts for {url}: {source}")]
    Network {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("ssl error for {url}: {reason}")]
    Ssl { url: String, reason: String },

    #[error("pdf at {url} exceeds size guard ({bytes} bytes > {limit_bytes} limit)")]
    PdfTooLarge { url: String, bytes: u64, limit_bytes: u64 },

    #[error("cache io error: {0}")]
    CacheIo(#[from] std::io::Error),

    #[error("cache metadata corrupt: {0}")]
    CacheMetadata(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HttpError>;
