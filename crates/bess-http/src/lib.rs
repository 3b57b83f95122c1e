//! Single chokepoint for all outbound HTTP in the crawler: fixed User-Agent,
//! robots.txt-aware, rate-limited, disk-cached, retried, and SSL-fallback-aware.

pub mod cache;
pub mod client;
pub mod error;
pub mod rate_limit;
pub mod robots;
pub mod ssl;

pub use client::{ClientConfig, FetchedResponse, HttpClient, USER_AGENT};
pub use error::{HttpError, Result};
pub use ssl::default_insecure_allowlist;
