//! Disk cache keyed by URL, with an ETag/Last-Modified sidecar so the HTTP
//! client can issue conditional requests and accept `304 Not Modified`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheMeta {
    pub url: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub http_status: u16,
}

#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub body: Vec<u8>,
    pub meta: CacheMeta,
}

/// A write-through disk cache under a single base directory. Readers tolerate
/// concurrent writers; the last writer for a given key wins.
pub struct DiskCache {
    base: PathBuf,
}

impl DiskCache {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn key_for(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn body_path(&self, url: &str) -> PathBuf {
        self.base.join(format!("{}.body", Self::key_for(url)))
    }

    fn meta_path(&self, url: &str) -> PathBuf {
        self.base.join(format!("{}.meta.json", Self::key_for(url)))
    }

    pub async fn get(&self, url: &str) -> Result<Option<CachedResponse>> {
        let meta_path = self.meta_path(url);
        if !tokio::fs::try_exists(&meta_path).await.unwrap_or(false) {
            return Ok(None);
        }
        let meta_raw = tokio::fs::read(&meta_path).await?;
        let meta: CacheMeta = serde_json::from_slice(&meta_raw)?;
        let body = tokio::fs::read(self.body_path(url)).await?;
        Ok(Some(CachedResponse { body, meta }))
    }

    pub async fn put(&self, url: &str, body: &[u8], meta: &CacheMeta) -> Result<()> {
        tokio::fs::create_dir_all(&self.base).await?;
        tokio::fs::write(self.body_path(url), body).await?;
        tokio::fs::write(self.meta_path(url), serde_json::to_vec_pretty(meta)?).await?;
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_body_and_meta() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());

        assert!(cache.get("https://example.de/a").await.unwrap().is_none());

        let meta = CacheMeta {
            url: "https://example.de/a".to_string(),
            etag: Some("\"abc\"".to_string()),
            last_modified: None,
            http_status: 200,
        };
        cache.put("https://example.de/a", b"hello", &meta).await.unwrap();

        let got = cache.get("https://example.de/a").await.unwrap().unwrap();
        assert_eq!(got.body, b"hello");
        assert_eq!(got.meta.etag.as_deref(), Some("\"abc\""));
    }

    #[tokio::test]
    async fn distinct_urls_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());

        let meta_a = CacheMeta {
            url: "https://example.de/a".into(),
            http_status: 200,
            ..Default::default()
        };
        let meta_b = CacheMeta {
            url: "https://example.de/b".into(),
            http_status: 200,
            ..Default::default()
        };
        cache.put("https://example.de/a", b"a-body", &meta_a).await.unwrap();
        cache.put("https://example.de/b", b"b-body", &meta_b).await.unwrap();

        assert_eq!(cache.get("https://example.de/a").await.unwrap().unwrap().body, b"a-body");
        assert_eq!(cache.get("https://example.de/b").await.unwrap().unwrap().body, b"b-body");
    }
}
