//! Per-host token-bucket rate limiting plus global/per-host concurrency caps.
//!
//! Two independent mechanisms, both process-wide and keyed (directly or
//! indirectly) by host: a [`governor`] token bucket paces *dispatch interval*,
//! while the semaphores in [`ConcurrencyLimiter`] cap *in-flight* requests.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter};
use tokio::sync::{RwLock, Semaphore, SemaphorePermit};

type HostRateLimiter = RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Host-specific minimum interval overrides, seeded from spec defaults and
/// extensible with values read from a host's own `crawl-delay`.
pub fn default_host_overrides() -> HashMap<String, Duration> {
    let mut overrides = HashMap::new();
    overrides.insert("geobasis-bb.de".to_string(), Duration::from_secs(10));
    overrides
}

/// Process-wide per-host token bucket map. A last-write-wins concurrent map:
/// first touch of a host creates its bucket, readers afterwards share it.
pub struct HostRateLimiters {
    default_interval: Duration,
    overrides: RwLock<HashMap<String, Duration>>,
    buckets: RwLock<HashMap<String, Arc<HostRateLimiter>>>,
}

impl HostRateLimiters {
    pub fn new(default_interval: Duration, overrides: HashMap<String, Duration>) -> Self {
        Self {
            default_interval,
            overrides: RwLock::new(overrides),
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or overwrite) a host-specific minimum interval, e.g. one
    /// derived from that host's own robots.txt `crawl-delay`. Only takes
    /// effect for buckets not yet created — an in-flight bucket's quota is
    /// fixed once built, so set overrides before first use where possible.
    pub async fn set_override(&self, host: &str, interval: Duration) {
        self.overrides.write().await.insert(host.to_string(), interval);
    }

    async fn interval_for(&self, host: &str) -> Duration {
        self.overrides.read().await.get(host).copied().unwrap_or(self.default_interval)
    }

    async fn bucket_for(&self, host: &str) -> Arc<HostRateLimiter> {
        if let Some(existing) = self.buckets.read().await.get(host) {
            return existing.clone();
        }
        let interval = self.interval_for(host).await;
        let per_second = (1.0 / interval.as_secs_f64()).max(1.0 / 60.0);
        let quota = if per_second >= 1.0 {
            Quota::per_second(NonZeroU32::new(per_second.round() as u32).unwrap_or(NonZeroU32::new(1).unwrap()))
        } else {
            Quota::with_period(interval).expect("interval is positive")
        };
        let bucket = Arc::new(RateLimiter::direct(quota));
        self.buckets.write().await.insert(host.to_string(), bucket.clone());
        bucket
    }

    /// Block until a token is available for `host`.
    pub async fn until_ready(&self, host: &str) {
        self.bucket_for(host).await.until_ready().await;
    }
}

/// Two semaphores: a global cross-host cap, and per-host caps created lazily.
pub struct ConcurrencyLimiter {
    global: Arc<Semaphore>,
    per_host_cap: usize,
    per_host: RwLock<HashMap<String, Arc<Semaphore>>>,
}

/// Holds both permits for the lifetime of one in-flight request.
pub struct ConcurrencyPermit<'a> {
    _global: SemaphorePermit<'a>,
    _host: tokio::sync::OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    pub fn new(global_cap: usize, per_host_cap: usize) -> Self {
        Self {
            global: Arc::new(Semaphore::new(global_cap)),
            per_host_cap,
            per_host: RwLock::new(HashMap::new()),
        }
    }

    async fn host_semaphore(&self, host: &str) -> Arc<Semaphore> {
        if let Some(existing) = self.per_host.read().await.get(host) {
            return existing.clone();
        }
        let sem = Arc::new(Semaphore::new(self.per_host_cap));
        self.per_host.write().await.insert(host.to_string(), sem.clone());
        sem
    }

    /// Acquire a global + per-host permit, suspending at this point per the
    /// cooperative-cancellation contract.
    pub async fn acquire(&self, host: &str) -> ConcurrencyPermit<'_> {
        let global = self.global.acquire().await.expect("global semaphore is never closed");
        let host_sem = self.host_semaphore(host).await;
        let host_permit = host_sem.acquire_owned().await.expect("host semaphore is never closed");
        ConcurrencyPermit {
            _global: global,
            _host: host_permit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn default_interval_paces_requests() {
        let limiters = HostRateLimiters::new(Duration::from_millis(200), HashMap::new());
        let start = Instant::now();
        limiters.until_ready("example.de").await;
        limiters.until_ready("example.de").await;
        limiters.until_ready("example.de").await;
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn distinct_hosts_have_independent_buckets() {
        let limiters = HostRateLimiters::new(Duration::from_millis(500), HashMap::new());
        let start = Instant::now();
        limiters.until_ready("a.example.de").await;
        limiters.until_ready("b.example.de").await;
        // Both first-touches should be immediate since each host's bucket
        // starts full.
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn concurrency_limiter_caps_per_host_in_flight() {
        let limiter = Arc::new(ConcurrencyLimiter::new(100, 1));
        let l1 = limiter.clone();
        let permit = l1.acquire("host.example.de").await;

        let l2 = limiter.clone();
        let second = tokio::spawn(async move {
            let _p = l2.acquire("host.example.de").await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!second.is_finished());

        drop(permit);
        second.await.unwrap();
    }
}
