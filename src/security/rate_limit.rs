//! Fixed-window rate limiting keyed by (route class, client IP).
//!
//! # Algorithm
//! - No bucket for the key, or its window has passed: start a new window with
//!   `count = 1` (the triggering request takes the first slot) and allow.
//! - `count >= max_requests`: reject without incrementing.
//! - Otherwise increment and allow.
//!
//! # Known Limitations
//! - Fixed windows admit up to `2 × max_requests` across a window boundary
//!   (a burst at the end of one window followed by one at the start of the next).
//! - Buckets live in process memory. Each instance of a horizontally scaled
//!   deployment enforces its own budget; exact multi-instance enforcement needs a
//!   [`RateLimitStore`] backed by an external atomic counter.
//!
//! # Capacity
//! At `max_buckets` a new key first triggers a purge of expired buckets (at most
//! once per [`INLINE_PURGE_INTERVAL`]). If the store is still full, the bucket whose
//! window ends soonest is evicted, so the map never grows past its cap.
//!
//! # Concurrency
//! Increment-and-compare runs under the per-key entry lock of the bucket map, so two
//! concurrent requests can never both observe `count < max` for the last slot.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::observability::metrics;
use crate::routing::RouteClass;
use crate::security::clock::{Clock, SystemClock};

/// Result of taking a slot from a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitOutcome {
    pub limited: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: Instant,
}

impl RateLimitOutcome {
    /// Time until the current window ends.
    pub fn retry_after(&self, now: Instant) -> Duration {
        self.reset_at.saturating_duration_since(now)
    }
}

/// Shared counter store. Implementations must make `take` atomic per key.
pub trait RateLimitStore: Send + Sync {
    fn take(&self, key: &str, max_requests: u32, window: Duration) -> RateLimitOutcome;

    /// Number of tracked buckets.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop buckets whose window has passed. Returns how many were removed.
    fn purge_expired(&self) -> usize;
}

/// Rate-limit key for a client on a route class.
pub fn bucket_key(class: RouteClass, client_ip: &str) -> String {
    format!("{}:{}", class.as_str(), client_ip)
}

#[derive(Debug)]
struct Bucket {
    count: u32,
    reset_at: Instant,
}

/// Minimum spacing between purges triggered from the request path.
pub const INLINE_PURGE_INTERVAL: Duration = Duration::from_secs(1);

/// In-process bucket store.
pub struct MemoryRateLimiter<C: Clock = SystemClock> {
    buckets: DashMap<String, Bucket>,
    max_buckets: usize,
    last_inline_purge: Mutex<Option<Instant>>,
    clock: C,
}

impl MemoryRateLimiter<SystemClock> {
    pub fn new(max_buckets: usize) -> Self {
        Self::with_clock(max_buckets, SystemClock)
    }
}

impl<C: Clock> MemoryRateLimiter<C> {
    pub fn with_clock(max_buckets: usize, clock: C) -> Self {
        Self {
            buckets: DashMap::new(),
            max_buckets,
            last_inline_purge: Mutex::new(None),
            clock,
        }
    }

    fn make_room(&self, key: &str) {
        if self.buckets.len() < self.max_buckets || self.buckets.contains_key(key) {
            return;
        }
        if self.inline_purge_due() {
            self.purge_expired();
        }

        let mut evicted = 0usize;
        while self.buckets.len() >= self.max_buckets {
            // collect first; removing while iterating would deadlock on the shard
            let soonest = self
                .buckets
                .iter()
                .min_by_key(|entry| entry.value().reset_at)
                .map(|entry| entry.key().clone());
            match soonest {
                Some(victim) => {
                    self.buckets.remove(&victim);
                    evicted += 1;
                }
                None => break,
            }
        }
        if evicted > 0 {
            tracing::debug!(
                evicted,
                max_buckets = self.max_buckets,
                "Rate limit bucket store full, evicted soonest-expiring buckets"
            );
        }
    }

    fn inline_purge_due(&self) -> bool {
        let now = self.clock.now();
        let mut last = self
            .last_inline_purge
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match *last {
            Some(at) if now.saturating_duration_since(at) < INLINE_PURGE_INTERVAL => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

impl<C: Clock> RateLimitStore for MemoryRateLimiter<C> {
    fn take(&self, key: &str, max_requests: u32, window: Duration) -> RateLimitOutcome {
        self.make_room(key);

        let now = self.clock.now();
        // The entry guard holds the shard lock until the end of this function.
        let mut bucket = self
            .buckets
            .entry(key.to_owned())
            .or_insert(Bucket { count: 0, reset_at: now });

        if now >= bucket.reset_at {
            bucket.count = 1;
            bucket.reset_at = now + window;
            return RateLimitOutcome {
                limited: false,
                limit: max_requests,
                remaining: max_requests.saturating_sub(1),
                reset_at: bucket.reset_at,
            };
        }

        if bucket.count >= max_requests {
            return RateLimitOutcome {
                limited: true,
                limit: max_requests,
                remaining: 0,
                reset_at: bucket.reset_at,
            };
        }

        bucket.count += 1;
        RateLimitOutcome {
            limited: false,
            limit: max_requests,
            remaining: max_requests - bucket.count,
            reset_at: bucket.reset_at,
        }
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| bucket.reset_at > now);
        before.saturating_sub(self.buckets.len())
    }
}

/// Periodically purge expired buckets until shutdown.
pub fn spawn_sweeper(
    store: Arc<dyn RateLimitStore>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let purged = store.purge_expired();
                    let remaining = store.len();
                    metrics::record_bucket_count(remaining);
                    if purged > 0 {
                        tracing::debug!(purged, remaining, "Purged expired rate limit buckets");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Rate limit sweeper stopping");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::clock::MockClock;

    const WINDOW: Duration = Duration::from_secs(60);

    fn limiter() -> (MemoryRateLimiter<MockClock>, MockClock) {
        let clock = MockClock::default();
        (MemoryRateLimiter::with_clock(100, clock.clone()), clock)
    }

    #[test]
    fn test_allows_up_to_max_then_limits() {
        let (limiter, _) = limiter();

        for n in 1..=5u32 {
            let outcome = limiter.take("api:1.2.3.4", 5, WINDOW);
            assert!(!outcome.limited, "request {n} should pass");
            assert_eq!(outcome.remaining, 5 - n);
        }

        let outcome = limiter.take("api:1.2.3.4", 5, WINDOW);
        assert!(outcome.limited);
        assert_eq!(outcome.remaining, 0);
    }

    #[test]
    fn test_rejection_does_not_extend_window() {
        let (limiter, clock) = limiter();
        let first = limiter.take("k", 1, WINDOW);
        clock.advance(Duration::from_secs(30));
        let rejected = limiter.take("k", 1, WINDOW);

        assert!(rejected.limited);
        assert_eq!(rejected.reset_at, first.reset_at);
        assert_eq!(rejected.retry_after(clock.now()), Duration::from_secs(30));
    }

    #[test]
    fn test_window_rollover_starts_fresh_at_one() {
        let (limiter, clock) = limiter();
        for _ in 0..3 {
            limiter.take("k", 3, WINDOW);
        }
        assert!(limiter.take("k", 3, WINDOW).limited);

        clock.advance(WINDOW);
        let outcome = limiter.take("k", 3, WINDOW);
        assert!(!outcome.limited);
        assert_eq!(outcome.remaining, 2);
        assert_eq!(outcome.reset_at, clock.now() + WINDOW);
    }

    #[test]
    fn test_keys_are_independent() {
        let (limiter, _) = limiter();
        assert!(!limiter.take(&bucket_key(RouteClass::Admin, "1.1.1.1"), 1, WINDOW).limited);
        assert!(limiter.take(&bucket_key(RouteClass::Admin, "1.1.1.1"), 1, WINDOW).limited);
        assert!(!limiter.take(&bucket_key(RouteClass::Api, "1.1.1.1"), 1, WINDOW).limited);
        assert!(!limiter.take(&bucket_key(RouteClass::Admin, "2.2.2.2"), 1, WINDOW).limited);
    }

    #[test]
    fn test_boundary_burst_is_allowed() {
        // documented fixed-window behavior: 2x max across a boundary
        let (limiter, clock) = limiter();
        clock.advance(Duration::from_secs(1));
        limiter.take("k", 10, WINDOW);
        clock.advance(WINDOW - Duration::from_millis(1));
        let mut passed = 0;
        for _ in 0..9 {
            if !limiter.take("k", 10, WINDOW).limited {
                passed += 1;
            }
        }
        clock.advance(Duration::from_millis(1));
        for _ in 0..10 {
            if !limiter.take("k", 10, WINDOW).limited {
                passed += 1;
            }
        }
        assert_eq!(passed, 19);
    }

    #[test]
    fn test_purge_expired() {
        let (limiter, clock) = limiter();
        limiter.take("a", 1, Duration::from_secs(10));
        limiter.take("b", 1, Duration::from_secs(120));
        clock.advance(Duration::from_secs(11));

        assert_eq!(limiter.purge_expired(), 1);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_capacity_purges_before_insert() {
        let clock = MockClock::default();
        let limiter = MemoryRateLimiter::with_clock(2, clock.clone());
        limiter.take("a", 1, Duration::from_secs(1));
        limiter.take("b", 1, Duration::from_secs(1));
        clock.advance(Duration::from_secs(2));

        limiter.take("c", 1, Duration::from_secs(1));
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_distinct_keys_never_exceed_capacity() {
        let clock = MockClock::default();
        let limiter = MemoryRateLimiter::with_clock(2, clock.clone());
        for n in 0..1000 {
            limiter.take(&format!("api:10.0.{}.{}", n / 256, n % 256), 5, WINDOW);
            assert!(limiter.len() <= 2);
        }
        assert_eq!(limiter.len(), 2);
    }

    #[test]
    fn test_full_store_evicts_soonest_window() {
        let clock = MockClock::default();
        let limiter = MemoryRateLimiter::with_clock(2, clock.clone());
        limiter.take("short", 1, Duration::from_secs(10));
        limiter.take("long", 1, Duration::from_secs(120));

        assert!(!limiter.take("new", 1, WINDOW).limited);
        assert_eq!(limiter.len(), 2);
        // "long" kept its spent budget, "short" was the one dropped
        assert!(limiter.take("long", 1, Duration::from_secs(120)).limited);
        assert!(limiter.buckets.get("short").is_none());
    }

    #[test]
    fn test_concurrent_burst_is_exact() {
        let limiter = Arc::new(MemoryRateLimiter::new(100));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..25)
                        .filter(|_| !limiter.take("burst", 50, WINDOW).limited)
                        .count()
                })
            })
            .collect();

        let passed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(passed, 50);
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let (tx, rx) = broadcast::channel(1);
        let store: Arc<dyn RateLimitStore> = Arc::new(MemoryRateLimiter::new(10));
        let handle = spawn_sweeper(store, Duration::from_millis(10), rx);

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
