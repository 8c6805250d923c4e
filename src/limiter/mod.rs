//! Token-bucket rate limiting for venue API traffic.
//!
//! Each venue gets three buckets: request count, request weight, and
//! order submissions. [`RateLimiter::acquire`] blocks the caller until
//! all applicable buckets can be debited in one step, so a request is
//! never half-charged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::Venue;

/// Longest single sleep inside `acquire`; keeps a drained bucket from
/// parking a caller for a full refill window.
const MAX_ACQUIRE_WAIT: Duration = Duration::from_secs(30);

/// The order bucket covers a 10-second burst window.
const ORDER_BURST_WINDOW_SECS: f64 = 10.0;

/// Classic token bucket with lazy refill.
#[derive(Debug)]
struct TokenBucket {
    capacity: f64,
    /// Tokens per second.
    refill_rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, refill_rate: f64, now: Instant) -> Self {
        Self {
            capacity,
            refill_rate,
            tokens: capacity,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    fn has(&self, n: f64) -> bool {
        self.tokens >= n
    }

    fn take(&mut self, n: f64) {
        self.tokens -= n;
    }

    /// Time until `n` tokens will be available, assuming no other
    /// consumer. Zero when they already are.
    fn wait_for(&self, n: f64) -> Duration {
        if self.tokens >= n {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((n - self.tokens) / self.refill_rate)
        }
    }

    fn reset(&mut self, now: Instant) {
        self.tokens = self.capacity;
        self.last_refill = now;
    }
}

#[derive(Debug)]
struct Buckets {
    requests: TokenBucket,
    weight: TokenBucket,
    orders: TokenBucket,
}

/// Point-in-time utilization of the three buckets, `0.0` (idle) to `1.0`
/// (drained).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Utilization {
    pub requests: f64,
    pub weight: f64,
    pub orders: f64,
}

/// Cumulative telemetry counters since construction or [`RateLimiter::reset`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LimiterStats {
    pub requests: u64,
    pub weight: u64,
    pub orders: u64,
    pub rate_limit_hits: u64,
}

/// Per-venue token-bucket scheduler.
///
/// Obtain shared instances through [`RateLimiter::shared`]; every gateway
/// for the same venue must go through the same limiter or the ceilings
/// mean nothing.
pub struct RateLimiter {
    venue: Venue,
    buckets: Mutex<Buckets>,
    requests: AtomicU64,
    weight_used: AtomicU64,
    orders: AtomicU64,
    rate_limit_hits: AtomicU64,
}

impl RateLimiter {
    #[must_use]
    pub fn new(venue: Venue) -> Self {
        let limits = venue.config().rate_limits;
        let now = Instant::now();
        let rpm = f64::from(limits.requests_per_minute);
        let wpm = f64::from(limits.weight_per_minute);
        let ops = f64::from(limits.orders_per_second);

        info!(
            venue = %venue,
            requests_per_min = limits.requests_per_minute,
            weight_per_min = limits.weight_per_minute,
            orders_per_sec = limits.orders_per_second,
            "Rate limiter initialized"
        );

        Self {
            venue,
            buckets: Mutex::new(Buckets {
                requests: TokenBucket::new(rpm, rpm / 60.0, now),
                weight: TokenBucket::new(wpm, wpm / 60.0, now),
                orders: TokenBucket::new(ops * ORDER_BURST_WINDOW_SECS, ops, now),
            }),
            requests: AtomicU64::new(0),
            weight_used: AtomicU64::new(0),
            orders: AtomicU64::new(0),
            rate_limit_hits: AtomicU64::new(0),
        }
    }

    /// Long-lived limiter for `venue`, shared process-wide.
    #[must_use]
    pub fn shared(venue: Venue) -> Arc<Self> {
        static REGISTRY: OnceLock<DashMap<Venue, Arc<RateLimiter>>> = OnceLock::new();
        let registry = REGISTRY.get_or_init(DashMap::new);
        registry
            .entry(venue)
            .or_insert_with(|| Arc::new(Self::new(venue)))
            .clone()
    }

    /// Block until one request of `weight` (and, if `is_order`, one order
    /// slot) can be debited from every applicable bucket.
    pub async fn acquire(&self, weight: u32, is_order: bool) {
        loop {
            match self.try_acquire(weight, is_order, Instant::now()) {
                None => {
                    self.requests.fetch_add(1, Ordering::Relaxed);
                    self.weight_used
                        .fetch_add(u64::from(weight), Ordering::Relaxed);
                    if is_order {
                        self.orders.fetch_add(1, Ordering::Relaxed);
                    }
                    return;
                }
                Some(wait) => {
                    self.rate_limit_hits.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        venue = %self.venue,
                        wait_ms = wait.as_millis(),
                        weight,
                        is_order,
                        "Rate ceiling reached, waiting for tokens"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// One all-or-nothing pass over the buckets. Returns `None` when the
    /// debit succeeded, otherwise the clamped wait before the next try.
    fn try_acquire(&self, weight: u32, is_order: bool, now: Instant) -> Option<Duration> {
        let mut buckets = self.buckets.lock();
        buckets.requests.refill(now);
        buckets.weight.refill(now);
        buckets.orders.refill(now);

        let weight = f64::from(weight);
        let granted = buckets.requests.has(1.0)
            && buckets.weight.has(weight)
            && (!is_order || buckets.orders.has(1.0));

        if granted {
            buckets.requests.take(1.0);
            buckets.weight.take(weight);
            if is_order {
                buckets.orders.take(1.0);
            }
            debug!(
                venue = %self.venue,
                request_tokens = buckets.requests.tokens,
                weight_tokens = buckets.weight.tokens,
                "Rate limit passed"
            );
            return None;
        }

        let mut wait = buckets.requests.wait_for(1.0);
        wait = wait.max(buckets.weight.wait_for(weight));
        if is_order {
            wait = wait.max(buckets.orders.wait_for(1.0));
        }
        Some(wait.min(MAX_ACQUIRE_WAIT))
    }

    /// Refill every bucket to capacity and zero the counters.
    pub fn reset(&self) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        buckets.requests.reset(now);
        buckets.weight.reset(now);
        buckets.orders.reset(now);
        drop(buckets);

        self.requests.store(0, Ordering::Relaxed);
        self.weight_used.store(0, Ordering::Relaxed);
        self.orders.store(0, Ordering::Relaxed);
        self.rate_limit_hits.store(0, Ordering::Relaxed);
        info!(venue = %self.venue, "Rate limiter reset");
    }

    #[must_use]
    pub fn venue(&self) -> Venue {
        self.venue
    }

    #[must_use]
    pub fn stats(&self) -> LimiterStats {
        LimiterStats {
            requests: self.requests.load(Ordering::Relaxed),
            weight: self.weight_used.load(Ordering::Relaxed),
            orders: self.orders.load(Ordering::Relaxed),
            rate_limit_hits: self.rate_limit_hits.load(Ordering::Relaxed),
        }
    }

    /// Current fill level of each bucket, after a lazy refill.
    #[must_use]
    pub fn utilization(&self) -> Utilization {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        buckets.requests.refill(now);
        buckets.weight.refill(now);
        buckets.orders.refill(now);
        Utilization {
            requests: 1.0 - buckets.requests.tokens / buckets.requests.capacity,
            weight: 1.0 - buckets.weight.tokens / buckets.weight.capacity,
            orders: 1.0 - buckets.orders.tokens / buckets.orders.capacity,
        }
    }
}
