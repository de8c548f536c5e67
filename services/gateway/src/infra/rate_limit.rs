//! Admission control for code issuance.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::domain::repository::{RateLimitDecision, RateLimiter};

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: Option<&str>) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }

    fn check_email(&self, _email: &str) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    refreshed_at: Instant,
}

/// In-process token buckets keyed by string.
///
/// Each key starts full at `capacity` tokens and regains one token per `refill`.
/// State is per gateway instance, so the effective limit scales with replica count.
#[derive(Debug)]
struct Buckets {
    capacity: f64,
    refill: Duration,
    state: Mutex<BucketState>,
}

#[derive(Debug, Default)]
struct BucketState {
    entries: HashMap<String, Bucket>,
    last_swept: Option<Instant>,
}

/// Upper bound on tracked keys per dimension.
const MAX_TRACKED_KEYS: usize = 10_000;

impl Buckets {
    fn new(capacity: u32, refill: Duration) -> Self {
        Self {
            capacity: f64::from(capacity),
            refill,
            state: Mutex::new(BucketState::default()),
        }
    }

    fn take(&self, key: &str, now: Instant) -> RateLimitDecision {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if !state.entries.contains_key(key) && state.entries.len() >= MAX_TRACKED_KEYS {
            self.make_room(&mut state, now);
        }

        let bucket = state.entries.entry(key.to_owned()).or_insert(Bucket {
            tokens: self.capacity,
            refreshed_at: now,
        });
        *bucket = refilled(bucket, self.capacity, self.refill, now);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            RateLimitDecision::Allowed
        } else {
            RateLimitDecision::Limited
        }
    }

    /// Free one slot. Buckets idle for `capacity * refill` are full again and carry no
    /// state, so they go first; the sweep runs at most once per `refill`. When nothing
    /// is idle, the least recently touched bucket is dropped.
    fn make_room(&self, state: &mut BucketState, now: Instant) {
        let sweep_due = state
            .last_swept
            .is_none_or(|at| now.saturating_duration_since(at) >= self.refill);
        if sweep_due {
            let full_after = self.refill.mul_f64(self.capacity);
            state
                .entries
                .retain(|_, b| now.saturating_duration_since(b.refreshed_at) < full_after);
            state.last_swept = Some(now);
        }

        if state.entries.len() >= MAX_TRACKED_KEYS {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, b)| b.refreshed_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                state.entries.remove(&oldest);
            }
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        match self.state.lock() {
            Ok(guard) => guard.entries.len(),
            Err(poisoned) => poisoned.into_inner().entries.len(),
        }
    }
}

fn refilled(bucket: &Bucket, capacity: f64, refill: Duration, now: Instant) -> Bucket {
    let elapsed = now.saturating_duration_since(bucket.refreshed_at);
    let gained = if refill.is_zero() {
        capacity
    } else {
        elapsed.as_secs_f64() / refill.as_secs_f64()
    };
    Bucket {
        tokens: (bucket.tokens + gained).min(capacity),
        refreshed_at: now,
    }
}

/// Per-address and per-IP token buckets in front of `issue`. A capacity of 0
/// disables that dimension.
#[derive(Debug)]
pub struct TokenBucketRateLimiter {
    by_email: Option<Buckets>,
    by_ip: Option<Buckets>,
}

impl TokenBucketRateLimiter {
    pub fn new(email_capacity: u32, ip_capacity: u32, refill: Duration) -> Self {
        let buckets = |capacity: u32| (capacity > 0).then(|| Buckets::new(capacity, refill));
        Self {
            by_email: buckets(email_capacity),
            by_ip: buckets(ip_capacity),
        }
    }
}

impl RateLimiter for TokenBucketRateLimiter {
    fn check_ip(&self, ip: Option<&str>) -> RateLimitDecision {
        match (&self.by_ip, ip) {
            (Some(buckets), Some(ip)) => buckets.take(ip, Instant::now()),
            // Nothing to key on; the per-email bucket still applies.
            _ => RateLimitDecision::Allowed,
        }
    }

    fn check_email(&self, email: &str) -> RateLimitDecision {
        match &self.by_email {
            Some(buckets) => buckets.take(email, Instant::now()),
            None => RateLimitDecision::Allowed,
        }
    }
}
