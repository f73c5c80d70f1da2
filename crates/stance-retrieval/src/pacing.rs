//! Token-bucket pacing for crawler calls.
//!
//! `try_acquire` never blocks: when the bucket is empty the call is simply
//! denied and the caller skips that query variant, so a slow collaborator
//! cannot stall unrelated work.

use std::time::{Duration, Instant};

use tracing::debug;

pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A bucket refilling at `rate` tokens per second with `burst`
    /// capacity, starting full.
    pub fn new(rate: f64, burst: f64) -> Self {
        let capacity = burst.max(1.0);
        Self {
            capacity,
            tokens: capacity,
            refill_per_sec: rate.max(0.0),
            last_refill: Instant::now(),
        }
    }

    /// Take one token if available. Never blocks.
    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    /// Clock-injected variant for tests.
    pub fn try_acquire_at(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            debug!("pacing bucket empty, denying acquisition");
            false
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed > Duration::ZERO {
            self.tokens =
                (self.tokens + elapsed.as_secs_f64() * self.refill_per_sec).min(self.capacity);
            self.last_refill = now;
        }
    }
}
