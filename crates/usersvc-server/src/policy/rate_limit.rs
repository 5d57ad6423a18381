use std::sync::Mutex;
use std::time::Instant;

use crate::config::RateLimitConfig;

/// Process-wide token-bucket limiter shared by every request.
#[derive(Debug)]
pub struct RateLimiter {
    inner: Mutex<TokenBucket>,
}

impl RateLimiter {
    pub fn new(rps: f64, burst: u32) -> Self {
        Self {
            inner: Mutex::new(TokenBucket::new(rps, burst)),
        }
    }

    pub fn from_config(cfg: &RateLimitConfig) -> Self {
        Self::new(cfg.requests_per_second, cfg.burst_size)
    }

    /// Take one token if available. Never waits.
    pub fn allow(&self) -> bool {
        // Poisoned mutex means a logic bug; deny rather than panic.
        if let Ok(mut g) = self.inner.lock() {
            g.try_take(Instant::now())
        } else {
            false
        }
    }
}

/// Token bucket that starts full and refills continuously.
#[derive(Debug)]
struct TokenBucket {
    refill_per_sec: f64,
    capacity: f64,
    tokens: f64,
    last: Instant,
}

impl TokenBucket {
    fn new(rps: f64, burst: u32) -> Self {
        let capacity = f64::from(burst.max(1));
        let refill_per_sec = if rps.is_finite() && rps > 0.0 { rps } else { 1.0 };
        Self {
            refill_per_sec,
            capacity,
            tokens: capacity,
            last: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
    }

    fn try_take(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn burst_then_reject() {
        let mut b = TokenBucket::new(1.0, 3);
        let t0 = b.last;
        assert!(b.try_take(t0));
        assert!(b.try_take(t0));
        assert!(b.try_take(t0));
        assert!(!b.try_take(t0));
    }

    #[test]
    fn refills_at_rate_up_to_capacity() {
        let mut b = TokenBucket::new(2.0, 2);
        let t0 = b.last;
        assert!(b.try_take(t0));
        assert!(b.try_take(t0));
        assert!(!b.try_take(t0));

        // 2 rps: half a second buys one token.
        let t1 = t0 + Duration::from_millis(500);
        assert!(b.try_take(t1));
        assert!(!b.try_take(t1));

        // A long pause never exceeds the burst size.
        let t2 = t1 + Duration::from_secs(60);
        assert!(b.try_take(t2));
        assert!(b.try_take(t2));
        assert!(!b.try_take(t2));
    }

    #[test]
    fn fractional_rate() {
        let mut b = TokenBucket::new(0.5, 1);
        let t0 = b.last;
        assert!(b.try_take(t0));
        assert!(!b.try_take(t0 + Duration::from_secs(1)));
        assert!(b.try_take(t0 + Duration::from_secs(2)));
    }
}
