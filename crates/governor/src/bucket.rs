use std::time::Instant;

/// A commands-per-second token bucket for one switch (§4.2). Decremented
/// before each CLI write; refilled continuously rather than in discrete
/// per-second ticks, so bursts up to `capacity` are absorbed smoothly.
pub(crate) struct TokenBucket {
    capacity: f64,
    tokens: f64,
    rate_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub(crate) fn new(commands_per_second: u32) -> Self {
        let rate = commands_per_second.max(1) as f64;
        Self {
            capacity: rate,
            tokens: rate,
            rate_per_sec: rate,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    pub(crate) fn try_consume(&mut self) -> bool {
        self.refill();
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

    #[test]
    fn drains_and_refills() {
        let mut bucket = TokenBucket::new(2);
        assert!(bucket.try_consume());
        assert!(bucket.try_consume());
        assert!(!bucket.try_consume());

        std::thread::sleep(std::time::Duration::from_millis(600));
        assert!(bucket.try_consume());
    }
}
