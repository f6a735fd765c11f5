use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Clone, Debug, Default)]
pub struct Limits {
    /// Minimum gap between the starts of two requests to the same host.
    pub min_interval: Duration,
}

/// Politeness limiter shared by every source in a run.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    limits: Limits,
    // next free start time per host
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    pub fn new(limits: Limits) -> Self {
        Self {
            inner: Arc::new(Inner {
                limits,
                next_slot: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(Limits::default())
    }

    pub fn min_interval(&self) -> Duration {
        self.inner.limits.min_interval
    }

    // Reserve the next slot for `host` and wait until it opens.
    pub async fn acquire(&self, host: &str) {
        let interval = self.inner.limits.min_interval;
        if interval.is_zero() {
            return;
        }

        let start_at = {
            let mut slots = self.inner.next_slot.lock().await;
            let now = Instant::now();
            let start_at = match slots.get(host) {
                Some(&next) if next > now => next,
                _ => now,
            };
            slots.insert(host.to_string(), start_at + interval);
            start_at
        };

        tokio::time::sleep_until(start_at).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_host_is_spaced() {
        let limiter = RateLimiter::new(Limits {
            min_interval: Duration::from_millis(60),
        });
        let started = std::time::Instant::now();
        limiter.acquire("example.com").await;
        limiter.acquire("example.com").await;
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_hosts_are_independent() {
        let limiter = RateLimiter::new(Limits {
            min_interval: Duration::from_millis(500),
        });
        let started = std::time::Instant::now();
        limiter.acquire("a.example.com").await;
        limiter.acquire("b.example.com").await;
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_unlimited_never_waits() {
        let limiter = RateLimiter::unlimited();
        for _ in 0..10 {
            limiter.acquire("example.com").await;
        }
        assert!(limiter.min_interval().is_zero());
    }
}
