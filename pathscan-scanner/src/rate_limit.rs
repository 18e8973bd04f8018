use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Minimum-interval gate between consecutive requests of one crawl session.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_request: None,
        }
    }

    /// A rate of 0 is treated as 1 request per second.
    pub fn per_second(requests_per_second: u32) -> Self {
        let rps = u64::from(requests_per_second.max(1));
        Self::new(Duration::from_millis(1000 / rps))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until `interval` has elapsed since the previous call returned.
    /// The first call returns immediately.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                let remaining = self.interval - elapsed;
                debug!("Rate limiting: sleeping {:?}", remaining);
                sleep(remaining).await;
            }
        }
        self.last_request = Some(Instant::now());
    }

    /// Raises the interval to `candidate` if it is longer. Never relaxes it.
    pub fn tighten_interval(&mut self, candidate: Duration) {
        if candidate > self.interval {
            self.interval = candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_second_interval() {
        assert_eq!(RateLimiter::per_second(2).interval(), Duration::from_millis(500));
        assert_eq!(RateLimiter::per_second(5).interval(), Duration::from_millis(200));
        assert_eq!(RateLimiter::per_second(0).interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_tighten_is_one_way() {
        let mut limiter = RateLimiter::per_second(2);
        limiter.tighten_interval(Duration::from_secs(3));
        assert_eq!(limiter.interval(), Duration::from_secs(3));

        limiter.tighten_interval(Duration::from_millis(100));
        assert_eq!(limiter.interval(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_wait_is_immediate() {
        let mut limiter = RateLimiter::new(Duration::from_secs(10));
        let start = Instant::now();
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_wait_enforces_interval() {
        let mut limiter = RateLimiter::new(Duration::from_millis(500));
        limiter.wait().await;
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_when_interval_already_elapsed() {
        let mut limiter = RateLimiter::new(Duration::from_millis(500));
        limiter.wait().await;
        tokio::time::advance(Duration::from_secs(1)).await;
        let start = Instant::now();
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
