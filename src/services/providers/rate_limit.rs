use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota};

type DirectRateLimiter = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Enforces a minimum spacing between outbound provider calls
///
/// One cell is replenished per interval with no burst allowance, so callers
/// are admitted at most once per interval no matter how many are waiting. A
/// zero interval disables limiting.
pub struct RateLimiter {
    limiter: Option<DirectRateLimiter>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            limiter: Quota::with_period(min_interval).map(DirectRateLimiter::direct),
        }
    }

    /// Waits until the next call is allowed and records it
    pub async fn acquire(&self) {
        let Some(limiter) = &self.limiter else {
            return;
        };

        if limiter.check().is_err() {
            tracing::trace!("Rate limit spacing");
            limiter.until_ready().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    const INTERVAL: Duration = Duration::from_millis(50);
    /// Slack for clock granularity between the limiter and `Instant`
    const SLACK: Duration = Duration::from_millis(5);

    #[tokio::test]
    async fn test_first_call_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_back_to_back_calls_are_spaced() {
        let limiter = RateLimiter::new(INTERVAL);
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert!(start.elapsed() + SLACK >= INTERVAL * 2);
    }

    #[tokio::test]
    async fn test_no_wait_after_interval_has_passed() {
        let limiter = RateLimiter::new(INTERVAL);
        limiter.acquire().await;

        tokio::time::sleep(INTERVAL * 2).await;
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < INTERVAL);
    }

    #[tokio::test]
    async fn test_zero_interval_never_waits() {
        let limiter = RateLimiter::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..100 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < INTERVAL);
    }

    #[tokio::test]
    async fn test_concurrent_callers_are_serialized() {
        let limiter = Arc::new(RateLimiter::new(INTERVAL));
        let start = Instant::now();

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let limiter = limiter.clone();
            tasks.push(tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            }));
        }

        let mut admitted = Vec::new();
        for task in tasks {
            admitted.push(task.await.unwrap());
        }
        admitted.sort();

        for pair in admitted.windows(2) {
            assert!(pair[1] - pair[0] + SLACK >= INTERVAL);
        }
        assert!(start.elapsed() + SLACK >= INTERVAL * 3);
    }
}
