//! Sliding-window request throttle.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::{Result, SearchError};

/// Default cap on wait-and-recheck rounds per `acquire()` call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;

/// Admits at most `max_requests` calls within any trailing `window`.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    max_attempts: u32,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter; `max_requests` is clamped to at least 1.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            admitted: Mutex::new(VecDeque::new()),
        }
    }

    /// Sets the iteration guard.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Returns the admission capacity per window.
    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Returns the window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Waits until a slot is free, then records the admission.
    pub async fn acquire(&self) -> Result<()> {
        for attempt in 1..=self.max_attempts {
            let retry_at = {
                let mut admitted = self.admitted.lock().await;
                let now = Instant::now();
                while admitted
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= self.window)
                {
                    admitted.pop_front();
                }

                if admitted.len() < self.max_requests {
                    admitted.push_back(now);
                    return Ok(());
                }

                match admitted.front() {
                    Some(oldest) => *oldest + self.window,
                    None => now,
                }
            };

            if attempt == self.max_attempts {
                break;
            }

            debug!(
                "Rate limit reached ({} per {:?}), waiting (attempt {})",
                self.max_requests,
                self.window,
                attempt
            );
            sleep_until(retry_at).await;
        }

        Err(SearchError::RateLimited(self.max_attempts))
    }

    /// Number of admissions still inside the window.
    pub async fn in_flight(&self) -> usize {
        let admitted = self.admitted.lock().await;
        let now = Instant::now();
        admitted
            .iter()
            .filter(|t| now.duration_since(**t) < self.window)
            .count()
    }
}
