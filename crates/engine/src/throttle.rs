use std::time::Duration;

use rand::Rng;
use tracing::debug;

/// Politeness pause between tickers: a uniform random delay in `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throttle {
    min: Duration,
    max: Duration,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(Duration::from_millis(300), Duration::from_millis(800))
    }
}

impl Throttle {
    pub fn new(min: Duration, max: Duration) -> Self {
        if max < min {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    /// No pause at all. Used by tests and offline runs.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn next_delay(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }

    pub async fn pause(&self) {
        let delay = self.next_delay();
        if delay.is_zero() {
            return;
        }
        debug!(delay_ms = delay.as_millis() as u64, "Sleeping between requests");
        tokio::time::sleep(delay).await;
    }
}
