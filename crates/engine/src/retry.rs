use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use common::{
    Error, Fundamentals, FundamentalsProvider, MarketDataProvider, PriceSeries, Result,
};

/// Fixed-delay retry policy for data fetches. `max_attempts` counts the first
/// try, so 3 means one call plus two retries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. The last error is returned on exhaustion.
    pub async fn run<T, F, Fut>(&self, what: &str, ticker: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && is_retryable(&e) => {
                    warn!(ticker, what, attempt, error = %e, "Fetch failed, retrying");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// A ticker the source does not know will not appear on retry, and a
/// refused session stays refused: the client already refreshed it once.
fn is_retryable(e: &Error) -> bool {
    !matches!(e, Error::NoData(_) | Error::Config(_) | Error::Unauthorized(_))
}

/// Wraps a provider with a `RetryPolicy`.
pub struct Retrying<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P> Retrying<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: MarketDataProvider> MarketDataProvider for Retrying<P> {
    async fn daily_bars(&self, ticker: &str, period: &str) -> Result<PriceSeries> {
        let inner = &self.inner;
        self.policy
            .run("bars", ticker, move || inner.daily_bars(ticker, period))
            .await
    }
}

#[async_trait]
impl<P: FundamentalsProvider> FundamentalsProvider for Retrying<P> {
    async fn fundamentals(&self, ticker: &str) -> Result<Fundamentals> {
        let inner = &self.inner;
        self.policy
            .run("fundamentals", ticker, move || inner.fundamentals(ticker))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Fails the first `failures` calls, then returns empty data.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        error: fn(&str) -> Error,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                error: |_| Error::Http("connection reset".into()),
            }
        }
    }

    #[async_trait]
    impl MarketDataProvider for Flaky {
        async fn daily_bars(&self, ticker: &str, _period: &str) -> Result<PriceSeries> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err((self.error)(ticker))
            } else {
                Ok(PriceSeries::empty(ticker))
            }
        }
    }

    #[async_trait]
    impl FundamentalsProvider for Flaky {
        async fn fundamentals(&self, ticker: &str) -> Result<Fundamentals> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err((self.error)(ticker))
            } else {
                Ok(Fundamentals::default())
            }
        }
    }

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn recovers_within_budget() {
        let provider = Retrying::new(Flaky::new(2), fast_policy(3));
        let series = provider.daily_bars("SPY", "90d").await.unwrap();
        assert!(series.is_empty());
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let provider = Retrying::new(Flaky::new(10), fast_policy(3));
        let err = provider.daily_bars("SPY", "90d").await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unknown_ticker_is_not_retried() {
        let mut flaky = Flaky::new(10);
        flaky.error = |t| Error::NoData(t.to_string());
        let provider = Retrying::new(flaky, fast_policy(3));
        assert!(matches!(
            provider.daily_bars("NOPE", "90d").await,
            Err(Error::NoData(_))
        ));
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refused_session_is_not_retried() {
        let mut flaky = Flaky::new(10);
        flaky.error = |_| Error::Unauthorized("Invalid Crumb".into());
        let provider = Retrying::new(flaky, fast_policy(3));
        for ticker in ["SPY", "QQQ"] {
            assert!(matches!(
                provider.fundamentals(ticker).await,
                Err(Error::Unauthorized(_))
            ));
        }
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
