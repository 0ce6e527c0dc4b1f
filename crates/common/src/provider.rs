use async_trait::async_trait;

use crate::{Fundamentals, PriceSeries, Result, UniverseSegment};

/// Source of ticker symbols for one universe segment.
///
/// Implementations return deduplicated symbols; order carries no meaning.
#[async_trait]
pub trait UniverseProvider: Send + Sync {
    async fn tickers(&self, segment: UniverseSegment) -> Result<Vec<String>>;
}

/// Source of daily price history.
///
/// `period` uses the data source's range notation (e.g. `"90d"`).
/// Column normalization is the implementation's job: the returned series only
/// contains bars with date, high, low and close present. An empty series is a
/// valid answer for an unknown or delisted ticker.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn daily_bars(&self, ticker: &str, period: &str) -> Result<PriceSeries>;
}

/// Source of point-in-time fundamentals. Partial snapshots are allowed.
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    async fn fundamentals(&self, ticker: &str) -> Result<Fundamentals>;
}
