//! Scoring and decision engine.
//!
//! Everything here is pure: a `PriceSeries` and `Fundamentals` snapshot go in,
//! a `ShortlistEntry`, `ScoreRecord` or `Exclusion` comes out. Fetching,
//! retries and throttling live in the `engine` crate.

pub mod aggregate;
pub mod analyzer;
pub mod decision;
pub mod exclusion;
pub mod gate;
pub mod indicators;
pub mod profile;
pub mod signals;

pub use aggregate::{composite_score, gate_score, weighted_signals};
pub use analyzer::{Analyzer, ScoreRecord};
pub use decision::{Decision, DecisionThresholds};
pub use exclusion::{Exclusion, ExclusionReason, FundamentalCheck, GateMiss};
pub use gate::{ScreeningGate, ShortlistEntry};
pub use indicators::IndicatorSet;
pub use profile::{ClassProfile, ScoringProfile};
pub use signals::{Evaluation, Pass, SignalEvaluator, SignalName, SignalSet};

/// Series and fundamentals fixtures shared by this crate's tests and the
/// engine's runner tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use chrono::NaiveDate;
    use common::{Bar, Fundamentals, PriceSeries};

    /// Daily bars with the given closes and a symmetric `half_range` around each.
    pub fn series_from_closes(ticker: &str, closes: &[f64], half_range: f64) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: start + chrono::Days::new(i as u64),
                open: close,
                high: close + half_range,
                low: close - half_range,
                close,
                volume: Some(1_000.0),
            })
            .collect();
        PriceSeries::new(ticker, bars)
    }

    /// 52 bars drifting up by 0.5, then an 8-bar pullback of 1.5 a day: the
    /// fast MA stays above the slow one, RSI lands near 29 and ATR% near 1.3%.
    pub fn pullback(ticker: &str) -> PriceSeries {
        let mut closes: Vec<f64> = (0..52).map(|i| 100.0 + i as f64 * 0.5).collect();
        let top = closes[closes.len() - 1];
        closes.extend((1..=8).map(|i| top - i as f64 * 1.5));
        series_from_closes(ticker, &closes, 0.5)
    }

    pub fn flat_series(ticker: &str, len: usize, close: f64) -> PriceSeries {
        series_from_closes(ticker, &vec![close; len], 1.0)
    }

    pub fn stock_fundamentals(pe: f64, roe: f64) -> Fundamentals {
        Fundamentals {
            forward_pe: Some(pe),
            return_on_equity: Some(roe),
            sector: Some("Technology".into()),
            ..Fundamentals::default()
        }
    }
}
