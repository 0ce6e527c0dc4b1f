pub mod atr;
pub mod ma;
pub mod rsi;

pub use atr::AtrIndicator;
pub use ma::sma;
pub use rsi::RsiIndicator;

use serde::{Deserialize, Serialize};

use common::{Bar, PriceSeries};

use crate::exclusion::ExclusionReason;
use crate::profile::Windows;

/// Closes at or below this are treated as zero when normalizing ATR.
const MIN_CLOSE: f64 = 1e-9;

/// Latest indicator readings for one ticker. Derived from a `PriceSeries`
/// on every evaluation and never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub ma_fast: f64,
    pub ma_slow: f64,
    pub rsi: f64,
    pub atr: f64,
    /// `atr / last_close`.
    pub atr_pct: f64,
    pub last_close: f64,
}

fn is_usable(bar: &Bar) -> bool {
    bar.close.is_finite() && bar.close > MIN_CLOSE && bar.high.is_finite() && bar.low.is_finite()
}

impl IndicatorSet {
    /// Compute every indicator over the usable tail of `series`.
    ///
    /// The usable tail is the run of bars after the last bar with a
    /// non-finite close/high/low or a non-positive close. Fewer than
    /// `windows.min_bars` usable bars excludes the ticker.
    pub fn compute(series: &PriceSeries, windows: &Windows) -> Result<Self, ExclusionReason> {
        if series.len() < windows.min_bars {
            return Err(ExclusionReason::InsufficientHistory {
                bars: series.len(),
                required: windows.min_bars,
            });
        }

        if let Some(last_close) = series.last_close().filter(|c| c.is_finite() && *c <= MIN_CLOSE) {
            return Err(ExclusionReason::ComputationUndefined { last_close });
        }

        let start = series
            .bars
            .iter()
            .rposition(|b| !is_usable(b))
            .map_or(0, |i| i + 1);
        let bars = &series.bars[start..];
        if bars.len() < windows.min_bars {
            return Err(ExclusionReason::MissingPriceData);
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

        let last_close = closes[closes.len() - 1];
        let insufficient = || ExclusionReason::InsufficientHistory {
            bars: bars.len(),
            required: windows.min_bars,
        };
        let ma_fast = sma(&closes, windows.ma_fast).ok_or_else(insufficient)?;
        let ma_slow = sma(&closes, windows.ma_slow).ok_or_else(insufficient)?;
        let rsi = RsiIndicator::new(windows.rsi_period)
            .compute(&closes)
            .ok_or_else(insufficient)?;
        let atr = AtrIndicator::new(windows.atr_period)
            .compute(&highs, &lows, &closes)
            .ok_or_else(insufficient)?;

        let atr_pct = atr / last_close;
        if !atr_pct.is_finite() {
            return Err(ExclusionReason::ComputationUndefined { last_close });
        }

        Ok(Self {
            ma_fast,
            ma_slow,
            rsi,
            atr,
            atr_pct,
            last_close,
        })
    }
}
