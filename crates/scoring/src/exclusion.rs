use common::InstrumentClass;

/// A failed check in the stock PE/ROE filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FundamentalCheck {
    PeMissing,
    RoeMissing,
    PeAbove { pe: f64, max: f64 },
    RoeBelow { roe: f64, min: f64 },
}

impl std::fmt::Display for FundamentalCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FundamentalCheck::PeMissing => write!(f, "PE missing"),
            FundamentalCheck::RoeMissing => write!(f, "ROE missing"),
            FundamentalCheck::PeAbove { pe, max } => write!(f, "PE={pe:.2} > {max}"),
            FundamentalCheck::RoeBelow { roe, min } => write!(f, "ROE={roe:.2} < {min}"),
        }
    }
}

/// A coarse gate signal that did not fire, with the reading that failed it.
#[derive(Debug, Clone, PartialEq)]
pub enum GateMiss {
    Momentum,
    Oversold { rsi: f64 },
    LowVol { atr_pct: f64 },
}

impl std::fmt::Display for GateMiss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateMiss::Momentum => write!(f, "MA"),
            GateMiss::Oversold { rsi } => write!(f, "RSI={rsi:.1}"),
            GateMiss::LowVol { atr_pct } => write!(f, "ATR%={atr_pct:.3}"),
        }
    }
}

/// Why a ticker produced no signal. Exclusions are ordinary values: they are
/// logged and reported, never propagated as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ExclusionReason {
    /// Fewer usable bars than the profile requires.
    InsufficientHistory { bars: usize, required: usize },
    /// Close/high/low holes inside the window needed for the indicators.
    MissingPriceData,
    /// Latest close is zero, negative or non-finite, so ATR% has no value.
    ComputationUndefined { last_close: f64 },
    FundamentalsRejected { failures: Vec<FundamentalCheck> },
    ExpenseTooHigh { ratio: f64, max: f64 },
    BelowGateMinimum { score: u8, required: u8, failed: Vec<GateMiss> },
    /// The data source kept failing after all retries.
    FetchFailed(String),
}

impl ExclusionReason {
    /// True for the reasons that mean "not enough data to score". The
    /// analysis report writes these as an `N/A` decision and every other
    /// reason as `Excluded`.
    pub fn is_data_insufficient(&self) -> bool {
        matches!(
            self,
            ExclusionReason::InsufficientHistory { .. }
                | ExclusionReason::MissingPriceData
                | ExclusionReason::ComputationUndefined { .. }
                | ExclusionReason::FetchFailed(_)
        )
    }
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExclusionReason::InsufficientHistory { bars, required } => {
                write!(f, "insufficient data ({bars} bars, need {required})")
            }
            ExclusionReason::MissingPriceData => {
                write!(f, "missing close/high/low in trailing window")
            }
            ExclusionReason::ComputationUndefined { last_close } => {
                write!(f, "ATR% undefined for last close {last_close}")
            }
            ExclusionReason::FundamentalsRejected { failures } => {
                write!(f, "PE/ROE filter ({})", join(failures, ", "))
            }
            ExclusionReason::ExpenseTooHigh { ratio, max } => {
                write!(f, "expense ratio {ratio:.4} > {max:.4}")
            }
            ExclusionReason::BelowGateMinimum { score, required, failed } => {
                write!(f, "score {score}/3 below {required} ({})", join(failed, " & "))
            }
            ExclusionReason::FetchFailed(e) => write!(f, "fetch failed: {e}"),
        }
    }
}

fn join<T: std::fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

/// A ticker dropped from a run, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct Exclusion {
    pub ticker: String,
    pub class: InstrumentClass,
    pub reason: ExclusionReason,
}

impl Exclusion {
    pub fn new(ticker: impl Into<String>, class: InstrumentClass, reason: ExclusionReason) -> Self {
        Self {
            ticker: ticker.into(),
            class,
            reason,
        }
    }
}

impl std::fmt::Display for Exclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.ticker, self.reason)
    }
}
