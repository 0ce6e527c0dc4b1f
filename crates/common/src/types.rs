use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLC bar after normalization. Every price field is present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

/// A bar as delivered by a data source, before rows with holes are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawBar {
    pub date: Option<NaiveDate>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

/// Daily price history for one ticker, oldest bar first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub ticker: String,
    pub bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.date);
        Self {
            ticker: ticker.into(),
            bars,
        }
    }

    /// Build a series from raw rows, dropping any row without a date, close,
    /// high or low. A missing open falls back to the close.
    pub fn from_raw(ticker: impl Into<String>, rows: impl IntoIterator<Item = RawBar>) -> Self {
        let bars = rows
            .into_iter()
            .filter_map(|r| {
                let (date, high, low, close) = (r.date?, r.high?, r.low?, r.close?);
                Some(Bar {
                    date,
                    open: r.open.unwrap_or(close),
                    high,
                    low,
                    close,
                    volume: r.volume,
                })
            })
            .collect();
        Self::new(ticker, bars)
    }

    /// An empty series, used when a source has nothing for the ticker.
    pub fn empty(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            bars: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }
}

/// Point-in-time fundamentals snapshot. Absent fields are `None`, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub forward_pe: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub sector: Option<String>,
    pub expense_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub total_assets: Option<f64>,
}

/// Instrument class. Stocks and ETFs are gated and weighted differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InstrumentClass {
    Stock,
    #[serde(rename = "ETF")]
    Etf,
}

impl std::fmt::Display for InstrumentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstrumentClass::Stock => write!(f, "Stock"),
            InstrumentClass::Etf => write!(f, "ETF"),
        }
    }
}

impl std::str::FromStr for InstrumentClass {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stock" => Ok(InstrumentClass::Stock),
            "etf" => Ok(InstrumentClass::Etf),
            other => Err(crate::Error::Other(format!(
                "unknown instrument class '{other}', expected Stock or ETF"
            ))),
        }
    }
}

/// A slice of the ticker universe, as selected by `screen --mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UniverseSegment {
    UsStock,
    HkStock,
    UsEtf,
    HkEtf,
}

impl UniverseSegment {
    pub const ALL: [UniverseSegment; 4] = [
        UniverseSegment::UsStock,
        UniverseSegment::HkStock,
        UniverseSegment::UsEtf,
        UniverseSegment::HkEtf,
    ];

    pub fn class(self) -> InstrumentClass {
        match self {
            UniverseSegment::UsStock | UniverseSegment::HkStock => InstrumentClass::Stock,
            UniverseSegment::UsEtf | UniverseSegment::HkEtf => InstrumentClass::Etf,
        }
    }
}

impl std::fmt::Display for UniverseSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniverseSegment::UsStock => write!(f, "US-stock"),
            UniverseSegment::HkStock => write!(f, "HK-stock"),
            UniverseSegment::UsEtf => write!(f, "US-ETF"),
            UniverseSegment::HkEtf => write!(f, "HK-ETF"),
        }
    }
}

/// A ticker queued for full analysis, typically read back from a screener report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub ticker: String,
    pub class: InstrumentClass,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn from_raw_drops_rows_with_missing_prices() {
        let rows = vec![
            RawBar {
                date: Some(day(2)),
                open: Some(10.0),
                high: Some(11.0),
                low: Some(9.0),
                close: Some(10.5),
                volume: Some(100.0),
            },
            RawBar {
                date: Some(day(3)),
                high: Some(11.0),
                low: None,
                close: Some(10.5),
                ..RawBar::default()
            },
            RawBar {
                date: Some(day(1)),
                open: None,
                high: Some(12.0),
                low: Some(8.0),
                close: Some(9.5),
                volume: None,
            },
        ];
        let series = PriceSeries::from_raw("AAPL", rows);
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars[0].date, day(1), "bars must be sorted by date");
        assert_eq!(series.bars[0].open, 9.5, "missing open falls back to close");
        assert_eq!(series.last_close(), Some(10.5));
    }

    #[test]
    fn instrument_class_parses_case_insensitively() {
        assert_eq!("etf".parse::<InstrumentClass>().unwrap(), InstrumentClass::Etf);
        assert_eq!(" Stock ".parse::<InstrumentClass>().unwrap(), InstrumentClass::Stock);
        assert!("bond".parse::<InstrumentClass>().is_err());
    }

    #[test]
    fn segments_map_to_classes() {
        assert_eq!(UniverseSegment::HkStock.class(), InstrumentClass::Stock);
        assert_eq!(UniverseSegment::UsEtf.class(), InstrumentClass::Etf);
        assert_eq!(UniverseSegment::HkEtf.to_string(), "HK-ETF");
    }
}
