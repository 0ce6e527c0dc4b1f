use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tracing::info;

use common::{Error, Result, UniverseProvider, UniverseSegment};

pub const US_ETF_TICKERS: [&str; 10] = [
    "SPY", "IVV", "VOO", "VTI", "QQQ", "VUG", "VTV", "BND", "AGG", "IEMG",
];
pub const HK_ETF_TICKERS: [&str; 5] = ["2800.HK", "2805.HK", "2836.HK", "3040.HK", "3110.HK"];

/// Universe backed by the built-in ETF lists and one symbol file per stock
/// segment (`us-stock.txt`, `hk-stock.txt`) under `dir`.
///
/// Symbol files hold one ticker per line; blank lines, `#` comments and a
/// `Symbol`/`Ticker`/`Code` header are skipped, and only the first
/// comma- or whitespace-separated field is read, so an exported index
/// membership CSV works as-is.
#[derive(Debug, Clone)]
pub struct StaticUniverse {
    dir: PathBuf,
}

impl StaticUniverse {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_for(&self, segment: UniverseSegment) -> Option<PathBuf> {
        match segment {
            UniverseSegment::UsStock => Some(self.dir.join("us-stock.txt")),
            UniverseSegment::HkStock => Some(self.dir.join("hk-stock.txt")),
            UniverseSegment::UsEtf | UniverseSegment::HkEtf => None,
        }
    }

    fn read_list(path: &Path) -> Result<Vec<String>> {
        std::fs::read_to_string(path).map(|c| parse_ticker_list(&c)).map_err(|e| {
            Error::Config(format!("universe file '{}' not readable: {e}", path.display()))
        })
    }
}

#[async_trait]
impl UniverseProvider for StaticUniverse {
    async fn tickers(&self, segment: UniverseSegment) -> Result<Vec<String>> {
        let normalize: fn(&str) -> Option<String> = match segment {
            UniverseSegment::UsEtf => return Ok(US_ETF_TICKERS.iter().map(|t| t.to_string()).collect()),
            UniverseSegment::HkEtf => return Ok(HK_ETF_TICKERS.iter().map(|t| t.to_string()).collect()),
            UniverseSegment::UsStock => normalize_us,
            UniverseSegment::HkStock => normalize_hk,
        };
        let path = self
            .file_for(segment)
            .ok_or_else(|| Error::Config(format!("no universe file for {segment}")))?;
        let tickers = Self::read_list(&path)?
            .iter()
            .filter_map(|t| normalize(t))
            .collect();
        let tickers = dedupe(tickers);
        info!(%segment, count = tickers.len(), "Loaded universe");
        Ok(tickers)
    }
}

/// First field of every non-comment, non-header line.
pub fn parse_ticker_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter_map(|line| line.split([',', ' ', '\t']).map(str::trim).find(|f| !f.is_empty()))
        .map(|field| field.trim_matches('"').to_string())
        .filter(|field| {
            !field.is_empty()
                && !["symbol", "ticker", "code", "stock code"].contains(&field.to_ascii_lowercase().as_str())
        })
        .collect()
}

/// US listings use `-` for share classes on Yahoo (`BRK.B` -> `BRK-B`).
pub fn normalize_us(symbol: &str) -> Option<String> {
    let s = symbol.trim();
    if s.is_empty() {
        return None;
    }
    Some(s.to_ascii_uppercase().replace('.', "-"))
}

/// Hong Kong codes become zero-padded four-digit `.HK` symbols
/// (`5` -> `0005.HK`, `"HKEX: 700"` -> `0700.HK`).
pub fn normalize_hk(code: &str) -> Option<String> {
    let base = code.trim().trim_end_matches(".HK").trim_end_matches(".hk");
    let digits: String = base.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    Some(format!("{digits:0>4}.HK"))
}

/// Drop repeats, keeping first occurrences.
pub fn dedupe(tickers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tickers.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

/// Random sample of up to `n` tickers, for diagnostic runs.
pub fn sample(tickers: &[String], n: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    tickers.choose_multiple(&mut rng, n).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_lists_and_csv_exports() {
        let content = "Symbol,Security,Sector\nMMM,3M,Industrials\n# comment\n\n  AOS  \n\"ABT\",Abbott\n";
        assert_eq!(parse_ticker_list(content), vec!["MMM", "AOS", "ABT"]);
    }

    #[test]
    fn hk_codes_are_zero_padded() {
        assert_eq!(normalize_hk("5").as_deref(), Some("0005.HK"));
        assert_eq!(normalize_hk("HKEX: 700").as_deref(), Some("0700.HK"));
        assert_eq!(normalize_hk("0005.HK").as_deref(), Some("0005.HK"));
        assert_eq!(normalize_hk("N/A"), None);
    }

    #[test]
    fn us_share_classes_use_dash() {
        assert_eq!(normalize_us("brk.b").as_deref(), Some("BRK-B"));
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let t = dedupe(vec!["A".into(), "B".into(), "A".into()]);
        assert_eq!(t, vec!["A", "B"]);
    }

    #[test]
    fn sample_never_exceeds_universe() {
        let universe: Vec<String> = (0..5).map(|i| format!("T{i}")).collect();
        assert_eq!(sample(&universe, 3).len(), 3);
        assert_eq!(sample(&universe, 50).len(), 5);
    }

    #[tokio::test]
    async fn etf_segments_are_built_in() {
        let universe = StaticUniverse::new("/nonexistent");
        let us = universe.tickers(UniverseSegment::UsEtf).await.unwrap();
        assert_eq!(us.len(), 10);
        assert!(us.contains(&"QQQ".to_string()));
        let hk = universe.tickers(UniverseSegment::HkEtf).await.unwrap();
        assert_eq!(hk[0], "2800.HK");
    }

    #[tokio::test]
    async fn missing_stock_file_is_a_config_error() {
        let universe = StaticUniverse::new("/nonexistent");
        assert!(matches!(
            universe.tickers(UniverseSegment::UsStock).await,
            Err(Error::Config(_))
        ));
    }
}
