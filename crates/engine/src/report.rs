//! CSV output for screen and analysis runs, and reading a shortlist back in.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use common::{Candidate, InstrumentClass, Result};
use scoring::{Exclusion, ScoreRecord, ShortlistEntry, SignalName};

pub fn shortlist_path(dir: &Path, mode: &str) -> PathBuf {
    dir.join(format!("screened_candidates_{mode}.csv"))
}

pub fn analysis_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("smart_analysis_{}.csv", date.format("%Y-%m-%d")))
}

fn round_to(x: f64, dp: i32) -> f64 {
    let scale = 10f64.powi(dp);
    (x * scale).round() / scale
}

// ─── Shortlist ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ShortlistRow<'a> {
    #[serde(rename = "Ticker")]
    ticker: &'a str,
    #[serde(rename = "Type")]
    class: InstrumentClass,
    #[serde(rename = "Sector")]
    sector: Option<&'a str>,
    #[serde(rename = "PE")]
    pe: Option<f64>,
    #[serde(rename = "ROE")]
    roe: Option<f64>,
    #[serde(rename = "ExpenseRatio")]
    expense_ratio: Option<f64>,
    #[serde(rename = "MA20")]
    ma_fast: f64,
    #[serde(rename = "MA50")]
    ma_slow: f64,
    #[serde(rename = "RSI")]
    rsi: f64,
    #[serde(rename = "ATR%")]
    atr_pct: f64,
    #[serde(rename = "Momentum")]
    momentum: u8,
    #[serde(rename = "Oversold")]
    oversold: u8,
    #[serde(rename = "LowVol")]
    low_vol: u8,
    #[serde(rename = "Score")]
    score: u8,
}

impl<'a> From<&'a ShortlistEntry> for ShortlistRow<'a> {
    fn from(e: &'a ShortlistEntry) -> Self {
        let fired = |name| u8::from(e.signals.get(name).unwrap_or(0.0) >= 1.0);
        Self {
            ticker: &e.ticker,
            class: e.class,
            sector: e.fundamentals.sector.as_deref(),
            pe: e.fundamentals.forward_pe.map(|v| round_to(v, 2)),
            roe: e.fundamentals.return_on_equity.map(|v| round_to(v, 4)),
            expense_ratio: e.fundamentals.expense_ratio.map(|v| round_to(v, 4)),
            ma_fast: round_to(e.indicators.ma_fast, 2),
            ma_slow: round_to(e.indicators.ma_slow, 2),
            rsi: round_to(e.indicators.rsi, 2),
            atr_pct: round_to(e.indicators.atr_pct, 4),
            momentum: fired(SignalName::Momentum),
            oversold: fired(SignalName::Oversold),
            low_vol: fired(SignalName::LowVol),
            score: e.score,
        }
    }
}

pub fn write_shortlist_to<W: Write>(writer: W, entries: &[ShortlistEntry]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for entry in entries {
        wtr.serialize(ShortlistRow::from(entry))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_shortlist(path: &Path, entries: &[ShortlistEntry]) -> Result<()> {
    write_shortlist_to(File::create(path)?, entries)?;
    info!(path = %path.display(), rows = entries.len(), "Shortlist written");
    Ok(())
}

// ─── Analysis ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Serialize)]
struct AnalysisRow<'a> {
    #[serde(rename = "Ticker")]
    ticker: &'a str,
    #[serde(rename = "Type")]
    class: Option<InstrumentClass>,
    #[serde(rename = "PE")]
    pe: Option<f64>,
    #[serde(rename = "ROE")]
    roe: Option<f64>,
    #[serde(rename = "ExpenseRatio")]
    expense_ratio: Option<f64>,
    #[serde(rename = "Yield")]
    dividend_yield: Option<f64>,
    #[serde(rename = "AUM")]
    aum: Option<f64>,
    #[serde(rename = "MA20")]
    ma_fast: Option<f64>,
    #[serde(rename = "MA50")]
    ma_slow: Option<f64>,
    #[serde(rename = "RSI")]
    rsi: Option<f64>,
    #[serde(rename = "ATR%")]
    atr_pct: Option<f64>,
    #[serde(rename = "Score")]
    score: Option<f64>,
    #[serde(rename = "Decision")]
    decision: String,
}

impl<'a> From<&'a ScoreRecord> for AnalysisRow<'a> {
    fn from(r: &'a ScoreRecord) -> Self {
        let f = &r.fundamentals;
        Self {
            ticker: &r.ticker,
            class: Some(r.class),
            pe: f.forward_pe.map(|v| round_to(v, 2)),
            roe: f.return_on_equity.map(|v| round_to(v, 4)),
            expense_ratio: f.expense_ratio.map(|v| round_to(v, 4)),
            dividend_yield: f.dividend_yield.map(|v| round_to(v, 4)),
            aum: f.total_assets,
            ma_fast: Some(round_to(r.indicators.ma_fast, 2)),
            ma_slow: Some(round_to(r.indicators.ma_slow, 2)),
            rsi: Some(round_to(r.indicators.rsi, 2)),
            atr_pct: Some(round_to(r.indicators.atr_pct, 4)),
            score: Some(round_to(r.composite_score, 2)),
            decision: r.decision.to_string(),
        }
    }
}

/// Decision column for a ticker that was not scored: `N/A` when there was
/// not enough data, `Excluded` when a filter rejected it.
fn exclusion_label(e: &Exclusion) -> &'static str {
    if e.reason.is_data_insufficient() {
        "N/A"
    } else {
        "Excluded"
    }
}

impl<'a> From<&'a Exclusion> for AnalysisRow<'a> {
    fn from(e: &'a Exclusion) -> Self {
        Self {
            ticker: &e.ticker,
            class: Some(e.class),
            decision: exclusion_label(e).to_string(),
            ..Default::default()
        }
    }
}

pub fn write_analysis_to<W: Write>(
    writer: W,
    outcomes: &[std::result::Result<ScoreRecord, Exclusion>],
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for outcome in outcomes {
        let row = match outcome {
            Ok(record) => AnalysisRow::from(record),
            Err(exclusion) => AnalysisRow::from(exclusion),
        };
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_analysis(
    path: &Path,
    outcomes: &[std::result::Result<ScoreRecord, Exclusion>],
) -> Result<()> {
    write_analysis_to(File::create(path)?, outcomes)?;
    info!(path = %path.display(), rows = outcomes.len(), "Analysis written");
    Ok(())
}

// ─── Reading candidates back ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CandidateRow {
    #[serde(rename = "Ticker")]
    ticker: String,
    #[serde(rename = "Type")]
    class: InstrumentClass,
}

/// Read `Ticker,Type` from any CSV with a header row; other columns are
/// ignored.
pub fn read_candidates_from<R: Read>(reader: R) -> Result<Vec<Candidate>> {
    let mut rdr = csv::Reader::from_reader(reader);
    rdr.deserialize::<CandidateRow>()
        .map(|row| -> Result<Candidate> {
            let row = row?;
            Ok(Candidate {
                ticker: row.ticker.trim().to_string(),
                class: row.class,
            })
        })
        .collect()
}

pub fn read_candidates(path: &Path) -> Result<Vec<Candidate>> {
    read_candidates_from(File::open(path)?)
}
