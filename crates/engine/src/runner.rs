use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use common::{
    Candidate, Error, Fundamentals, FundamentalsProvider, InstrumentClass, MarketDataProvider,
    PriceSeries, UniverseSegment,
};
use scoring::{
    Analyzer, Exclusion, ExclusionReason, ScoreRecord, ScoringProfile, ScreeningGate,
    ShortlistEntry,
};

use crate::throttle::Throttle;

/// History requested for the coarse screen.
pub const SCREEN_PERIOD: &str = "90d";
/// History requested for full scoring; a little longer so MA50 has slack.
pub const ANALYSIS_PERIOD: &str = "120d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct ScreenReport {
    pub summary: RunSummary,
    pub shortlisted: Vec<ShortlistEntry>,
    pub excluded: Vec<Exclusion>,
}

/// Outcomes in input order. Excluded tickers stay in the list so the
/// report can still print them.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub summary: RunSummary,
    pub outcomes: Vec<Result<ScoreRecord, Exclusion>>,
}

impl AnalysisReport {
    pub fn records(&self) -> impl Iterator<Item = &ScoreRecord> {
        self.outcomes.iter().filter_map(|o| o.as_ref().ok())
    }

    pub fn excluded(&self) -> impl Iterator<Item = &Exclusion> {
        self.outcomes.iter().filter_map(|o| o.as_ref().err())
    }
}

/// Sequential fetch-and-score loop over a ticker list.
///
/// One ticker's failure never stops the batch: fetch errors become
/// `FetchFailed` exclusions and the loop moves on after the throttle pause.
pub struct BatchRunner {
    market: Arc<dyn MarketDataProvider>,
    fundamentals: Arc<dyn FundamentalsProvider>,
    throttle: Throttle,
    screen_period: String,
    analysis_period: String,
}

impl BatchRunner {
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        fundamentals: Arc<dyn FundamentalsProvider>,
        throttle: Throttle,
    ) -> Self {
        Self {
            market,
            fundamentals,
            throttle,
            screen_period: SCREEN_PERIOD.to_string(),
            analysis_period: ANALYSIS_PERIOD.to_string(),
        }
    }

    pub fn with_periods(mut self, screen: &str, analysis: &str) -> Self {
        self.screen_period = screen.to_string();
        self.analysis_period = analysis.to_string();
        self
    }

    /// Run the coarse gate over every segment's tickers.
    pub async fn screen(
        &self,
        batches: &[(UniverseSegment, Vec<String>)],
        gate: &ScreeningGate,
    ) -> ScreenReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("screen", %run_id, profile = %gate.profile().name);
        async {
            let mut shortlisted = Vec::new();
            let mut excluded = Vec::new();

            for (segment, tickers) in batches {
                let class = segment.class();
                info!(%segment, count = tickers.len(), "Screening segment");
                for ticker in tickers {
                    match self.screen_one(ticker, class, gate).await {
                        Ok(entry) => {
                            info!(ticker = %entry.ticker, score = entry.score, "Shortlisted");
                            shortlisted.push(entry);
                        }
                        Err(exclusion) => {
                            info!(%ticker, reason = %exclusion.reason, "Excluded");
                            excluded.push(exclusion);
                        }
                    }
                    self.throttle.pause().await;
                }
            }

            let summary = summarize(run_id, shortlisted.len(), excluded.len());
            info!(
                total = summary.total,
                passed = summary.passed,
                failed = summary.failed,
                "Screen complete"
            );
            ScreenReport {
                summary,
                shortlisted,
                excluded,
            }
        }
        .instrument(span)
        .await
    }

    /// Check a sample of stock tickers against `gate` and log one
    /// PASS/failure line per ticker.
    pub async fn diagnose(&self, tickers: &[String], gate: &ScreeningGate) -> ScreenReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("diagnose", %run_id, profile = %gate.profile().name);
        async {
            let mut shortlisted = Vec::new();
            let mut excluded = Vec::new();

            for ticker in tickers {
                match self.screen_one(ticker, InstrumentClass::Stock, gate).await {
                    Ok(entry) => {
                        info!(
                            %ticker,
                            score = entry.score,
                            rsi = entry.indicators.rsi,
                            atr_pct = entry.indicators.atr_pct,
                            "PASS"
                        );
                        shortlisted.push(entry);
                    }
                    Err(exclusion) => {
                        info!(%ticker, reason = %exclusion.reason, "FAIL");
                        excluded.push(exclusion);
                    }
                }
                self.throttle.pause().await;
            }

            let summary = summarize(run_id, shortlisted.len(), excluded.len());
            info!(passed = summary.passed, total = summary.total, "Diagnostic complete");
            ScreenReport {
                summary,
                shortlisted,
                excluded,
            }
        }
        .instrument(span)
        .await
    }

    /// Fully score a candidate list.
    pub async fn analyze(&self, candidates: &[Candidate], analyzer: &Analyzer) -> AnalysisReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("analyze", %run_id, profile = %analyzer.profile().name);
        async {
            let mut outcomes = Vec::with_capacity(candidates.len());

            for Candidate { ticker, class } in candidates {
                let outcome = match self
                    .fetch(ticker, *class, analyzer.profile(), &self.analysis_period)
                    .await
                {
                    Ok((series, fundamentals)) => {
                        analyzer.analyze(ticker, *class, &series, &fundamentals)
                    }
                    Err(e) => Err(fetch_failed(ticker, *class, e)),
                };
                match &outcome {
                    Ok(record) => info!(
                        %ticker,
                        score = record.composite_score,
                        decision = %record.decision,
                        "Scored"
                    ),
                    Err(exclusion) => info!(%ticker, reason = %exclusion.reason, "Not scored"),
                }
                outcomes.push(outcome);
                self.throttle.pause().await;
            }

            let passed = outcomes.iter().filter(|o| o.is_ok()).count();
            let summary = summarize(run_id, passed, outcomes.len() - passed);
            info!(
                total = summary.total,
                scored = summary.passed,
                excluded = summary.failed,
                "Analysis complete"
            );
            AnalysisReport { summary, outcomes }
        }
        .instrument(span)
        .await
    }

    async fn screen_one(
        &self,
        ticker: &str,
        class: InstrumentClass,
        gate: &ScreeningGate,
    ) -> Result<ShortlistEntry, Exclusion> {
        let (series, fundamentals) = self
            .fetch(ticker, class, gate.profile(), &self.screen_period)
            .await
            .map_err(|e| fetch_failed(ticker, class, e))?;
        gate.screen(ticker, class, &series, &fundamentals)
    }

    /// Bars first; fundamentals are only requested when the history is
    /// long enough to be scored at all.
    async fn fetch(
        &self,
        ticker: &str,
        class: InstrumentClass,
        profile: &ScoringProfile,
        period: &str,
    ) -> common::Result<(PriceSeries, Fundamentals)> {
        let series = match self.market.daily_bars(ticker, period).await {
            Ok(series) => series,
            Err(Error::NoData(_)) => PriceSeries::empty(ticker),
            Err(e) => return Err(e),
        };

        if series.len() < profile.for_class(class).windows.min_bars {
            return Ok((series, Fundamentals::default()));
        }

        let fundamentals = self.fundamentals.fundamentals(ticker).await?;
        Ok((series, fundamentals))
    }
}

fn fetch_failed(ticker: &str, class: InstrumentClass, e: Error) -> Exclusion {
    warn!(%ticker, error = %e, "Fetch failed");
    Exclusion::new(ticker, class, ExclusionReason::FetchFailed(e.to_string()))
}

fn summarize(run_id: Uuid, passed: usize, failed: usize) -> RunSummary {
    RunSummary {
        run_id,
        total: passed + failed,
        passed,
        failed,
    }
}
