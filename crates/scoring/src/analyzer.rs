use serde::Serialize;
use tracing::debug;

use common::{Fundamentals, InstrumentClass, PriceSeries};

use crate::aggregate::composite_score;
use crate::decision::Decision;
use crate::exclusion::Exclusion;
use crate::indicators::IndicatorSet;
use crate::profile::ScoringProfile;
use crate::signals::{Pass, SignalEvaluator, SignalSet};

/// Result of the full scoring pass for one ticker. Built once per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub ticker: String,
    pub class: InstrumentClass,
    pub indicators: IndicatorSet,
    pub fundamentals: Fundamentals,
    pub signals: SignalSet,
    pub composite_score: f64,
    pub decision: Decision,
}

/// Full weighted scoring pass: signals, composite score and decision.
#[derive(Debug, Clone)]
pub struct Analyzer {
    profile: ScoringProfile,
}

impl Analyzer {
    pub fn new(profile: ScoringProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ScoringProfile {
        &self.profile
    }

    pub fn analyze(
        &self,
        ticker: &str,
        class: InstrumentClass,
        series: &PriceSeries,
        fundamentals: &Fundamentals,
    ) -> Result<ScoreRecord, Exclusion> {
        let class_profile = self.profile.for_class(class);
        let eval = SignalEvaluator::new(class_profile)
            .evaluate(series, fundamentals, Pass::Scoring)
            .map_err(|reason| Exclusion::new(ticker, class, reason))?;

        let composite_score = composite_score(&eval.signals);
        let decision = class_profile.decision.classify(composite_score);
        debug!(ticker, %class, score = composite_score, %decision, "Scored");

        Ok(ScoreRecord {
            ticker: ticker.to_string(),
            class,
            indicators: eval.indicators,
            fundamentals: fundamentals.clone(),
            signals: eval.signals,
            composite_score,
            decision,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclusion::ExclusionReason;
    use crate::signals::SignalName;
    use crate::test_support::{flat_series, pullback, series_from_closes, stock_fundamentals};

    #[test]
    fn oversold_uptrend_stock_is_a_buy() {
        let analyzer = Analyzer::new(ScoringProfile::screener());
        let record = analyzer
            .analyze("PULL", InstrumentClass::Stock, &pullback("PULL"), &stock_fundamentals(18.0, 0.15))
            .unwrap();
        // MA +1.5, RSI +1.0 (29.2), Volatility 0, Yield 0, AUM +0.5
        assert_eq!(record.signals.get(SignalName::Rsi), Some(1.0));
        assert_eq!(record.composite_score, 3.0);
        assert_eq!(record.decision, Decision::Buy);
    }

    #[test]
    fn falling_small_expensive_etf_is_a_sell() {
        let closes: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let f = Fundamentals {
            expense_ratio: Some(0.02),
            total_assets: Some(5_000_000.0),
            ..Fundamentals::default()
        };
        let record = Analyzer::new(ScoringProfile::screener())
            .analyze("DOWN", InstrumentClass::Etf, &series_from_closes("DOWN", &closes, 0.5), &f)
            .unwrap();
        // MA -1.5, RSI +1.0 (pinned at 0), Volatility 0, Expense -2, Yield 0, AUM -1.5
        assert_eq!(record.signals.get(SignalName::Rsi), Some(1.0));
        assert_eq!(record.composite_score, -4.0);
        assert_eq!(record.decision, Decision::Sell);
    }

    #[test]
    fn composite_equals_sum_of_signals() {
        let record = Analyzer::new(ScoringProfile::screener())
            .analyze(
                "FLAT",
                InstrumentClass::Etf,
                &flat_series("FLAT", 70, 40.0),
                &Fundamentals::default(),
            )
            .unwrap();
        let sum: f64 = record.signals.values().sum();
        let thresholds = ScoringProfile::screener().etf.decision;
        assert_eq!(record.composite_score, sum);
        assert_eq!(record.decision, thresholds.classify(sum));
    }

    #[test]
    fn negative_close_mid_series_is_never_labelled() {
        let mut series = flat_series("BAD", 60, 100.0);
        series.bars[30].close = -50.0;
        let err = Analyzer::new(ScoringProfile::screener())
            .analyze("BAD", InstrumentClass::Etf, &series, &Fundamentals::default())
            .unwrap_err();
        assert_eq!(err.reason, ExclusionReason::MissingPriceData);
        assert!(err.reason.is_data_insufficient());
    }

    #[test]
    fn rejected_stock_fundamentals_yield_exclusion_not_record() {
        let err = Analyzer::new(ScoringProfile::screener())
            .analyze("PRICEY", InstrumentClass::Stock, &pullback("PRICEY"), &stock_fundamentals(40.0, 0.3))
            .unwrap_err();
        assert_eq!(err.class, InstrumentClass::Stock);
        assert!(matches!(err.reason, ExclusionReason::FundamentalsRejected { .. }));
        assert!(!err.reason.is_data_insufficient());
    }
}
