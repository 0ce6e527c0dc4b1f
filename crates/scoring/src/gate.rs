use serde::Serialize;
use tracing::debug;

use common::{Fundamentals, InstrumentClass, PriceSeries};

use crate::aggregate::gate_score;
use crate::exclusion::{Exclusion, ExclusionReason};
use crate::indicators::IndicatorSet;
use crate::profile::ScoringProfile;
use crate::signals::{Pass, SignalEvaluator, SignalSet};

/// A ticker that survived the coarse screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortlistEntry {
    pub ticker: String,
    pub class: InstrumentClass,
    pub indicators: IndicatorSet,
    pub fundamentals: Fundamentals,
    pub signals: SignalSet,
    /// Number of gate signals that fired (0..=3).
    pub score: u8,
}

/// Cheap pre-filter run over the whole universe before full scoring.
///
/// A ticker is shortlisted when its class's fundamental filter passes and at
/// least `min_passes` of Momentum/Oversold/LowVol fire.
#[derive(Debug, Clone)]
pub struct ScreeningGate {
    profile: ScoringProfile,
}

impl ScreeningGate {
    pub fn new(profile: ScoringProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ScoringProfile {
        &self.profile
    }

    pub fn screen(
        &self,
        ticker: &str,
        class: InstrumentClass,
        series: &PriceSeries,
        fundamentals: &Fundamentals,
    ) -> Result<ShortlistEntry, Exclusion> {
        let class_profile = self.profile.for_class(class);
        let evaluator = SignalEvaluator::new(class_profile);
        let exclude = |reason| Exclusion::new(ticker, class, reason);

        let eval = evaluator
            .evaluate(series, fundamentals, Pass::Gate)
            .map_err(exclude)?;

        let score = gate_score(&eval.signals);
        let required = class_profile.gate.min_passes;
        if score < required {
            return Err(exclude(ExclusionReason::BelowGateMinimum {
                score,
                required,
                failed: evaluator.gate_misses(&eval.indicators, &eval.signals),
            }));
        }

        debug!(ticker, %class, score, "Shortlisted");
        Ok(ShortlistEntry {
            ticker: ticker.to_string(),
            class,
            indicators: eval.indicators,
            fundamentals: fundamentals.clone(),
            signals: eval.signals,
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclusion::GateMiss;
    use crate::test_support::{flat_series, pullback, series_from_closes, stock_fundamentals};

    #[test]
    fn quality_stock_in_pullback_is_shortlisted() {
        let gate = ScreeningGate::new(ScoringProfile::screener());
        let entry = gate
            .screen(
                "PULL",
                InstrumentClass::Stock,
                &pullback("PULL"),
                &stock_fundamentals(18.0, 0.15),
            )
            .unwrap();
        assert!(entry.indicators.ma_fast > entry.indicators.ma_slow);
        assert!(entry.indicators.rsi < 35.0, "rsi {}", entry.indicators.rsi);
        assert_eq!(entry.score, 3);
    }

    #[test]
    fn flat_stock_fails_with_named_misses() {
        let gate = ScreeningGate::new(ScoringProfile::screener());
        // Flat closes: no momentum, RSI pinned at 100; tight range keeps LowVol.
        let err = gate
            .screen(
                "FLAT",
                InstrumentClass::Stock,
                &flat_series("FLAT", 60, 100.0),
                &stock_fundamentals(18.0, 0.15),
            )
            .unwrap_err();
        assert_eq!(err.ticker, "FLAT");
        match err.reason {
            ExclusionReason::BelowGateMinimum { score, required, failed } => {
                assert_eq!(score, 1);
                assert_eq!(required, 2);
                assert_eq!(failed, vec![GateMiss::Momentum, GateMiss::Oversold { rsi: 100.0 }]);
            }
            other => panic!("unexpected reason {other:?}"),
        }
    }

    #[test]
    fn diagnostic_profile_requires_all_three() {
        let gate = ScreeningGate::new(ScoringProfile::diagnostic());
        // Steady uptrend: momentum and low vol fire but RSI is 100.
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 0.2).collect();
        let err = gate
            .screen(
                "UP",
                InstrumentClass::Stock,
                &series_from_closes("UP", &closes, 0.5),
                &stock_fundamentals(18.0, 0.15),
            )
            .unwrap_err();
        assert!(matches!(
            err.reason,
            ExclusionReason::BelowGateMinimum { score: 2, required: 3, .. }
        ));
    }

    #[test]
    fn expensive_etf_never_reaches_signal_count() {
        let gate = ScreeningGate::new(ScoringProfile::screener());
        let f = Fundamentals {
            expense_ratio: Some(0.015),
            ..Fundamentals::default()
        };
        let err = gate
            .screen("PRICY", InstrumentClass::Etf, &pullback("PRICY"), &f)
            .unwrap_err();
        assert!(matches!(err.reason, ExclusionReason::ExpenseTooHigh { .. }));
    }
}
