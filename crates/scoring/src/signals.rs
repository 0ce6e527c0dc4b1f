use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use common::{Fundamentals, PriceSeries};

use crate::aggregate;
use crate::exclusion::{ExclusionReason, FundamentalCheck, GateMiss};
use crate::indicators::IndicatorSet;
use crate::profile::{ClassProfile, FundamentalGate};

/// Name of a single scored signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalName {
    // Coarse gate (0/1)
    Momentum,
    Oversold,
    LowVol,
    // Full scoring pass (weighted)
    MaCrossover,
    Rsi,
    Volatility,
    Expense,
    Yield,
    Aum,
}

impl SignalName {
    pub const GATE: [SignalName; 3] = [SignalName::Momentum, SignalName::Oversold, SignalName::LowVol];
}

impl std::fmt::Display for SignalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SignalName::Momentum => "Momentum",
            SignalName::Oversold => "Oversold",
            SignalName::LowVol => "LowVol",
            SignalName::MaCrossover => "MA Crossover",
            SignalName::Rsi => "RSI",
            SignalName::Volatility => "Volatility",
            SignalName::Expense => "Expense",
            SignalName::Yield => "Yield",
            SignalName::Aum => "AUM",
        };
        f.write_str(name)
    }
}

impl Serialize for SignalName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Signal contributions keyed by name, iterated in a fixed order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalSet(BTreeMap<SignalName, f64>);

impl SignalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: SignalName, value: f64) {
        self.0.insert(name, value);
    }

    pub fn get(&self, name: SignalName) -> Option<f64> {
        self.0.get(&name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SignalName, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.values().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(SignalName, f64)> for SignalSet {
    fn from_iter<I: IntoIterator<Item = (SignalName, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Which rule set the evaluator applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Cheap pre-filter: binary Momentum/Oversold/LowVol plus hard
    /// fundamental exclusion.
    Gate,
    /// Weighted signals feeding the Buy/Hold/Sell decision.
    Scoring,
}

/// Indicators and signals for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub indicators: IndicatorSet,
    pub signals: SignalSet,
}

/// Turns one ticker's price history and fundamentals into a `SignalSet`,
/// driven entirely by a `ClassProfile`. Stateless and deterministic.
#[derive(Debug, Clone, Copy)]
pub struct SignalEvaluator<'a> {
    profile: &'a ClassProfile,
}

impl<'a> SignalEvaluator<'a> {
    pub fn new(profile: &'a ClassProfile) -> Self {
        Self { profile }
    }

    pub fn evaluate(
        &self,
        series: &PriceSeries,
        fundamentals: &Fundamentals,
        pass: Pass,
    ) -> Result<Evaluation, ExclusionReason> {
        let windows = &self.profile.windows;
        if series.len() < windows.min_bars {
            return Err(ExclusionReason::InsufficientHistory {
                bars: series.len(),
                required: windows.min_bars,
            });
        }

        self.check_fundamentals(fundamentals, pass)?;
        let indicators = IndicatorSet::compute(series, windows)?;

        let signals = match pass {
            Pass::Gate => self.gate_signals(&indicators),
            Pass::Scoring => aggregate::weighted_signals(&self.profile.weights, &indicators, fundamentals),
        };

        Ok(Evaluation { indicators, signals })
    }

    /// Binary gate signals. `Momentum` needs a strictly higher fast MA.
    pub fn gate_signals(&self, ind: &IndicatorSet) -> SignalSet {
        let gate = &self.profile.gate;
        [
            (SignalName::Momentum, ind.ma_fast > ind.ma_slow),
            (SignalName::Oversold, ind.rsi < gate.rsi_max),
            (SignalName::LowVol, ind.atr_pct < gate.atr_pct_max),
        ]
        .into_iter()
        .map(|(name, fired)| (name, if fired { 1.0 } else { 0.0 }))
        .collect()
    }

    /// Gate signals that did not fire, with the readings that failed them.
    pub fn gate_misses(&self, ind: &IndicatorSet, signals: &SignalSet) -> Vec<GateMiss> {
        SignalName::GATE
            .into_iter()
            .filter(|name| signals.get(*name).unwrap_or(0.0) < 1.0)
            .map(|name| match name {
                SignalName::Oversold => GateMiss::Oversold { rsi: ind.rsi },
                SignalName::LowVol => GateMiss::LowVol { atr_pct: ind.atr_pct },
                _ => GateMiss::Momentum,
            })
            .collect()
    }

    fn check_fundamentals(&self, f: &Fundamentals, pass: Pass) -> Result<(), ExclusionReason> {
        match self.profile.fundamentals {
            FundamentalGate::PeRoe { pe_max, roe_min } => {
                let mut failures = Vec::new();
                match f.forward_pe {
                    None => failures.push(FundamentalCheck::PeMissing),
                    Some(pe) if !(pe <= pe_max) => {
                        failures.push(FundamentalCheck::PeAbove { pe, max: pe_max })
                    }
                    Some(_) => {}
                }
                match f.return_on_equity {
                    None => failures.push(FundamentalCheck::RoeMissing),
                    Some(roe) if !(roe >= roe_min) => {
                        failures.push(FundamentalCheck::RoeBelow { roe, min: roe_min })
                    }
                    Some(_) => {}
                }
                if failures.is_empty() {
                    Ok(())
                } else {
                    Err(ExclusionReason::FundamentalsRejected { failures })
                }
            }
            // In the scoring pass expense is a graded signal instead.
            FundamentalGate::Expense { expense_max } => match (pass, f.expense_ratio) {
                (Pass::Gate, Some(ratio)) if ratio > expense_max => {
                    Err(ExclusionReason::ExpenseTooHigh { ratio, max: expense_max })
                }
                _ => Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ScoringProfile;
    use crate::test_support::{flat_series, stock_fundamentals};

    fn indicators(ma_fast: f64, ma_slow: f64, rsi: f64, atr_pct: f64) -> IndicatorSet {
        IndicatorSet {
            ma_fast,
            ma_slow,
            rsi,
            atr: atr_pct * 100.0,
            atr_pct,
            last_close: 100.0,
        }
    }

    #[test]
    fn stock_scenario_fires_all_gate_signals() {
        let profile = ScoringProfile::screener();
        let eval = SignalEvaluator::new(&profile.stock);
        let signals = eval.gate_signals(&indicators(105.0, 100.0, 25.0, 0.03));
        assert_eq!(signals.get(SignalName::Momentum), Some(1.0));
        assert_eq!(signals.get(SignalName::Oversold), Some(1.0));
        assert_eq!(signals.get(SignalName::LowVol), Some(1.0));
        assert_eq!(aggregate::gate_score(&signals), 3);
    }

    #[test]
    fn equal_moving_averages_do_not_count_as_momentum() {
        let profile = ScoringProfile::screener();
        let eval = SignalEvaluator::new(&profile.stock);
        let signals = eval.gate_signals(&indicators(100.0, 100.0, 50.0, 0.10));
        assert_eq!(signals.get(SignalName::Momentum), Some(0.0));
        let misses = eval.gate_misses(&indicators(100.0, 100.0, 50.0, 0.10), &signals);
        assert_eq!(misses.len(), 3);
        assert_eq!(misses[0], GateMiss::Momentum);
    }

    #[test]
    fn etf_low_vol_uses_etf_cap() {
        let profile = ScoringProfile::screener();
        let ind = indicators(100.0, 101.0, 50.0, 0.055);
        let stock = SignalEvaluator::new(&profile.stock).gate_signals(&ind);
        let etf = SignalEvaluator::new(&profile.etf).gate_signals(&ind);
        assert_eq!(stock.get(SignalName::LowVol), Some(1.0));
        assert_eq!(etf.get(SignalName::LowVol), Some(0.0));
    }

    #[test]
    fn short_history_is_excluded_before_fundamentals() {
        let profile = ScoringProfile::screener();
        let eval = SignalEvaluator::new(&profile.stock);
        let err = eval
            .evaluate(&flat_series("AAA", 30, 100.0), &Fundamentals::default(), Pass::Gate)
            .unwrap_err();
        assert!(matches!(err, ExclusionReason::InsufficientHistory { bars: 30, .. }));
    }

    #[test]
    fn stock_fundamental_gate_lists_each_failure() {
        let profile = ScoringProfile::screener();
        let eval = SignalEvaluator::new(&profile.stock);
        let f = Fundamentals {
            forward_pe: Some(31.0),
            return_on_equity: None,
            ..Fundamentals::default()
        };
        for pass in [Pass::Gate, Pass::Scoring] {
            let err = eval.evaluate(&flat_series("AAA", 60, 100.0), &f, pass).unwrap_err();
            assert_eq!(
                err,
                ExclusionReason::FundamentalsRejected {
                    failures: vec![
                        FundamentalCheck::PeAbove { pe: 31.0, max: 25.0 },
                        FundamentalCheck::RoeMissing,
                    ]
                }
            );
        }
    }

    #[test]
    fn stock_fundamental_bounds_are_inclusive() {
        let profile = ScoringProfile::screener();
        let eval = SignalEvaluator::new(&profile.stock);
        let f = stock_fundamentals(25.0, 0.10);
        assert!(eval.evaluate(&flat_series("AAA", 60, 100.0), &f, Pass::Gate).is_ok());
    }

    #[test]
    fn expensive_etf_is_excluded_at_gate_but_scored_in_full_pass() {
        let profile = ScoringProfile::screener();
        let eval = SignalEvaluator::new(&profile.etf);
        let f = Fundamentals {
            expense_ratio: Some(0.015),
            ..Fundamentals::default()
        };
        let series = flat_series("EXP", 60, 50.0);

        let err = eval.evaluate(&series, &f, Pass::Gate).unwrap_err();
        assert_eq!(err, ExclusionReason::ExpenseTooHigh { ratio: 0.015, max: 0.01 });

        let scored = eval.evaluate(&series, &f, Pass::Scoring).unwrap();
        assert_eq!(scored.signals.get(SignalName::Expense), Some(-2.0));
    }

    #[test]
    fn etf_without_expense_ratio_passes_gate() {
        let profile = ScoringProfile::screener();
        let eval = SignalEvaluator::new(&profile.etf);
        let series = flat_series("NOEXP", 60, 50.0);
        assert!(eval.evaluate(&series, &Fundamentals::default(), Pass::Gate).is_ok());
    }
}
