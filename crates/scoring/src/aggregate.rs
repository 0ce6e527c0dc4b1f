use common::Fundamentals;

use crate::indicators::IndicatorSet;
use crate::profile::ScoringWeights;
use crate::signals::{SignalName, SignalSet};

/// Apply the full-pass weight table to one ticker's readings.
///
/// Rows set to `None` in `weights` are left out of the set entirely, so a
/// stock never carries an `Expense` entry.
pub fn weighted_signals(
    weights: &ScoringWeights,
    ind: &IndicatorSet,
    fundamentals: &Fundamentals,
) -> SignalSet {
    let mut signals = SignalSet::new();

    let crossover = if ind.ma_fast > ind.ma_slow {
        weights.ma_bullish
    } else {
        weights.ma_bearish
    };
    signals.insert(SignalName::MaCrossover, crossover);

    let rsi = if ind.rsi < weights.rsi_oversold {
        weights.rsi_oversold_weight
    } else if ind.rsi > weights.rsi_overbought {
        weights.rsi_overbought_weight
    } else {
        0.0
    };
    signals.insert(SignalName::Rsi, rsi);

    let volatility = if ind.atr_pct < weights.volatility_cap {
        0.0
    } else {
        weights.volatility_penalty
    };
    signals.insert(SignalName::Volatility, volatility);

    if let Some(expense) = weights.expense {
        let value = match fundamentals.expense_ratio {
            Some(ratio) if ratio > expense.max => expense.above,
            _ => expense.within,
        };
        signals.insert(SignalName::Expense, value);
    }

    if let Some(dividend) = weights.dividend_yield {
        let value = match fundamentals.dividend_yield {
            Some(y) if y > dividend.min => dividend.reward,
            _ => 0.0,
        };
        signals.insert(SignalName::Yield, value);
    }

    if let Some(aum) = weights.aum {
        let value = match fundamentals.total_assets {
            Some(assets) if assets < aum.min => aum.small,
            _ => aum.liquid,
        };
        signals.insert(SignalName::Aum, value);
    }

    signals
}

/// Composite score: the plain sum of every contribution in the set.
pub fn composite_score(signals: &SignalSet) -> f64 {
    signals.values().sum()
}

/// Coarse gate score: how many of Momentum/Oversold/LowVol fired (0..=3).
pub fn gate_score(signals: &SignalSet) -> u8 {
    SignalName::GATE
        .into_iter()
        .filter(|name| signals.get(*name).is_some_and(|v| v >= 1.0))
        .count() as u8
}
