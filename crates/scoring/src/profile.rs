use serde::{Deserialize, Serialize};

use common::{Error, InstrumentClass, Result};

use crate::decision::DecisionThresholds;

/// Lookback lengths used to build indicators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Windows {
    pub ma_fast: usize,
    pub ma_slow: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
    /// Minimum usable bars; shorter series are excluded.
    pub min_bars: usize,
}

impl Default for Windows {
    fn default() -> Self {
        Self {
            ma_fast: 20,
            ma_slow: 50,
            rsi_period: 14,
            atr_period: 14,
            min_bars: 60,
        }
    }
}

/// Coarse gate cut-offs. Each of Momentum, Oversold and LowVol scores 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateThresholds {
    /// Oversold fires when RSI is strictly below this.
    pub rsi_max: f64,
    /// LowVol fires when ATR% is strictly below this.
    pub atr_pct_max: f64,
    /// Signals that must fire for a ticker to be shortlisted.
    pub min_passes: u8,
}

/// Hard fundamental filter for a class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FundamentalGate {
    /// Stocks: forward PE and ROE must both be present and inside the bounds.
    PeRoe { pe_max: f64, roe_min: f64 },
    /// ETFs: a reported expense ratio above `expense_max` is excluded at the
    /// gate. A missing ratio passes.
    Expense { expense_max: f64 },
}

/// ETF expense contribution in the full scoring pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpenseWeights {
    pub max: f64,
    pub within: f64,
    pub above: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YieldWeights {
    /// Reward applies when the dividend yield is strictly above this.
    pub min: f64,
    pub reward: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AumWeights {
    /// Total assets at or above this (or unreported) count as liquid.
    pub min: f64,
    pub liquid: f64,
    pub small: f64,
}

/// Weight table for the full scoring pass. `None` rows do not apply to the
/// class and contribute no signal at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub ma_bullish: f64,
    pub ma_bearish: f64,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_oversold_weight: f64,
    pub rsi_overbought_weight: f64,
    pub volatility_cap: f64,
    pub volatility_penalty: f64,
    pub expense: Option<ExpenseWeights>,
    pub dividend_yield: Option<YieldWeights>,
    pub aum: Option<AumWeights>,
}

impl ScoringWeights {
    fn base() -> Self {
        Self {
            ma_bullish: 1.5,
            ma_bearish: -1.5,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_oversold_weight: 1.0,
            rsi_overbought_weight: -1.0,
            volatility_cap: 0.05,
            volatility_penalty: -1.0,
            expense: None,
            dividend_yield: Some(YieldWeights { min: 0.02, reward: 1.0 }),
            aum: Some(AumWeights {
                min: 50_000_000.0,
                liquid: 0.5,
                small: -1.5,
            }),
        }
    }

    pub fn stock() -> Self {
        Self::base()
    }

    pub fn etf() -> Self {
        Self {
            expense: Some(ExpenseWeights {
                max: 0.01,
                within: 1.0,
                above: -2.0,
            }),
            ..Self::base()
        }
    }
}

/// Every threshold and weight used to evaluate one instrument class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProfile {
    pub class: InstrumentClass,
    pub windows: Windows,
    pub gate: GateThresholds,
    pub fundamentals: FundamentalGate,
    pub weights: ScoringWeights,
    pub decision: DecisionThresholds,
}

impl ClassProfile {
    fn validate(&self) -> Result<()> {
        let w = &self.windows;
        let fail = |msg: String| Err(Error::Config(format!("{} profile: {msg}", self.class)));

        if w.rsi_period < 2 || w.atr_period < 2 {
            return fail("RSI and ATR periods must be >= 2".into());
        }
        if w.ma_fast == 0 || w.ma_fast >= w.ma_slow {
            return fail(format!(
                "ma_fast ({}) must be positive and below ma_slow ({})",
                w.ma_fast, w.ma_slow
            ));
        }
        let needed = w.ma_slow.max(w.rsi_period + 1).max(w.atr_period + 1);
        if w.min_bars < needed {
            return fail(format!("min_bars ({}) must be at least {needed}", w.min_bars));
        }
        if !(1..=3).contains(&self.gate.min_passes) {
            return fail(format!("min_passes ({}) must be 1..=3", self.gate.min_passes));
        }
        if !(self.decision.buy > 0.0 && self.decision.sell < 0.0) {
            return fail(format!(
                "decision thresholds must satisfy buy > 0 > sell (buy={}, sell={})",
                self.decision.buy, self.decision.sell
            ));
        }
        match (self.class, self.fundamentals) {
            (InstrumentClass::Stock, FundamentalGate::PeRoe { .. })
            | (InstrumentClass::Etf, FundamentalGate::Expense { .. }) => Ok(()),
            (class, gate) => fail(format!("{gate:?} cannot gate {class}")),
        }
    }
}

/// A complete, immutable set of thresholds: one `ClassProfile` per class.
///
/// Example override file (keys not listed keep the `base` preset's values):
/// ```toml
/// base = "screener"
/// name = "looser-stocks"
///
/// [stock.gate]
/// atr_pct_max = 0.07
///
/// [etf.decision]
/// buy = 3.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringProfile {
    pub name: String,
    pub stock: ClassProfile,
    pub etf: ClassProfile,
}

impl Default for ScoringProfile {
    fn default() -> Self {
        Self::screener()
    }
}

impl ScoringProfile {
    pub const PRESETS: [&'static str; 2] = ["screener", "diagnostic"];

    /// The market screener's thresholds: RSI < 35, ATR% below 6% (stocks) or
    /// 5% (ETFs), two of three signals required.
    pub fn screener() -> Self {
        Self {
            name: "screener".to_string(),
            stock: ClassProfile {
                class: InstrumentClass::Stock,
                windows: Windows::default(),
                gate: GateThresholds {
                    rsi_max: 35.0,
                    atr_pct_max: 0.06,
                    min_passes: 2,
                },
                fundamentals: FundamentalGate::PeRoe {
                    pe_max: 25.0,
                    roe_min: 0.10,
                },
                weights: ScoringWeights::stock(),
                decision: DecisionThresholds::STOCK,
            },
            etf: ClassProfile {
                class: InstrumentClass::Etf,
                windows: Windows::default(),
                gate: GateThresholds {
                    rsi_max: 35.0,
                    atr_pct_max: 0.05,
                    min_passes: 2,
                },
                fundamentals: FundamentalGate::Expense { expense_max: 0.01 },
                weights: ScoringWeights::etf(),
                decision: DecisionThresholds::ETF,
            },
        }
    }

    /// Looser technical cut-offs (RSI < 50, ATR% < 8%) but all three signals
    /// required. Used to diagnose why a sample of tickers fails the screen.
    pub fn diagnostic() -> Self {
        let mut profile = Self::screener();
        profile.name = "diagnostic".to_string();
        for class in [&mut profile.stock, &mut profile.etf] {
            class.gate = GateThresholds {
                rsi_max: 50.0,
                atr_pct_max: 0.08,
                min_passes: 3,
            };
        }
        profile
    }

    pub fn preset(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "screener" | "gate" => Ok(Self::screener()),
            "diagnostic" => Ok(Self::diagnostic()),
            other => Err(Error::Config(format!(
                "unknown scoring profile '{other}', expected one of {:?}",
                Self::PRESETS
            ))),
        }
    }

    pub fn for_class(&self, class: InstrumentClass) -> &ClassProfile {
        match class {
            InstrumentClass::Stock => &self.stock,
            InstrumentClass::Etf => &self.etf,
        }
    }

    /// Load a profile override file. See the type-level docs for the format.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read scoring profile '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut overrides: toml::Table = toml::from_str(content)?;
        let base = match overrides.remove("base") {
            Some(toml::Value::String(name)) => Self::preset(&name)?,
            Some(other) => {
                return Err(Error::Config(format!("'base' must be a string, got {other}")))
            }
            None => Self::screener(),
        };

        let mut merged = toml::Value::try_from(&base)
            .map_err(|e| Error::Config(format!("failed to encode base profile: {e}")))?;
        merge(&mut merged, toml::Value::Table(overrides));

        let profile: ScoringProfile = merged.try_into()?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stock.class != InstrumentClass::Stock || self.etf.class != InstrumentClass::Etf {
            return Err(Error::Config(
                "profile sections [stock] and [etf] must keep their class".into(),
            ));
        }
        self.stock.validate()?;
        self.etf.validate()
    }
}

/// Recursively overlay `overlay` onto `base`. Tables merge key by key,
/// any other value replaces.
fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
