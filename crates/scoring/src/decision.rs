use serde::{Deserialize, Serialize};

/// Advisory label produced from a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Buy,
    Hold,
    Sell,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Buy => write!(f, "Buy"),
            Decision::Hold => write!(f, "Hold"),
            Decision::Sell => write!(f, "Sell"),
        }
    }
}

/// Score bands for one instrument class. Both bounds are inclusive and
/// `buy > 0 > sell` must hold (checked when a profile is validated).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionThresholds {
    pub buy: f64,
    pub sell: f64,
}

impl DecisionThresholds {
    pub const STOCK: DecisionThresholds = DecisionThresholds { buy: 3.0, sell: -2.0 };
    pub const ETF: DecisionThresholds = DecisionThresholds { buy: 2.5, sell: -2.0 };

    /// Map a composite score to a label. Ties go to Buy/Sell, never Hold.
    pub fn classify(&self, score: f64) -> Decision {
        if score >= self.buy {
            Decision::Buy
        } else if score <= self.sell {
            Decision::Sell
        } else {
            Decision::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_boundaries_are_inclusive() {
        let t = DecisionThresholds::STOCK;
        assert_eq!(t.classify(3.0), Decision::Buy);
        assert_eq!(t.classify(-2.0), Decision::Sell);
        assert_eq!(t.classify(-2.5), Decision::Sell);
        assert_eq!(t.classify(2.999), Decision::Hold);
        assert_eq!(t.classify(-1.999), Decision::Hold);
    }

    #[test]
    fn etf_buy_band_starts_at_two_and_a_half() {
        let t = DecisionThresholds::ETF;
        assert_eq!(t.classify(2.5), Decision::Buy);
        assert_eq!(t.classify(2.0), Decision::Hold);
    }

    #[test]
    fn nan_score_falls_back_to_hold() {
        assert_eq!(DecisionThresholds::STOCK.classify(f64::NAN), Decision::Hold);
    }

    #[test]
    fn infinite_scores_are_classified() {
        let t = DecisionThresholds::ETF;
        assert_eq!(t.classify(f64::INFINITY), Decision::Buy);
        assert_eq!(t.classify(f64::NEG_INFINITY), Decision::Sell);
    }
}
