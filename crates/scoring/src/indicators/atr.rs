/// ATR (Average True Range) indicator.
///
/// True range starts at the second bar: `max(h - l, |h - prev_close|, |l - prev_close|)`.
/// The first ATR is the plain mean of the first `period` true ranges, later values
/// use Wilder smoothing. Matches TA-Lib's `ATR`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtrIndicator {
    pub period: usize,
}

impl AtrIndicator {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "ATR period must be >= 2");
        Self { period }
    }

    /// Compute the latest ATR from parallel high/low/close slices (oldest first).
    /// Returns `None` with fewer than `period + 1` bars or mismatched lengths.
    pub fn compute(&self, high: &[f64], low: &[f64], close: &[f64]) -> Option<f64> {
        let n = close.len();
        if high.len() != n || low.len() != n || n < self.period + 1 {
            return None;
        }

        let true_ranges: Vec<f64> = (1..n)
            .map(|i| {
                let prev_close = close[i - 1];
                (high[i] - low[i])
                    .max((high[i] - prev_close).abs())
                    .max((low[i] - prev_close).abs())
            })
            .collect();

        let mut atr = true_ranges[..self.period].iter().sum::<f64>() / self.period as f64;
        let smoothing = (self.period - 1) as f64;
        for &tr in &true_ranges[self.period..] {
            atr = (atr * smoothing + tr) / self.period as f64;
        }
        Some(atr)
    }
}

impl Default for AtrIndicator {
    fn default() -> Self {
        Self::new(14)
    }
}
