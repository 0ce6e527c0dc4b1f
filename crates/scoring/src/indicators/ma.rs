/// Simple moving average of the trailing `window` values in `data`.
/// Returns `None` when `data` is shorter than `window` or `window` is zero.
pub fn sma(data: &[f64], window: usize) -> Option<f64> {
    if window == 0 || data.len() < window {
        return None;
    }
    let tail = &data[data.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_uses_trailing_window_only() {
        let data = vec![1000.0, 1.0, 2.0, 3.0];
        assert_eq!(sma(&data, 3), Some(2.0));
    }

    #[test]
    fn sma_none_when_too_short() {
        assert!(sma(&[1.0, 2.0], 3).is_none());
        assert!(sma(&[1.0, 2.0], 0).is_none());
    }
}
