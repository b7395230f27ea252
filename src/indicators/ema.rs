// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
//   k     = 2 / (period + 1)
//   EMA_t = x_t * k + EMA_{t-1} * (1 - k)
//
// Seeded with the SMA of the first `period` values.
// =============================================================================

use serde::Serialize;

/// Compute the EMA series for `values` and look-back `period`.
///
/// Each output element corresponds to an input starting at index `period - 1`.
///
/// # Edge cases
/// - `period == 0` or `values.len() < period` => empty vec
/// - A non-finite intermediate value stops the series.
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let k = 2.0 / (period + 1) as f64;

    let seed: f64 = values[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(values.len() - period + 1);
    result.push(seed);

    let mut prev = seed;
    for &x in &values[period..] {
        let ema = x * k + prev * (1.0 - k);
        if !ema.is_finite() {
            break;
        }
        result.push(ema);
        prev = ema;
    }

    result
}

/// Most recent EMA value.
pub fn current_ema(values: &[f64], period: usize) -> Option<f64> {
    calculate_ema(values, period).last().copied()
}

/// Direction of a fully ordered EMA stack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendAlignment {
    pub bullish: bool,
    /// `|fast - slow| / slow`.
    pub strength: f64,
}

/// Check whether a fast / mid / slow EMA stack is trend-aligned.
///
/// Bullish when `fast > mid > slow`, bearish when `fast < mid < slow`.
/// Returns `None` for mixed ordering, insufficient data, a zero slow EMA or a
/// non-finite strength.
pub fn ema_trend_aligned(closes: &[f64], fast: usize, mid: usize, slow: usize) -> Option<TrendAlignment> {
    let longest = fast.max(mid).max(slow);
    if longest == 0 || closes.len() < longest {
        return None;
    }

    let f = current_ema(closes, fast)?;
    let m = current_ema(closes, mid)?;
    let s = current_ema(closes, slow)?;

    let bullish = f > m && m > s;
    let bearish = f < m && m < s;
    if !bullish && !bearish {
        return None;
    }

    if s == 0.0 {
        return None;
    }

    let strength = (f - s).abs() / s.abs();
    if !strength.is_finite() {
        return None;
    }

    Some(TrendAlignment { bullish, strength })
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn ascending(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    // ---- calculate_ema ---------------------------------------------------

    #[test]
    fn ema_degenerate_inputs() {
        assert!(calculate_ema(&[], 5).is_empty());
        assert!(calculate_ema(&[1.0, 2.0, 3.0], 0).is_empty());
        assert!(calculate_ema(&[1.0, 2.0], 5).is_empty());
    }

    #[test]
    fn ema_period_equals_length() {
        let ema = calculate_ema(&[2.0, 4.0, 6.0], 3);
        assert_eq!(ema.len(), 1);
        assert!((ema[0] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn ema_known_values() {
        // 5-period EMA of 1..=10: seed 3.0, k = 1/3.
        let closes = ascending(10);
        let ema = calculate_ema(&closes, 5);
        assert_eq!(ema.len(), 6);

        let k = 2.0 / 6.0;
        let mut expected = 3.0;
        assert!((ema[0] - expected).abs() < 1e-10);
        for (i, &c) in closes[5..].iter().enumerate() {
            expected = c * k + expected * (1.0 - k);
            assert!((ema[i + 1] - expected).abs() < 1e-10, "got {}, expected {expected}", ema[i + 1]);
        }
    }

    #[test]
    fn ema_stops_at_nan() {
        let ema = calculate_ema(&[1.0, 2.0, 3.0, f64::NAN, 5.0], 3);
        assert_eq!(ema.len(), 1);
    }

    // ---- ema_trend_aligned -----------------------------------------------

    #[test]
    fn trend_aligned_insufficient_data() {
        assert!(ema_trend_aligned(&ascending(50), 9, 21, 55).is_none());
    }

    #[test]
    fn trend_aligned_bullish_ascending() {
        let t = ema_trend_aligned(&ascending(200), 9, 21, 55).unwrap();
        assert!(t.bullish);
        assert!(t.strength > 0.0);
    }

    #[test]
    fn trend_aligned_bearish_descending() {
        let closes: Vec<f64> = (1..=200).rev().map(|x| x as f64).collect();
        let t = ema_trend_aligned(&closes, 9, 21, 55).unwrap();
        assert!(!t.bullish);
    }

    #[test]
    fn trend_aligned_flat_returns_none() {
        assert!(ema_trend_aligned(&[100.0; 200], 9, 21, 55).is_none());
    }
}
