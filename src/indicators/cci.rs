// =============================================================================
// Commodity Channel Index (CCI) — Lambert
// =============================================================================
//
//   TP  = (H + L + C) / 3
//   CCI = (TP - SMA(TP)) / (0.015 * mean absolute deviation of TP)
// =============================================================================

use crate::market_data::Candle;

const LAMBERT_CONSTANT: f64 = 0.015;

/// CCI series; index 0 corresponds to candle `period - 1`.
///
/// Reads 0 when the window's mean deviation is 0 (all typical prices equal).
pub fn calculate_cci(candles: &[Candle], period: usize) -> Vec<f64> {
    if period == 0 || candles.len() < period {
        return Vec::new();
    }

    let tp: Vec<f64> = candles.iter().map(Candle::typical_price).collect();
    let period_f = period as f64;

    let mut result = Vec::with_capacity(tp.len() - period + 1);
    for window in tp.windows(period) {
        let mean = window.iter().sum::<f64>() / period_f;
        let mean_dev = window.iter().map(|x| (x - mean).abs()).sum::<f64>() / period_f;
        let current = window[period - 1];

        let cci = if mean_dev == 0.0 {
            0.0
        } else {
            (current - mean) / (LAMBERT_CONSTANT * mean_dev)
        };
        if !cci.is_finite() {
            break;
        }
        result.push(cci);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(tp: f64) -> Candle {
        Candle {
            timestamp: 0,
            open: tp,
            high: tp,
            low: tp,
            close: tp,
            volume: 1.0,
        }
    }

    #[test]
    fn cci_known_value() {
        // TPs 1, 2, 3: mean 2, mean dev 2/3, current 3 => 1 / (0.015 * 2/3) = 100.
        let candles = vec![candle(1.0), candle(2.0), candle(3.0)];
        let cci = calculate_cci(&candles, 3);
        assert_eq!(cci.len(), 1);
        assert!((cci[0] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn cci_flat_is_zero() {
        let cci = calculate_cci(&vec![candle(50.0); 25], 20);
        assert_eq!(cci.len(), 6);
        assert!(cci.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn cci_sign_follows_trend() {
        let up: Vec<Candle> = (1..=30).map(|i| candle(i as f64)).collect();
        assert!(*calculate_cci(&up, 20).last().unwrap() > 0.0);
        let down: Vec<Candle> = (1..=30).rev().map(|i| candle(i as f64)).collect();
        assert!(*calculate_cci(&down, 20).last().unwrap() < 0.0);
    }

    #[test]
    fn cci_insufficient_data() {
        assert!(calculate_cci(&[candle(1.0)], 20).is_empty());
        assert!(calculate_cci(&[candle(1.0)], 0).is_empty());
    }
}
