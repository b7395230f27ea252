// =============================================================================
// Williams %R
// =============================================================================
//
//   %R = -100 * (HH - C) / (HH - LL)     range [-100, 0]
// =============================================================================

use crate::market_data::Candle;

/// Williams %R series; index 0 corresponds to candle `period - 1`.
/// A zero high-low range reads -50.
pub fn calculate_williams_r(candles: &[Candle], period: usize) -> Vec<f64> {
    if period == 0 || candles.len() < period {
        return Vec::new();
    }

    candles
        .windows(period)
        .map(|w| {
            let hh = w.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
            let ll = w.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            let range = hh - ll;
            if range == 0.0 {
                -50.0
            } else {
                -100.0 * (hh - w[period - 1].close) / range
            }
        })
        .collect()
}
