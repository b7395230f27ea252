// =============================================================================
// Stochastic Oscillator (slow / full)
// =============================================================================
//
//   raw %K = 100 * (C - LL_k) / (HH_k - LL_k)
//   %K     = SMA(smooth) of raw %K
//   %D     = SMA(d) of %K
//
// `smooth == 1` gives the fast stochastic. A zero high-low range reads 50.
// =============================================================================

use serde::Serialize;

use crate::indicators::sma::calculate_sma;
use crate::market_data::Candle;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StochasticSeries {
    /// Offset `k_period + smooth - 2`.
    pub k: Vec<f64>,
    /// Offset `k_period + smooth + d_period - 3`.
    pub d: Vec<f64>,
}

/// Raw %K for each window of `k_period` candles (offset `k_period - 1`).
pub fn raw_k(candles: &[Candle], k_period: usize) -> Vec<f64> {
    if k_period == 0 || candles.len() < k_period {
        return Vec::new();
    }

    candles
        .windows(k_period)
        .map(|w| {
            let hh = w.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
            let ll = w.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            let close = w[k_period - 1].close;
            let range = hh - ll;
            if range == 0.0 {
                50.0
            } else {
                100.0 * (close - ll) / range
            }
        })
        .collect()
}

/// Full stochastic oscillator.
pub fn calculate_stochastic(candles: &[Candle], k_period: usize, smooth: usize, d_period: usize) -> StochasticSeries {
    if smooth == 0 || d_period == 0 {
        return StochasticSeries::default();
    }
    let k = calculate_sma(&raw_k(candles, k_period), smooth);
    let d = calculate_sma(&k, d_period);
    StochasticSeries { k, d }
}

/// Latest `(%K, %D)`.
pub fn current_stochastic(candles: &[Candle], k_period: usize, smooth: usize, d_period: usize) -> Option<(f64, f64)> {
    let s = calculate_stochastic(candles, k_period, smooth, d_period);
    Some((*s.k.last()?, *s.d.last()?))
}
