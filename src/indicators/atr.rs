// =============================================================================
// Average True Range (ATR) — Wilder's Smoothing Method
// =============================================================================
//
//   TR    = max(H - L, |H - prevClose|, |L - prevClose|)
//   ATR_0 = SMA of the first `period` TR values
//   ATR_t = (ATR_{t-1} * (period - 1) + TR_t) / period
//
// TR needs a previous close, so the first ATR lands on candle `period`.
// =============================================================================

use crate::market_data::Candle;

/// True range of `current` given the previous candle's close.
///
/// NaN when any component is non-finite (`f64::max` would otherwise hide it).
pub fn true_range(current: &Candle, prev_close: f64) -> f64 {
    let hl = current.high - current.low;
    let hc = (current.high - prev_close).abs();
    let lc = (current.low - prev_close).abs();
    if !(hl.is_finite() && hc.is_finite() && lc.is_finite()) {
        return f64::NAN;
    }
    hl.max(hc).max(lc)
}

/// True range for every consecutive pair; element `i` belongs to candle `i + 1`.
pub fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .windows(2)
        .map(|w| true_range(&w[1], w[0].close))
        .collect()
}

/// ATR series; index 0 corresponds to candle `period`.
///
/// Empty when `period == 0`, fewer than `period + 1` candles, or the seed is
/// non-finite. A non-finite value later truncates the series.
pub fn calculate_atr_series(candles: &[Candle], period: usize) -> Vec<f64> {
    if period == 0 || candles.len() <= period {
        return Vec::new();
    }

    let tr_values = true_ranges(candles);
    let period_f = period as f64;

    let seed = tr_values[..period].iter().sum::<f64>() / period_f;
    if !seed.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(tr_values.len() - period + 1);
    result.push(seed);

    let mut atr = seed;
    for &tr in &tr_values[period..] {
        atr = (atr * (period_f - 1.0) + tr) / period_f;
        if !atr.is_finite() {
            break;
        }
        result.push(atr);
    }

    result
}

/// Most recent ATR value.
///
/// `None` on insufficient data or when any TR in the history is non-finite.
pub fn calculate_atr(candles: &[Candle], period: usize) -> Option<f64> {
    let series = calculate_atr_series(candles, period);
    // A truncated series means a later bar was broken; don't report a stale value.
    if series.len() != candles.len().saturating_sub(period) {
        return None;
    }
    series.last().copied()
}

/// ATR as a percentage of the latest close.
pub fn calculate_atr_pct(candles: &[Candle], period: usize) -> Option<f64> {
    let atr = calculate_atr(candles, period)?;
    let last_close = candles.last()?.close;
    if last_close == 0.0 {
        return None;
    }
    Some((atr / last_close) * 100.0)
}
