// =============================================================================
// Average Directional Index (ADX) — Wilder
// =============================================================================
//
//   1. +DM / -DM and True Range per bar transition.
//   2. Wilder running sums:  S_t = S_{t-1} - S_{t-1} / period + x_t
//      (seeded with the plain sum of the first `period` values).
//   3. +DI = 100 * S(+DM) / S(TR),  -DI = 100 * S(-DM) / S(TR)
//   4. DX  = 100 * |+DI - -DI| / (+DI + -DI)
//   5. ADX = Wilder average of DX (seeded with the SMA of `period` DX values).
//
// +DI / -DI / DX start on candle `period`; ADX starts on candle `2*period - 1`.
//
// Interpretation: ADX > 25 trending, ADX < 20 ranging.
// =============================================================================

use serde::Serialize;

use crate::indicators::atr::true_range;
use crate::market_data::Candle;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdxSeries {
    /// Offset `2 * period - 1`.
    pub adx: Vec<f64>,
    /// Offset `period`.
    pub plus_di: Vec<f64>,
    /// Offset `period`.
    pub minus_di: Vec<f64>,
}

/// Latest ADX with its directional indicators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdxReading {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// Full ADX / DI series. Empty on zero period, fewer than `period + 1`
/// candles, or a non-finite intermediate.
pub fn calculate_adx_series(candles: &[Candle], period: usize) -> AdxSeries {
    if period == 0 || candles.len() <= period {
        return AdxSeries::default();
    }

    let period_f = period as f64;

    // ------------------------------------------------------------------
    // Raw +DM, -DM and TR per transition (transition j ends on candle j+1)
    // ------------------------------------------------------------------
    let mut plus_dm = Vec::with_capacity(candles.len() - 1);
    let mut minus_dm = Vec::with_capacity(candles.len() - 1);
    let mut tr_vals = Vec::with_capacity(candles.len() - 1);

    for w in candles.windows(2) {
        let (prev, cur) = (&w[0], &w[1]);
        let up_move = cur.high - prev.high;
        let down_move = prev.low - cur.low;

        plus_dm.push(if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 });
        minus_dm.push(if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 });
        tr_vals.push(true_range(cur, prev.close));
    }

    // ------------------------------------------------------------------
    // Wilder running sums and DI / DX
    // ------------------------------------------------------------------
    let mut s_plus: f64 = plus_dm[..period].iter().sum();
    let mut s_minus: f64 = minus_dm[..period].iter().sum();
    let mut s_tr: f64 = tr_vals[..period].iter().sum();

    let mut out = AdxSeries::default();
    let mut dx_values = Vec::with_capacity(tr_vals.len() - period + 1);

    let mut i = period;
    loop {
        let Some((pdi, mdi, dx)) = directional(s_plus, s_minus, s_tr) else {
            break;
        };
        out.plus_di.push(pdi);
        out.minus_di.push(mdi);
        dx_values.push(dx);

        if i >= tr_vals.len() {
            break;
        }
        s_plus = s_plus - s_plus / period_f + plus_dm[i];
        s_minus = s_minus - s_minus / period_f + minus_dm[i];
        s_tr = s_tr - s_tr / period_f + tr_vals[i];
        i += 1;
    }

    // ------------------------------------------------------------------
    // ADX = Wilder average of DX
    // ------------------------------------------------------------------
    if dx_values.len() < period {
        return out;
    }

    let mut adx = dx_values[..period].iter().sum::<f64>() / period_f;
    if !adx.is_finite() {
        return out;
    }
    out.adx.push(adx);
    for &dx in &dx_values[period..] {
        adx = (adx * (period_f - 1.0) + dx) / period_f;
        if !adx.is_finite() {
            break;
        }
        out.adx.push(adx);
    }

    out
}

/// Most recent ADX, +DI and -DI. Needs at least `2 * period` candles.
pub fn current_adx(candles: &[Candle], period: usize) -> Option<AdxReading> {
    let series = calculate_adx_series(candles, period);
    Some(AdxReading {
        adx: *series.adx.last()?,
        plus_di: *series.plus_di.last()?,
        minus_di: *series.minus_di.last()?,
    })
}

/// (+DI, -DI, DX) from the smoothed sums. A zero TR sum means no range and
/// reads as zero directional movement.
fn directional(s_plus: f64, s_minus: f64, s_tr: f64) -> Option<(f64, f64, f64)> {
    if !(s_plus.is_finite() && s_minus.is_finite() && s_tr.is_finite()) {
        return None;
    }
    if s_tr == 0.0 {
        return Some((0.0, 0.0, 0.0));
    }

    let plus_di = s_plus / s_tr * 100.0;
    let minus_di = s_minus / s_tr * 100.0;
    let di_sum = plus_di + minus_di;
    let dx = if di_sum == 0.0 {
        0.0
    } else {
        (plus_di - minus_di).abs() / di_sum * 100.0
    };

    dx.is_finite().then_some((plus_di, minus_di, dx))
}
