// =============================================================================
// Parabolic SAR (Stop-And-Reverse) — Wilder
// =============================================================================
//
//   SAR_{t+1} = SAR_t + AF * (EP - SAR_t)
//
// EP is the extreme point of the current trend (highest high in an uptrend,
// lowest low in a downtrend). AF starts at `step`, grows by `step` on each
// new EP and is capped at `max_step`. The SAR may not move inside the prior
// two bars' range. When price crosses the SAR the trend flips, SAR resets
// to the old EP and AF resets to `step`.
// =============================================================================

use serde::Serialize;

use crate::market_data::Candle;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PsarSeries {
    /// SAR values, offset 1 (candle 0 only seeds the trend).
    pub sar: Vec<f64>,
    /// `true` while the SAR sits below price (long trend).
    pub uptrend: Vec<bool>,
}

/// Compute Parabolic SAR. Empty when fewer than 2 candles or the step
/// parameters are not `0 < step <= max_step`.
pub fn calculate_psar(candles: &[Candle], step: f64, max_step: f64) -> PsarSeries {
    if candles.len() < 2 || !(step > 0.0 && step <= max_step) {
        return PsarSeries::default();
    }

    let (c0, c1) = (&candles[0], &candles[1]);
    let mut up = c1.close >= c0.close;
    let mut sar = if up { c0.low.min(c1.low) } else { c0.high.max(c1.high) };
    let mut ep = if up { c0.high.max(c1.high) } else { c0.low.min(c1.low) };
    let mut af = step;

    let mut out = PsarSeries {
        sar: Vec::with_capacity(candles.len() - 1),
        uptrend: Vec::with_capacity(candles.len() - 1),
    };
    out.sar.push(sar);
    out.uptrend.push(up);

    for i in 2..candles.len() {
        let (prev2, prev1, cur) = (&candles[i - 2], &candles[i - 1], &candles[i]);
        let mut next = sar + af * (ep - sar);

        if up {
            next = next.min(prev1.low).min(prev2.low);
            if cur.low < next {
                up = false;
                next = ep.max(cur.high);
                ep = cur.low;
                af = step;
            } else if cur.high > ep {
                ep = cur.high;
                af = (af + step).min(max_step);
            }
        } else {
            next = next.max(prev1.high).max(prev2.high);
            if cur.high > next {
                up = true;
                next = ep.min(cur.low);
                ep = cur.high;
                af = step;
            } else if cur.low < ep {
                ep = cur.low;
                af = (af + step).min(max_step);
            }
        }

        if !next.is_finite() {
            break;
        }
        sar = next;
        out.sar.push(sar);
        out.uptrend.push(up);
    }

    out
}

/// Latest `(sar, uptrend)`.
pub fn current_psar(candles: &[Candle], step: f64, max_step: f64) -> Option<(f64, bool)> {
    let s = calculate_psar(candles, step, max_step);
    Some((*s.sar.last()?, *s.uptrend.last()?))
}
