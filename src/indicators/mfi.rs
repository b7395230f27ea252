// =============================================================================
// Money Flow Index (MFI) — volume-weighted RSI
// =============================================================================
//
//   TP         = (H + L + C) / 3
//   money flow = TP * volume, positive when TP rises vs the previous bar,
//                negative when it falls, ignored when unchanged
//   MFI        = 100 - 100 / (1 + Σpositive / Σnegative) over `period` flows
// =============================================================================

use crate::market_data::Candle;

/// MFI series; index 0 corresponds to candle `period`.
///
/// Only positive flow => 100, no flow at all => 50.
pub fn calculate_mfi(candles: &[Candle], period: usize) -> Vec<f64> {
    if period == 0 || candles.len() <= period {
        return Vec::new();
    }

    // (positive, negative) flow for each candle from index 1.
    let flows: Vec<(f64, f64)> = candles
        .windows(2)
        .map(|w| {
            let prev_tp = w[0].typical_price();
            let tp = w[1].typical_price();
            let raw = tp * w[1].volume;
            if tp > prev_tp {
                (raw, 0.0)
            } else if tp < prev_tp {
                (0.0, raw)
            } else {
                (0.0, 0.0)
            }
        })
        .collect();

    let mut result = Vec::with_capacity(flows.len() - period + 1);
    for window in flows.windows(period) {
        let (pos, neg) = window
            .iter()
            .fold((0.0, 0.0), |(p, n), (fp, fnv)| (p + fp, n + fnv));

        let mfi = if pos == 0.0 && neg == 0.0 {
            50.0
        } else if neg == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + pos / neg)
        };
        if !mfi.is_finite() {
            break;
        }
        result.push(mfi);
    }
    result
}
