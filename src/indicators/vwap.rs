// =============================================================================
// Volume Weighted Average Price (VWAP)
// =============================================================================
//
//   VWAP_t = Σ(TP_i * V_i) / Σ V_i      over the current session
//
// Sessions reset at local midnight for the given UTC offset; with no offset
// the average is cumulative over the whole input.
// =============================================================================

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::market_data::Candle;

/// Session day of `timestamp_ms` in the given fixed offset.
fn session_day(timestamp_ms: i64, offset: FixedOffset) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms).map(|dt| dt.with_timezone(&offset).date_naive())
}

/// VWAP for every candle (offset 0).
///
/// `session_utc_offset_minutes`: `Some(330)` resets at IST midnight, `None`
/// accumulates across the whole series. While the session's cumulative volume
/// is zero the candle's typical price is reported.
pub fn calculate_vwap(candles: &[Candle], session_utc_offset_minutes: Option<i32>) -> Vec<f64> {
    let offset = session_utc_offset_minutes.and_then(|m| FixedOffset::east_opt(m.saturating_mul(60)));

    let mut result = Vec::with_capacity(candles.len());
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;
    let mut current_day: Option<NaiveDate> = None;

    for candle in candles {
        if let Some(offset) = offset {
            let day = session_day(candle.timestamp, offset);
            if day != current_day {
                cum_pv = 0.0;
                cum_vol = 0.0;
                current_day = day;
            }
        }

        let tp = candle.typical_price();
        cum_pv += tp * candle.volume;
        cum_vol += candle.volume;

        let vwap = if cum_vol == 0.0 { tp } else { cum_pv / cum_vol };
        if !vwap.is_finite() {
            break;
        }
        result.push(vwap);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: i64 = 3_600_000;

    fn candle(timestamp: i64, price: f64, volume: f64) -> Candle {
        Candle {
            timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        }
    }

    #[test]
    fn vwap_cumulative() {
        let candles = vec![candle(0, 10.0, 100.0), candle(1, 20.0, 300.0)];
        let vwap = calculate_vwap(&candles, None);
        assert!((vwap[0] - 10.0).abs() < 1e-10);
        // (10*100 + 20*300) / 400 = 17.5
        assert!((vwap[1] - 17.5).abs() < 1e-10);
    }

    #[test]
    fn vwap_resets_each_session() {
        // 2024-01-02 and 2024-01-03 at 04:00 UTC (09:30 IST).
        let day1 = 1_704_168_000_000;
        let day2 = day1 + 24 * HOUR_MS;
        let candles = vec![
            candle(day1, 10.0, 100.0),
            candle(day1 + HOUR_MS, 20.0, 100.0),
            candle(day2, 50.0, 100.0),
        ];
        let vwap = calculate_vwap(&candles, Some(330));
        assert!((vwap[1] - 15.0).abs() < 1e-10);
        assert!((vwap[2] - 50.0).abs() < 1e-10);

        let cumulative = calculate_vwap(&candles, None);
        assert!((cumulative[2] - 80.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn vwap_session_follows_offset() {
        // 2024-01-02 10:00 UTC and 20:00 UTC: the same UTC day, but the second
        // bar is already 01:30 on 2024-01-03 in IST.
        let evening = 1_704_189_600_000;
        let candles = vec![candle(evening, 10.0, 100.0), candle(evening + 10 * HOUR_MS, 30.0, 100.0)];

        let ist = calculate_vwap(&candles, Some(330));
        assert!((ist[1] - 30.0).abs() < 1e-10);

        let utc = calculate_vwap(&candles, Some(0));
        assert!((utc[1] - 20.0).abs() < 1e-10);
    }

    #[test]
    fn vwap_zero_volume_uses_typical_price() {
        let candles = vec![candle(0, 10.0, 0.0), candle(1, 12.0, 0.0)];
        assert_eq!(calculate_vwap(&candles, None), vec![10.0, 12.0]);
    }

    #[test]
    fn vwap_empty_input() {
        assert!(calculate_vwap(&[], Some(330)).is_empty());
    }
}
