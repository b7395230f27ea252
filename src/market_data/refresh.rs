// =============================================================================
// Watchlist refresh — keeps the candle cache and summary cards warm
// =============================================================================
//
// One round:
//   1. Fetch every watchlist symbol concurrently. A series that already holds
//      `history_limit` candles only re-fetches its last few bars; a cold one
//      fetches the full history.
//   2. Fold the result into the CandleBuffer (replace when cold, per-bar
//      update when warm).
//   3. Recompute the technical summary for the series.
//   4. Failures go to the AppState error ring; the round carries on.
// =============================================================================

use chrono::Utc;
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::app_state::{AppState, MAX_BUFFERED_CANDLES};
use crate::market_data::{Candle, CandleBuffer, CandleKey};
use crate::signals::summarize;

/// Bars re-fetched for a warm series: the in-progress bar plus a few that
/// may have closed since the last round.
const TAIL_BARS: usize = 5;

/// Fold fetched candles into the buffer and return how many were applied.
///
/// A cold series is replaced wholesale. A warm one gets per-bar updates, so
/// the in-progress bar is overwritten and stale bars are ignored.
pub fn merge_candles(buffer: &CandleBuffer, key: CandleKey, warm: bool, candles: Vec<Candle>) -> usize {
    if !warm {
        let n = candles.len();
        buffer.replace(key, candles);
        return n;
    }
    candles
        .into_iter()
        .filter(|c| buffer.update(key.clone(), *c))
        .count()
}

/// Run one refresh round over the configured watchlist. Returns the number of
/// series refreshed successfully.
pub async fn refresh_watchlist(state: &AppState) -> usize {
    let (symbols, interval, limit, defaults, thresholds) = {
        let config = state.runtime_config.read();
        (
            config.watchlist.symbols.clone(),
            config.watchlist.interval.clone(),
            config.watchlist.history_limit.clamp(1, MAX_BUFFERED_CANDLES),
            config.indicators.clone(),
            config.summary.clone(),
        )
    };

    let fetches = symbols.iter().map(|symbol| {
        let key = CandleKey::new(symbol, &interval);
        let warm = state.candle_buffer.count(&key) >= limit;
        let want = if warm { TAIL_BARS } else { limit };
        async move {
            let result = state.upstream.fetch_recent(&key.symbol, &key.interval, want).await;
            (key, warm, result)
        }
    });

    let mut refreshed = 0;
    for (key, warm, result) in join_all(fetches).await {
        match result {
            Ok(candles) => {
                let applied = merge_candles(&state.candle_buffer, key.clone(), warm, candles);
                debug!(series = %key, warm, applied, "series refreshed");

                let series = state.candle_buffer.get(&key, limit);
                match summarize(&key.symbol, &key.interval, &series, &defaults, &thresholds) {
                    Some(card) => {
                        state.store_summary(card);
                    }
                    None => state.push_error(format!("upstream returned no candles for {key}")),
                }
                refreshed += 1;
            }
            Err(e) => {
                warn!(series = %key, error = %e, "watchlist refresh failed");
                state.push_error_with_code(format!("refresh {key} failed: {e:#}"), Some(key.to_string()));
            }
        }
    }

    *state.last_refresh.write() = Some(Utc::now().timestamp_millis());
    state.increment_version();
    info!(refreshed, total = symbols.len(), "watchlist refresh round complete");
    refreshed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime_config::RuntimeConfig;

    fn candle(ts: i64, close: f64) -> Candle {
        Candle {
            timestamp: ts,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 10.0,
        }
    }

    #[test]
    fn cold_merge_replaces_series() {
        let buf = CandleBuffer::new(100);
        let key = CandleKey::new("SBIN", "5m");
        buf.replace(key.clone(), vec![candle(0, 1.0)]);
        let applied = merge_candles(&buf, key.clone(), false, vec![candle(10, 5.0), candle(20, 6.0)]);
        assert_eq!(applied, 2);
        assert_eq!(buf.count(&key), 2);
        assert_eq!(buf.last_close(&key), Some(6.0));
    }

    #[test]
    fn warm_merge_updates_tail() {
        let buf = CandleBuffer::new(100);
        let key = CandleKey::new("SBIN", "5m");
        buf.replace(key.clone(), (0..5).map(|i| candle(i * 10, i as f64)).collect());

        // Stale bar ignored, in-progress bar overwritten, new bar appended.
        let tail = vec![candle(20, 99.0), candle(40, 4.5), candle(50, 5.0)];
        let applied = merge_candles(&buf, key.clone(), true, tail);
        assert_eq!(applied, 2);
        assert_eq!(buf.count(&key), 6);
        let series = buf.get(&key, 6);
        assert_eq!(series[2].close, 2.0);
        assert_eq!(series[4].close, 4.5);
        assert_eq!(series[5].close, 5.0);
    }

    #[tokio::test]
    async fn full_cache_counts_as_warm_past_the_cap() {
        use crate::market_data::upstream::stub_upstream;

        let body = r#"{"status":true,"data":[[1000,1,2,0.5,1.5,10],[2000,1,2,0.5,1.6,10],[3000,1,2,0.5,1.7,10]]}"#;
        let mut config = RuntimeConfig::default();
        config.watchlist.symbols = vec!["TCS".to_string()];
        config.watchlist.history_limit = MAX_BUFFERED_CANDLES * 3;
        config.upstream.base_url = stub_upstream(axum::http::StatusCode::OK, body).await;
        let state = AppState::new(config).unwrap();

        let key = CandleKey::new("TCS", "5m");
        let history = (0..MAX_BUFFERED_CANDLES as i64).map(|i| candle(i - 10_000, 100.0)).collect();
        state.candle_buffer.replace(key.clone(), history);

        assert_eq!(refresh_watchlist(&state).await, 1);
        // Warm: the tail was appended rather than the history replaced.
        assert_eq!(state.candle_buffer.count(&key), MAX_BUFFERED_CANDLES);
        assert_eq!(state.candle_buffer.last_close(&key), Some(1.7));
        assert_eq!(state.summaries.read().len(), 1);
    }

    #[tokio::test]
    async fn empty_watchlist_round_marks_refresh() {
        let mut config = RuntimeConfig::default();
        config.watchlist.symbols.clear();
        let state = AppState::new(config).unwrap();
        let v0 = state.current_state_version();

        assert_eq!(refresh_watchlist(&state).await, 0);
        assert!(state.last_refresh.read().is_some());
        assert!(state.current_state_version() > v0);
    }
}
