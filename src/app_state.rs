// =============================================================================
// Central Application State — Chart Analytics Service
// =============================================================================
//
// Ties together the runtime config, the candle cache, the upstream client and
// the latest technical summaries, and provides a unified snapshot for the
// REST `GET /api/v1/state` endpoint and the WebSocket feed.
//
// Thread safety:
//   - Atomic counters for lock-free version tracking.
//   - parking_lot::RwLock for all mutable shared collections.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::market_data::candle_buffer::normalized;
use crate::market_data::{Candle, CandleBuffer, CandleKey, HistoricalClient};
use crate::runtime_config::RuntimeConfig;
use crate::signals::TechnicalSummary;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// Optional machine-readable context (e.g. the series key that failed).
    pub code: Option<String>,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;
/// Candles retained per series in the cache.
pub const MAX_BUFFERED_CANDLES: usize = 2_000;

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Monotonically increasing version counter. Incremented on every
    /// meaningful state mutation. The WebSocket feed uses this to detect
    /// changes and push updates.
    pub state_version: AtomicU64,

    /// WebSocket message sequence number (incremented per message sent).
    pub ws_sequence_number: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,

    // ── Market Data ─────────────────────────────────────────────────────
    pub candle_buffer: Arc<CandleBuffer>,
    pub upstream: HistoricalClient,

    // ── Analytics ───────────────────────────────────────────────────────
    pub summaries: RwLock<HashMap<CandleKey, TechnicalSummary>>,
    /// Epoch millis of the last completed watchlist refresh.
    pub last_refresh: RwLock<Option<i64>>,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    /// Instant when the service was started. Used for uptime calculations.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct a new `AppState` from the given runtime configuration.
    ///
    /// Fails only when the HTTP client for the upstream cannot be built.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let upstream = HistoricalClient::new(
            config.upstream.base_url.clone(),
            config.upstream.exchange.clone(),
            config.upstream.timeout_secs,
        )?;

        Ok(Self {
            state_version: AtomicU64::new(1),
            ws_sequence_number: AtomicU64::new(0),

            runtime_config: Arc::new(RwLock::new(config)),
            candle_buffer: Arc::new(CandleBuffer::new(MAX_BUFFERED_CANDLES)),
            upstream,

            summaries: RwLock::new(HashMap::new()),
            last_refresh: RwLock::new(None),
            recent_errors: RwLock::new(Vec::new()),

            start_time: std::time::Instant::now(),
        })
    }

    // ── Version Management ──────────────────────────────────────────────

    /// Atomically increment the state version. Call this after every
    /// meaningful mutation to signal WebSocket clients that fresh data is
    /// available.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    /// Read the current state version without modifying it.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message. The ring buffer is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted when the limit is
    /// reached.
    pub fn push_error(&self, msg: String) {
        self.push_error_with_code(msg, None);
    }

    /// Record an error with an optional machine-readable code.
    pub fn push_error_with_code(&self, msg: String, code: Option<String>) {
        let record = ErrorRecord {
            message: msg,
            code,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
        drop(errors);

        self.increment_version();
    }

    // ── Candles ─────────────────────────────────────────────────────────

    /// Whether `key` is one of the series the refresh loop keeps warm.
    pub fn is_watched(&self, key: &CandleKey) -> bool {
        let config = self.runtime_config.read();
        config.watchlist.interval == key.interval
            && config
                .watchlist
                .symbols
                .iter()
                .any(|s| s.eq_ignore_ascii_case(&key.symbol))
    }

    /// Newest `limit` candles for a series, served from the cache when it
    /// holds enough and fetched from the upstream otherwise.
    ///
    /// Only non-empty watchlist fetches are cached; any other series is
    /// fetched per request.
    pub async fn load_candles(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>> {
        let limit = limit.clamp(1, MAX_BUFFERED_CANDLES);
        let key = CandleKey::new(symbol, interval);

        if self.candle_buffer.count(&key) >= limit {
            return Ok(self.candle_buffer.get(&key, limit));
        }

        let fetched = self.upstream.fetch_recent(&key.symbol, interval, limit).await?;
        debug!(series = %key, count = fetched.len(), "cache miss, candles fetched");
        if fetched.is_empty() || !self.is_watched(&key) {
            return Ok(normalized(fetched, limit).into());
        }

        self.candle_buffer.replace(key.clone(), fetched);
        self.increment_version();
        Ok(self.candle_buffer.get(&key, limit))
    }

    // ── Summaries ───────────────────────────────────────────────────────

    /// Keep the card for a watchlist series. Returns `false` and stores
    /// nothing for any other series.
    pub fn store_summary(&self, summary: TechnicalSummary) -> bool {
        let key = CandleKey::new(summary.symbol.clone(), summary.interval.clone());
        if !self.is_watched(&key) {
            return false;
        }
        self.summaries.write().insert(key, summary);
        self.increment_version();
        true
    }

    // ── Snapshot Builder ────────────────────────────────────────────────

    /// Build a complete, serialisable snapshot of the service state.
    pub fn build_snapshot(&self) -> StateSnapshot {
        let now = Utc::now();
        let version = self.current_state_version();

        let watchlist = {
            let config = self.runtime_config.read();
            WatchlistSnapshot {
                symbols: config.watchlist.symbols.clone(),
                interval: config.watchlist.interval.clone(),
                refresh_secs: config.watchlist.refresh_secs,
                upstream: self.upstream.base_url().to_string(),
            }
        };

        let series = self
            .candle_buffer
            .keys()
            .into_iter()
            .map(|key| {
                let closes = self.candle_buffer.get_closes(&key, 2);
                let change_pct = match closes.as_slice() {
                    [prev, last] if *prev != 0.0 => Some((last - prev) / prev * 100.0),
                    _ => None,
                };
                SeriesInfo {
                    candles: self.candle_buffer.count(&key),
                    last_close: self.candle_buffer.last_close(&key),
                    change_pct,
                    key: key.to_string(),
                    symbol: key.symbol,
                    interval: key.interval,
                }
            })
            .collect();

        let summaries = {
            let map = self.summaries.read();
            let mut list: Vec<TechnicalSummary> = map.values().cloned().collect();
            list.sort_by(|a, b| a.symbol.cmp(&b.symbol).then_with(|| a.interval.cmp(&b.interval)));
            list
        };

        StateSnapshot {
            state_version: version,
            server_time: now.timestamp_millis(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            watchlist,
            series,
            summaries,
            recent_errors: self.recent_errors.read().clone(),
            last_refresh: *self.last_refresh.read(),
        }
    }
}

// =============================================================================
// Serialisable snapshot types
// =============================================================================

/// Full service state snapshot sent to the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub uptime_secs: u64,
    pub watchlist: WatchlistSnapshot,
    pub series: Vec<SeriesInfo>,
    pub summaries: Vec<TechnicalSummary>,
    pub recent_errors: Vec<ErrorRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchlistSnapshot {
    pub symbols: Vec<String>,
    pub interval: String,
    pub refresh_secs: u64,
    pub upstream: String,
}

/// One cached candle series.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesInfo {
    pub key: String,
    pub symbol: String,
    pub interval: String,
    pub candles: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_close: Option<f64>,
    /// Percent change between the last two closes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<f64>,
}
