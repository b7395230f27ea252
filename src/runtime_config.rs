// =============================================================================
// Runtime Configuration — JSON settings with atomic save
// =============================================================================
//
// Every tunable of the analytics service lives here: where to listen, which
// upstream to pull candles from, the watchlist that is kept warm, and the
// default parameters for indicators, pattern matching and the summary card.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry serde defaults so that adding new fields never
// breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:8090".to_string()
}

fn default_upstream_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_exchange() -> String {
    "NSE".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_symbols() -> Vec<String> {
    vec![
        "RELIANCE".to_string(),
        "TCS".to_string(),
        "INFY".to_string(),
        "HDFCBANK".to_string(),
        "ICICIBANK".to_string(),
    ]
}

fn default_interval() -> String {
    "5m".to_string()
}

fn default_refresh_secs() -> u64 {
    60
}

fn default_history_limit() -> usize {
    300
}

fn default_tolerance_pct() -> f64 {
    1.5
}

fn default_pivot_strength() -> usize {
    3
}

fn default_min_score() -> f64 {
    0.6
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP / WebSocket server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Dashboard backend that proxies the broker's historical candles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_url")]
    pub base_url: String,

    #[serde(default = "default_exchange")]
    pub exchange: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            exchange: default_exchange(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Symbols kept warm in the candle buffer by the refresh loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistConfig {
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    #[serde(default = "default_interval")]
    pub interval: String,

    /// Seconds between refresh rounds. Zero disables the loop.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,

    /// Candles fetched and retained per symbol.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            interval: default_interval(),
            refresh_secs: default_refresh_secs(),
            history_limit: default_history_limit(),
        }
    }
}

/// Parameters used when an indicator request leaves them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorDefaults {
    pub sma_period: usize,
    pub ema_period: usize,
    pub wma_period: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_std_dev: f64,
    pub atr_period: usize,
    pub stochastic_k: usize,
    pub stochastic_smooth: usize,
    pub stochastic_d: usize,
    pub cci_period: usize,
    pub mfi_period: usize,
    pub williams_r_period: usize,
    pub roc_period: usize,
    pub adx_period: usize,
    pub psar_step: f64,
    pub psar_max_step: f64,
    /// Minutes east of UTC for the VWAP session reset (IST = 330).
    /// `None` accumulates over the whole series.
    pub vwap_session_utc_offset_minutes: Option<i32>,
    /// Indicators attached to `GET /chart/:symbol`.
    pub chart: Vec<String>,
}

impl Default for IndicatorDefaults {
    fn default() -> Self {
        Self {
            sma_period: 20,
            ema_period: 20,
            wma_period: 20,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_std_dev: 2.0,
            atr_period: 14,
            stochastic_k: 14,
            stochastic_smooth: 3,
            stochastic_d: 3,
            cci_period: 20,
            mfi_period: 14,
            williams_r_period: 14,
            roc_period: 12,
            adx_period: 14,
            psar_step: 0.02,
            psar_max_step: 0.2,
            vwap_session_utc_offset_minutes: Some(330),
            chart: vec![
                "ema".to_string(),
                "bollinger".to_string(),
                "vwap".to_string(),
                "rsi".to_string(),
                "macd".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDefaults {
    /// Percentage band for `~=` relationships.
    #[serde(default = "default_tolerance_pct")]
    pub tolerance_pct: f64,

    /// Bars on each side a swing pivot must dominate.
    #[serde(default = "default_pivot_strength")]
    pub pivot_strength: usize,

    /// Minimum score for a library pattern to be reported.
    #[serde(default = "default_min_score")]
    pub min_score: f64,
}

impl Default for PatternDefaults {
    fn default() -> Self {
        Self {
            tolerance_pct: default_tolerance_pct(),
            pivot_strength: default_pivot_strength(),
            min_score: default_min_score(),
        }
    }
}

/// Oscillator bands and scorer settings for the technical summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryThresholds {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub stochastic_oversold: f64,
    pub stochastic_overbought: f64,
    /// CCI reads oversold below `-cci_band` and overbought above it.
    pub cci_band: f64,
    pub williams_oversold: f64,
    pub williams_overbought: f64,
    pub mfi_oversold: f64,
    pub mfi_overbought: f64,
    /// ADX at or above this boosts trend-following confidence.
    pub adx_trend: f64,
    pub ema_fast: usize,
    pub ema_mid: usize,
    pub ema_slow: usize,
    /// Minimum absolute weighted score for BUY / SELL.
    pub entry_threshold: f64,
}

impl Default for SummaryThresholds {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            stochastic_oversold: 20.0,
            stochastic_overbought: 80.0,
            cci_band: 100.0,
            williams_oversold: -80.0,
            williams_overbought: -20.0,
            mfi_oversold: 20.0,
            mfi_overbought: 80.0,
            adx_trend: 25.0,
            ema_fast: 9,
            ema_mid: 21,
            ema_slow: 55,
            entry_threshold: 0.15,
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub watchlist: WatchlistConfig,

    #[serde(default)]
    pub indicators: IndicatorDefaults,

    #[serde(default)]
    pub patterns: PatternDefaults,

    #[serde(default)]
    pub summary: SummaryThresholds,
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.watchlist.symbols,
            interval = %config.watchlist.interval,
            upstream = %config.upstream.base_url,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Apply `TRADEDESK_*` overrides from an environment lookup.
    ///
    /// `TRADEDESK_WATCHLIST` is a comma-separated symbol list; blank entries
    /// are dropped and symbols are uppercased.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(list) = lookup("TRADEDESK_WATCHLIST") {
            let symbols: Vec<String> = list
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
            if !symbols.is_empty() {
                self.watchlist.symbols = symbols;
            }
        }
        if let Some(addr) = lookup("TRADEDESK_BIND_ADDR").filter(|s| !s.trim().is_empty()) {
            self.server.bind_addr = addr.trim().to_string();
        }
        if let Some(url) = lookup("TRADEDESK_UPSTREAM_URL").filter(|s| !s.trim().is_empty()) {
            self.upstream.base_url = url.trim().to_string();
        }
    }
}
