// =============================================================================
// Upstream Historical Candle Client — dashboard backend REST contract
// =============================================================================
//
// The dashboard backend proxies the broker's historical-candle API:
//
//   GET {base}/api/angelone/historical?symbol=..&exchange=..&interval=..&from=..&to=..
//
// Response:
//   { "status": true, "message": "SUCCESS",
//     "data": [["2024-01-02T09:15:00+05:30", 101.0, 102.5, 100.8, 102.1, 15230], ...] }
//
// Timestamps arrive either as RFC 3339 strings or epoch milliseconds, and
// numeric columns may be sent as JSON strings.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::market_data::Candle;

/// NSE cash session length in minutes (09:15 - 15:30).
const SESSION_MINUTES: i64 = 375;

/// Client for the dashboard backend's historical endpoint.
#[derive(Clone)]
pub struct HistoricalClient {
    base_url: String,
    exchange: String,
    client: reqwest::Client,
}

impl HistoricalClient {
    /// Create a new client. `base_url` has any trailing slash stripped.
    pub fn new(base_url: impl Into<String>, exchange: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let base_url: String = base_url.into();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .context("failed to build reqwest client")?;

        let base_url = base_url.trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "HistoricalClient initialised");

        Ok(Self {
            base_url,
            exchange: exchange.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch roughly the newest `limit` candles for `symbol` on `interval`.
    #[instrument(skip(self), name = "upstream::fetch_recent")]
    pub async fn fetch_recent(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>> {
        let to = Utc::now();
        let from = to - lookback(interval, limit)?;
        let mut candles = self.fetch_range(symbol, interval, from, to).await?;

        let start = candles.len().saturating_sub(limit);
        candles.drain(..start);
        Ok(candles)
    }

    /// GET /api/angelone/historical for an explicit time range.
    #[instrument(skip(self), name = "upstream::fetch_range")]
    pub async fn fetch_range(
        &self,
        symbol: &str,
        interval: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let broker_interval = broker_interval(interval)
            .with_context(|| format!("unsupported interval: {interval}"))?;
        let url = format!("{}/api/angelone/historical", self.base_url);

        let from_s = from.format("%Y-%m-%d %H:%M").to_string();
        let to_s = to.format("%Y-%m-%d %H:%M").to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("exchange", self.exchange.as_str()),
                ("interval", broker_interval),
                ("from", from_s.as_str()),
                ("to", to_s.as_str()),
            ])
            .send()
            .await
            .context("GET /api/angelone/historical request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            anyhow::bail!("historical endpoint returned {status}: {snippet}");
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse historical response")?;

        let candles = parse_history(&body)?;
        debug!(symbol = %symbol, interval = %interval, count = candles.len(), "historical candles fetched");
        Ok(candles)
    }
}

// =============================================================================
// Parsing helpers
// =============================================================================

/// Parse the historical response envelope into sorted candles.
///
/// Rows that cannot be parsed are skipped with a warning; a `status: false`
/// envelope is an error carrying the upstream message.
pub fn parse_history(body: &serde_json::Value) -> Result<Vec<Candle>> {
    if body.get("status").and_then(|v| v.as_bool()) == Some(false) {
        let message = body
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error");
        anyhow::bail!("upstream rejected request: {message}");
    }

    let rows = body
        .get("data")
        .and_then(|v| v.as_array())
        .context("missing field data")?;

    let mut candles = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        match parse_row(row) {
            Ok(candle) => candles.push(candle),
            Err(e) => warn!(row = i, error = %e, "skipping malformed candle row"),
        }
    }
    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

fn parse_row(row: &serde_json::Value) -> Result<Candle> {
    let cols = row.as_array().context("row is not an array")?;
    if cols.len() < 5 {
        anyhow::bail!("row has {} columns, expected at least 5", cols.len());
    }

    let timestamp = parse_timestamp(&cols[0])?;
    let open = parse_f64(&cols[1], "open")?;
    let high = parse_f64(&cols[2], "high")?;
    let low = parse_f64(&cols[3], "low")?;
    let close = parse_f64(&cols[4], "close")?;
    let volume = match cols.get(5) {
        Some(v) => parse_f64(v, "volume")?,
        None => 0.0,
    };

    Ok(Candle {
        timestamp,
        open,
        high,
        low,
        close,
        volume,
    })
}

fn parse_timestamp(val: &serde_json::Value) -> Result<i64> {
    match val {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp_millis())
            .with_context(|| format!("invalid timestamp: {s}")),
        serde_json::Value::Number(n) => n.as_i64().context("timestamp is not an integer"),
        _ => anyhow::bail!("timestamp has unexpected JSON type"),
    }
}

/// Numeric values may be sent as JSON numbers or strings.
fn parse_f64(val: &serde_json::Value, name: &str) -> Result<f64> {
    let parsed = match val {
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .with_context(|| format!("failed to parse {name} as f64: {s}"))?,
        serde_json::Value::Number(n) => n
            .as_f64()
            .with_context(|| format!("field {name} is not a valid f64"))?,
        _ => anyhow::bail!("field {name} has unexpected JSON type"),
    };
    if !parsed.is_finite() {
        anyhow::bail!("field {name} is not finite");
    }
    Ok(parsed)
}

/// Map dashboard interval codes to the broker's interval names.
pub fn broker_interval(interval: &str) -> Option<&'static str> {
    let name = match interval {
        "1m" => "ONE_MINUTE",
        "3m" => "THREE_MINUTE",
        "5m" => "FIVE_MINUTE",
        "10m" => "TEN_MINUTE",
        "15m" => "FIFTEEN_MINUTE",
        "30m" => "THIRTY_MINUTE",
        "1h" => "ONE_HOUR",
        "1d" => "ONE_DAY",
        _ => return None,
    };
    Some(name)
}

fn interval_minutes(interval: &str) -> Option<i64> {
    let minutes = match interval {
        "1m" => 1,
        "3m" => 3,
        "5m" => 5,
        "10m" => 10,
        "15m" => 15,
        "30m" => 30,
        "1h" => 60,
        "1d" => SESSION_MINUTES,
        _ => return None,
    };
    Some(minutes)
}

/// Calendar span needed to cover `limit` bars of `interval`, accounting for
/// the trading session length and weekends.
fn lookback(interval: &str, limit: usize) -> Result<chrono::Duration> {
    let minutes = interval_minutes(interval).with_context(|| format!("unsupported interval: {interval}"))?;
    let bars_per_day = (SESSION_MINUTES / minutes).max(1);
    let trading_days = (limit as i64 + bars_per_day - 1) / bars_per_day;
    let calendar_days = trading_days * 7 / 5 + 3;
    Ok(chrono::Duration::days(calendar_days))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Serve a fixed historical response on an ephemeral local port and return
/// its base URL.
#[cfg(test)]
pub(crate) async fn stub_upstream(status: axum::http::StatusCode, body: &'static str) -> String {
    use axum::routing::get;

    let app = axum::Router::new().route("/api/angelone/historical", get(move || async move { (status, body) }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}
