use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV candle. `timestamp` is the interval open time in epoch
/// milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    /// Typical price `(H + L + C) / 3`.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Composite key that identifies a unique candle series.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CandleKey {
    pub symbol: String,
    pub interval: String,
}

impl CandleKey {
    pub fn new(symbol: impl Into<String>, interval: impl Into<String>) -> Self {
        let symbol: String = symbol.into();
        Self {
            symbol: symbol.to_uppercase(),
            interval: interval.into(),
        }
    }
}

impl std::fmt::Display for CandleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.symbol, self.interval)
    }
}

// ---------------------------------------------------------------------------
// CandleBuffer -- thread-safe ring buffer per (symbol, interval)
// ---------------------------------------------------------------------------

/// Thread-safe ring-buffer that stores the most recent candles per
/// `(symbol, interval)` pair.  Series are kept sorted by timestamp and trimmed
/// to `max_candles`.
/// Sort by timestamp, keep the later of duplicate timestamps and retain the
/// newest `max` candles.
pub fn normalized(mut candles: Vec<Candle>, max: usize) -> VecDeque<Candle> {
    candles.sort_by_key(|c| c.timestamp);

    let mut ring: VecDeque<Candle> = VecDeque::with_capacity(candles.len().min(max));
    for candle in candles {
        if let Some(last) = ring.back_mut() {
            if last.timestamp == candle.timestamp {
                *last = candle;
                continue;
            }
        }
        ring.push_back(candle);
    }
    while ring.len() > max {
        ring.pop_front();
    }
    ring
}

pub struct CandleBuffer {
    buffers: RwLock<HashMap<CandleKey, VecDeque<Candle>>>,
    max_candles: usize,
}

impl CandleBuffer {
    pub fn new(max_candles: usize) -> Self {
        Self {
            buffers: RwLock::new(HashMap::new()),
            max_candles: max_candles.max(1),
        }
    }

    /// Replace the whole series for `key` with a freshly fetched history.
    ///
    /// The input is sorted by timestamp, duplicate timestamps keep the later
    /// entry, and only the newest `max_candles` are retained.
    pub fn replace(&self, key: CandleKey, candles: Vec<Candle>) {
        let ring = normalized(candles, self.max_candles);
        self.buffers.write().insert(key, ring);
    }

    /// Insert or replace the latest candle for the given key.
    ///
    /// * Same timestamp as the newest stored candle: replaced in place (the
    ///   in-progress bar keeps updating).
    /// * Newer timestamp: appended and the ring trimmed.
    /// * Older timestamp: ignored. Returns `false` in that case.
    pub fn update(&self, key: CandleKey, candle: Candle) -> bool {
        let mut map = self.buffers.write();
        let ring = map
            .entry(key)
            .or_insert_with(|| VecDeque::with_capacity(self.max_candles + 1));

        match ring.back_mut() {
            Some(last) if last.timestamp == candle.timestamp => {
                *last = candle;
            }
            Some(last) if last.timestamp > candle.timestamp => return false,
            _ => {
                ring.push_back(candle);
                while ring.len() > self.max_candles {
                    ring.pop_front();
                }
            }
        }
        true
    }

    /// Return the most recent `count` candles (oldest-first order).
    pub fn get(&self, key: &CandleKey, count: usize) -> Vec<Candle> {
        let map = self.buffers.read();
        match map.get(key) {
            Some(ring) => {
                let start = ring.len().saturating_sub(count);
                ring.iter().skip(start).copied().collect()
            }
            None => Vec::new(),
        }
    }

    /// Return the most recent `count` close prices (oldest-first order).
    pub fn get_closes(&self, key: &CandleKey, count: usize) -> Vec<f64> {
        self.get(key, count).iter().map(|c| c.close).collect()
    }

    /// Close price of the newest candle, if any.
    pub fn last_close(&self, key: &CandleKey) -> Option<f64> {
        let map = self.buffers.read();
        map.get(key).and_then(|ring| ring.back().map(|c| c.close))
    }

    /// Number of candles stored for a key.
    pub fn count(&self, key: &CandleKey) -> usize {
        let map = self.buffers.read();
        map.get(key).map_or(0, VecDeque::len)
    }

    /// All keys currently held, sorted for stable output.
    pub fn keys(&self) -> Vec<CandleKey> {
        let mut keys: Vec<CandleKey> = self.buffers.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_candle(timestamp: i64, close: f64) -> Candle {
        Candle {
            timestamp,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100.0,
        }
    }

    fn make_key(sym: &str, iv: &str) -> CandleKey {
        CandleKey::new(sym, iv)
    }


    #[test]
    fn key_uppercases_symbol() {
        let key = make_key("nifty", "5m");
        assert_eq!(key.to_string(), "NIFTY@5m");
    }

    #[test]
    fn ring_buffer_trimming() {
        let buf = CandleBuffer::new(3);
        let key = make_key("RELIANCE", "1m");

        for i in 0..5 {
            buf.update(key.clone(), sample_candle(i * 60_000, 100.0 + i as f64));
        }

        assert_eq!(buf.count(&key), 3);
        let closes = buf.get_closes(&key, 10);
        assert_eq!(closes, vec![102.0, 103.0, 104.0]);
    }

    #[test]
    fn same_timestamp_replaces_in_place() {
        let buf = CandleBuffer::new(10);
        let key = make_key("INFY", "5m");

        buf.update(key.clone(), sample_candle(0, 50.0));
        buf.update(key.clone(), sample_candle(0, 51.0));
        assert_eq!(buf.count(&key), 1);
        assert_eq!(buf.last_close(&key), Some(51.0));
    }

    #[test]
    fn stale_update_is_ignored() {
        let buf = CandleBuffer::new(10);
        let key = make_key("INFY", "5m");

        buf.update(key.clone(), sample_candle(60_000, 50.0));
        assert!(!buf.update(key.clone(), sample_candle(0, 49.0)));
        assert_eq!(buf.count(&key), 1);
        assert_eq!(buf.last_close(&key), Some(50.0));
    }

    #[test]
    fn replace_sorts_dedups_and_trims() {
        let buf = CandleBuffer::new(3);
        let key = make_key("TCS", "1d");

        let history = vec![
            sample_candle(3, 103.0),
            sample_candle(1, 101.0),
            sample_candle(2, 102.0),
            sample_candle(4, 104.0),
            sample_candle(4, 104.5),
        ];
        buf.replace(key.clone(), history);

        let closes = buf.get_closes(&key, 10);
        assert_eq!(closes, vec![102.0, 103.0, 104.5]);
    }

    #[test]
    fn get_returns_newest_window() {
        let buf = CandleBuffer::new(10);
        let key = make_key("SBIN", "15m");
        for i in 0..6 {
            buf.update(key.clone(), sample_candle(i, i as f64));
        }
        let window = buf.get(&key, 2);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].timestamp, 4);
        assert_eq!(window[1].timestamp, 5);
    }

    #[test]
    fn last_close_empty_returns_none() {
        let buf = CandleBuffer::new(10);
        assert_eq!(buf.last_close(&make_key("XYZ", "1h")), None);
        assert!(buf.keys().is_empty());
    }

    #[test]
    fn typical_price() {
        let c = Candle {
            timestamp: 0,
            open: 10.0,
            high: 12.0,
            low: 9.0,
            close: 11.0,
            volume: 1.0,
        };
        assert!((c.typical_price() - 32.0 / 3.0).abs() < 1e-12);
    }
}
