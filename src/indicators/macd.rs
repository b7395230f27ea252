// =============================================================================
// Moving Average Convergence Divergence (MACD) — Appel
// =============================================================================
//
//   line      = EMA(fast) - EMA(slow)
//   signal    = EMA(signal_period) of line
//   histogram = line - signal
//
// The line starts at input index `slow - 1`; signal and histogram start
// `signal_period - 1` bars later.
// =============================================================================

use serde::Serialize;

use crate::indicators::ema::calculate_ema;

/// Compact MACD series. `line` is offset `slow - 1`; `signal` and `histogram`
/// are offset `slow + signal_period - 2` and have equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MacdSeries {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Latest MACD reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdReading {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Compute MACD for `closes`.
///
/// Returns an empty series when any period is zero, `fast >= slow`, or there
/// are fewer than `slow` closes. `signal`/`histogram` stay empty until
/// `slow + signal_period - 1` closes are available.
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdSeries {
    if fast == 0 || slow == 0 || signal_period == 0 || fast >= slow {
        return MacdSeries::default();
    }

    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);
    if slow_ema.is_empty() {
        return MacdSeries::default();
    }

    // fast_ema[i + shift] and slow_ema[i] refer to the same bar.
    let shift = slow - fast;
    let len = slow_ema.len().min(fast_ema.len().saturating_sub(shift));
    let line: Vec<f64> = (0..len).map(|i| fast_ema[i + shift] - slow_ema[i]).collect();

    let signal = calculate_ema(&line, signal_period);
    let histogram: Vec<f64> = signal
        .iter()
        .enumerate()
        .map(|(j, s)| line[j + signal_period - 1] - s)
        .collect();

    MacdSeries {
        line,
        signal,
        histogram,
    }
}

/// Most recent MACD line / signal / histogram.
pub fn current_macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> Option<MacdReading> {
    let series = calculate_macd(closes, fast, slow, signal_period);
    Some(MacdReading {
        line: *series.line.last()?,
        signal: *series.signal.last()?,
        histogram: *series.histogram.last()?,
    })
}
