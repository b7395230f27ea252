// =============================================================================
// Bollinger Bands
// =============================================================================
//
//   middle = SMA(period)
//   upper  = middle + k * σ
//   lower  = middle - k * σ
//   width  = (upper - lower) / middle * 100
//
// σ is the population standard deviation of the window.
// =============================================================================

use serde::Serialize;

/// One Bollinger reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BollingerResult {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// Band width as a percentage of the middle band. `0.0` when middle is 0.
    pub width: f64,
}

impl BollingerResult {
    /// Position of `price` inside the bands (%B): 0 at the lower band, 1 at
    /// the upper band. `None` when the bands have collapsed.
    pub fn percent_b(&self, price: f64) -> Option<f64> {
        let range = self.upper - self.lower;
        if range == 0.0 {
            return None;
        }
        Some((price - self.lower) / range)
    }
}

fn band(window: &[f64], num_std: f64) -> Option<BollingerResult> {
    let n = window.len() as f64;
    let middle = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|x| (x - middle).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    let upper = middle + num_std * std_dev;
    let lower = middle - num_std * std_dev;
    let width = if middle == 0.0 {
        0.0
    } else {
        (upper - lower) / middle.abs() * 100.0
    };

    let all_finite = [upper, middle, lower, width].iter().all(|v| v.is_finite());
    all_finite.then_some(BollingerResult {
        upper,
        middle,
        lower,
        width,
    })
}

/// Bollinger Bands for every window; index 0 corresponds to close
/// `period - 1`.
pub fn calculate_bollinger_series(closes: &[f64], period: usize, num_std: f64) -> Vec<BollingerResult> {
    if period == 0 || closes.len() < period {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(closes.len() - period + 1);
    for window in closes.windows(period) {
        match band(window, num_std) {
            Some(b) => result.push(b),
            None => break,
        }
    }
    result
}

/// Bollinger Bands over the most recent `period` closes.
pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> Option<BollingerResult> {
    if period == 0 || closes.len() < period {
        return None;
    }
    band(&closes[closes.len() - period..], num_std)
}
