// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
//   SMA_t = (x_{t-p+1} + ... + x_t) / p
//
// Computed with a running sum so the whole series is O(n).
// =============================================================================

/// Compute the SMA series of `values` for look-back `period`.
///
/// The first output element corresponds to input index `period - 1`.
/// Returns an empty `Vec` when `period == 0` or there are fewer than `period`
/// values. A non-finite window sum truncates the series.
pub fn calculate_sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let period_f = period as f64;
    let mut sum: f64 = values[..period].iter().sum();
    if !sum.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(values.len() - period + 1);
    result.push(sum / period_f);

    for i in period..values.len() {
        sum += values[i] - values[i - period];
        if !sum.is_finite() {
            break;
        }
        result.push(sum / period_f);
    }

    result
}

/// Most recent SMA value.
pub fn current_sma(values: &[f64], period: usize) -> Option<f64> {
    calculate_sma(values, period).last().copied()
}
