// =============================================================================
// Weighted Moving Average (WMA)
// =============================================================================
//
// Linearly weighted: the newest value in the window carries weight `period`,
// the oldest weight 1.
//
//   WMA_t = Σ_{i=1..p} i * x_{t-p+i} / (p (p + 1) / 2)
// =============================================================================

/// Compute the WMA series of `values` for look-back `period`.
///
/// Output index 0 corresponds to input index `period - 1`.
pub fn calculate_wma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let denominator = (period * (period + 1)) as f64 / 2.0;
    let mut result = Vec::with_capacity(values.len() - period + 1);

    for window in values.windows(period) {
        let weighted: f64 = window
            .iter()
            .enumerate()
            .map(|(i, &v)| (i + 1) as f64 * v)
            .sum();
        let wma = weighted / denominator;
        if !wma.is_finite() {
            break;
        }
        result.push(wma);
    }

    result
}
