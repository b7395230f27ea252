// =============================================================================
// Rate of Change (ROC)
// =============================================================================
//
//   ROC = (close - close_n) / close_n * 100
// =============================================================================

/// ROC series, one value per close starting at index `period`.
/// A zero reference close reads 0.
pub fn calculate_roc(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() <= period {
        return Vec::new();
    }

    closes
        .iter()
        .zip(&closes[period..])
        .map(|(&prev, &cur)| if prev == 0.0 { 0.0 } else { (cur - prev) / prev * 100.0 })
        .collect()
}

/// Most recent ROC value.
pub fn current_roc(closes: &[f64], period: usize) -> Option<f64> {
    calculate_roc(closes, period).last().copied()
}
