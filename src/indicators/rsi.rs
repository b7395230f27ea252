// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing
// =============================================================================
//
//   avg_gain_0 = SMA of the first `period` gains (same for losses)
//   avg_gain_t = (avg_gain_{t-1} * (period - 1) + gain_t) / period
//   RSI        = 100 - 100 / (1 + avg_gain / avg_loss)
// =============================================================================

use serde::Serialize;

/// Overbought / oversold classification of an oscillator reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsiZone {
    Overbought,
    Oversold,
    Neutral,
}

impl RsiZone {
    pub fn classify(value: f64, oversold: f64, overbought: f64) -> Self {
        if value >= overbought {
            Self::Overbought
        } else if value <= oversold {
            Self::Oversold
        } else {
            Self::Neutral
        }
    }
}

impl std::fmt::Display for RsiZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overbought => write!(f, "OVERBOUGHT"),
            Self::Oversold => write!(f, "OVERSOLD"),
            Self::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Compute the full RSI series for `closes` and `period`.
///
/// One value per close starting at index `period`. Needs at least
/// `period + 1` closes. All gains => 100, no movement => 50.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() <= period {
        return Vec::new();
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let (sum_gain, sum_loss) = deltas[..period].iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
        if d > 0.0 {
            (g + d, l)
        } else {
            (g, l - d)
        }
    });

    let period_f = period as f64;
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;

    let Some(first) = rsi_from_averages(avg_gain, avg_loss) else {
        return Vec::new();
    };

    let mut result = Vec::with_capacity(deltas.len() - period + 1);
    result.push(first);

    for &delta in &deltas[period..] {
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;

        match rsi_from_averages(avg_gain, avg_loss) {
            Some(rsi) => result.push(rsi),
            None => break,
        }
    }

    result
}

/// Latest RSI value with its zone.
pub fn current_rsi(closes: &[f64], period: usize, oversold: f64, overbought: f64) -> Option<(f64, RsiZone)> {
    let value = *calculate_rsi(closes, period).last()?;
    Some((value, RsiZone::classify(value, oversold, overbought)))
}

/// Convert average gain / average loss into an RSI value in [0, 100].
pub(crate) fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    };

    rsi.is_finite().then_some(rsi)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_degenerate_inputs() {
        assert!(calculate_rsi(&[], 14).is_empty());
        assert!(calculate_rsi(&[1.0, 2.0, 3.0], 0).is_empty());
        let fourteen: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        assert!(calculate_rsi(&fourteen, 14).is_empty());
    }

    #[test]
    fn rsi_huge_period_is_empty() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        assert!(calculate_rsi(&closes, usize::MAX).is_empty());
        assert!(calculate_rsi(&closes, 30).is_empty());
    }

    #[test]
    fn rsi_output_length() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        assert_eq!(calculate_rsi(&closes, 14).len(), 30 - 14);
    }

    #[test]
    fn rsi_all_gains() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        for v in calculate_rsi(&closes, 14) {
            assert!((v - 100.0).abs() < 1e-10, "expected 100.0, got {v}");
        }
    }

    #[test]
    fn rsi_all_losses() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        for v in calculate_rsi(&closes, 14) {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_flat_market() {
        for v in calculate_rsi(&[100.0; 30], 14) {
            assert!((v - 50.0).abs() < 1e-10);
        }
    }

    #[test]
    fn rsi_wilder_reference() {
        // Wilder-style sample series; first 14-period RSI is ~70.46.
        let closes = [
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ];
        let series = calculate_rsi(&closes, 14);
        assert!((series[0] - 70.464).abs() < 0.01, "got {}", series[0]);
        for &v in &series {
            assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn current_rsi_zones() {
        let up: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        assert_eq!(current_rsi(&up, 14, 30.0, 70.0).unwrap().1, RsiZone::Overbought);

        let down: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        assert_eq!(current_rsi(&down, 14, 30.0, 70.0).unwrap().1, RsiZone::Oversold);

        assert_eq!(current_rsi(&[100.0; 30], 14, 30.0, 70.0).unwrap().1, RsiZone::Neutral);
        assert!(current_rsi(&[], 14, 30.0, 70.0).is_none());
    }

    #[test]
    fn zone_display() {
        assert_eq!(RsiZone::Overbought.to_string(), "OVERBOUGHT");
        assert_eq!(RsiZone::classify(25.0, 20.0, 80.0), RsiZone::Neutral);
    }
}
