// =============================================================================
// Weighted Ensemble Scorer — indicator signal aggregation
// =============================================================================
//
//   contribution_i = weight_i * confidence_i * direction_i
//   score          = Σ contribution_i
//
// BUY when score > threshold, SELL when score < -threshold, HOLD otherwise.
// With weights summing to 1 the score is bounded by [-1, 1].
// =============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::Decision;

/// A single signal input to the scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalInput {
    pub name: String,
    /// Fallback weight when the scorer has no entry for `name`.
    pub weight: f64,
    pub confidence: f64,
    /// +1.0 for bullish, -1.0 for bearish, 0.0 for neutral.
    pub direction: f64,
}

/// The contribution of a single signal to the final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalContribution {
    pub name: String,
    pub weight: f64,
    pub confidence: f64,
    pub direction: f64,
    pub contribution: f64,
}

/// Result of the weighted scoring pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub total_score: f64,
    pub decision: Decision,
    pub signal_contributions: Vec<SignalContribution>,
}

/// Per-signal weights for the scoring engine.
#[derive(Debug, Clone)]
pub struct SignalWeights {
    pub weights: HashMap<String, f64>,
}

impl Default for SignalWeights {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert("rsi".to_string(), 0.12);
        weights.insert("macd".to_string(), 0.14);
        weights.insert("ema_trend".to_string(), 0.16);
        weights.insert("bollinger".to_string(), 0.08);
        weights.insert("stochastic".to_string(), 0.10);
        weights.insert("cci".to_string(), 0.08);
        weights.insert("williams_r".to_string(), 0.08);
        weights.insert("mfi".to_string(), 0.10);
        weights.insert("psar".to_string(), 0.14);
        Self { weights }
    }
}

/// The main weighted scoring engine.
pub struct WeightedScorer {
    weights: SignalWeights,
    /// Minimum absolute score to produce BUY / SELL.
    pub entry_threshold: f64,
}

impl WeightedScorer {
    pub fn new(entry_threshold: f64) -> Self {
        Self::with_weights(SignalWeights::default(), entry_threshold)
    }

    pub fn with_weights(weights: SignalWeights, entry_threshold: f64) -> Self {
        Self {
            weights,
            entry_threshold,
        }
    }

    /// Score a set of signal inputs.
    pub fn score(&self, signals: &[SignalInput]) -> ScoringResult {
        let mut contributions = Vec::with_capacity(signals.len());
        let mut total_score = 0.0;

        for signal in signals {
            let base_weight = self
                .weights
                .weights
                .get(&signal.name)
                .copied()
                .unwrap_or(signal.weight);

            let contribution = base_weight * signal.confidence * signal.direction;

            contributions.push(SignalContribution {
                name: signal.name.clone(),
                weight: base_weight,
                confidence: signal.confidence,
                direction: signal.direction,
                contribution,
            });

            total_score += contribution;
        }

        let decision = if total_score > self.entry_threshold {
            Decision::Buy
        } else if total_score < -self.entry_threshold {
            Decision::Sell
        } else {
            Decision::Hold
        };

        ScoringResult {
            total_score,
            decision,
            signal_contributions: contributions,
        }
    }
}

impl Default for WeightedScorer {
    fn default() -> Self {
        Self::new(0.15)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, confidence: f64, direction: f64) -> SignalInput {
        SignalInput {
            name: name.to_string(),
            weight: 0.5,
            confidence,
            direction,
        }
    }

    #[test]
    fn default_weights_sum_to_one() {
        let total: f64 = SignalWeights::default().weights.values().sum();
        assert!((total - 1.0).abs() < 1e-10);
    }

    #[test]
    fn bullish_consensus_buys() {
        let scorer = WeightedScorer::default();
        let result = scorer.score(&[input("ema_trend", 1.0, 1.0), input("macd", 1.0, 1.0)]);
        assert!((result.total_score - 0.30).abs() < 1e-10);
        assert_eq!(result.decision, Decision::Buy);
        assert_eq!(result.signal_contributions.len(), 2);
    }

    #[test]
    fn conflicting_signals_hold() {
        let scorer = WeightedScorer::default();
        let result = scorer.score(&[input("ema_trend", 1.0, 1.0), input("psar", 1.0, -1.0)]);
        assert!((result.total_score - 0.02).abs() < 1e-10);
        assert_eq!(result.decision, Decision::Hold);
    }

    #[test]
    fn bearish_and_unknown_weight_fallback() {
        let scorer = WeightedScorer::new(0.1);
        let result = scorer.score(&[input("custom", 0.5, -1.0)]);
        // Unknown name uses the input's own weight.
        assert!((result.total_score + 0.25).abs() < 1e-10);
        assert_eq!(result.decision, Decision::Sell);
        assert_eq!(result.signal_contributions[0].weight, 0.5);
    }

    #[test]
    fn threshold_is_strict() {
        let mut weights = SignalWeights::default();
        weights.weights.insert("rsi".to_string(), 0.15);
        let scorer = WeightedScorer::with_weights(weights, 0.15);
        assert_eq!(scorer.score(&[input("rsi", 1.0, 1.0)]).decision, Decision::Hold);
        assert_eq!(scorer.score(&[]).decision, Decision::Hold);
    }
}
