// =============================================================================
// Pattern Matcher — score user-selected points against formations
// =============================================================================
//
// The user clicks N swing points on the chart. They are ordered by bar index
// and labelled point1..pointN, then every relationship of a definition is
// evaluated:
//
//   score   = satisfied / total
//   matched = score == 1 and the selection has exactly `definition.points`
// =============================================================================

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::patterns::error::PatternError;
use crate::patterns::library::{self, PatternDefinition};
use crate::types::Bias;

/// One point clicked on the chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectedPoint {
    /// Bar index in the candle array.
    pub index: usize,
    pub price: f64,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// A chronologically ordered, validated selection.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    points: Vec<SelectedPoint>,
}

impl PointSet {
    /// Sort by bar index and validate. Rejects empty selections, duplicate
    /// bar indices and non-finite prices.
    pub fn from_selection(mut points: Vec<SelectedPoint>) -> Result<Self, PatternError> {
        if points.is_empty() {
            return Err(PatternError::EmptySelection);
        }
        if let Some(p) = points.iter().find(|p| !p.price.is_finite()) {
            return Err(PatternError::NonFinitePrice { index: p.index });
        }

        points.sort_by_key(|p| p.index);
        let mut seen = HashSet::with_capacity(points.len());
        for p in &points {
            if !seen.insert(p.index) {
                return Err(PatternError::DuplicateIndex(p.index));
            }
        }

        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Price of `point{n}` (1-based).
    pub fn price(&self, n: usize) -> Option<f64> {
        n.checked_sub(1).and_then(|i| self.points.get(i)).map(|p| p.price)
    }

    pub fn points(&self) -> &[SelectedPoint] {
        &self.points
    }
}

/// Outcome of evaluating one definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternMatch {
    pub name: String,
    pub bias: Bias,
    pub satisfied: usize,
    pub total: usize,
    pub score: f64,
    pub matched: bool,
    /// Canonical text of every relationship that did not hold.
    pub failed: Vec<String>,
}

pub fn check_tolerance(tolerance_pct: f64) -> Result<(), PatternError> {
    if tolerance_pct.is_finite() && tolerance_pct >= 0.0 {
        Ok(())
    } else {
        Err(PatternError::InvalidTolerance(tolerance_pct))
    }
}

/// Evaluate `definition` against the selection.
pub fn evaluate(
    definition: &PatternDefinition,
    points: &PointSet,
    tolerance_pct: f64,
) -> Result<PatternMatch, PatternError> {
    check_tolerance(tolerance_pct)?;

    let mut satisfied = 0;
    let mut failed = Vec::new();
    for rel in &definition.relationships {
        if rel.holds(points, tolerance_pct)? {
            satisfied += 1;
        } else {
            failed.push(rel.to_string());
        }
    }

    let total = definition.relationships.len();
    let score = if total == 0 { 0.0 } else { satisfied as f64 / total as f64 };

    Ok(PatternMatch {
        name: definition.name.clone(),
        bias: definition.bias,
        satisfied,
        total,
        score,
        matched: total > 0 && failed.is_empty() && points.len() == definition.points,
        failed,
    })
}

/// Rank every built-in pattern with the selection's point count.
///
/// Results below `min_score` are dropped; the rest are sorted by score
/// (descending) then name.
pub fn match_library(points: &PointSet, tolerance_pct: f64, min_score: f64) -> Result<Vec<PatternMatch>, PatternError> {
    let mut results = Vec::new();
    for def in library::builtin().iter().filter(|d| d.points == points.len()) {
        let m = evaluate(def, points, tolerance_pct)?;
        if m.score >= min_score {
            results.push(m);
        }
    }

    results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    Ok(results)
}
