// =============================================================================
// Swing Pivots and History Scan
// =============================================================================
//
// A swing high at bar i with strength s:
//   high[i] >= high[i-s..i]   and   high[i] > high[i+1..=i+s]
// Swing lows mirror this on the low. Pivots are merged into a strictly
// alternating high/low sequence; of two consecutive same-kind pivots the more
// extreme one survives. An outside bar that qualifies as both is skipped.
//
// `scan` slides a window of `definition.points` pivots across that sequence
// and reports every window where all relationships hold.
// =============================================================================

use serde::Serialize;
use tracing::debug;

use crate::market_data::Candle;
use crate::patterns::error::PatternError;
use crate::patterns::library::PatternDefinition;
use crate::patterns::matcher::{check_tolerance, evaluate, PointSet, SelectedPoint};
use crate::types::Bias;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PivotKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pivot {
    pub index: usize,
    pub timestamp: i64,
    pub price: f64,
    pub kind: PivotKind,
}

/// Widest pivot neighbourhood a scan accepts.
pub const MAX_STRENGTH: usize = 500;

pub fn check_strength(strength: usize) -> Result<(), PatternError> {
    if (1..=MAX_STRENGTH).contains(&strength) {
        Ok(())
    } else {
        Err(PatternError::InvalidStrength {
            value: strength,
            max: MAX_STRENGTH,
        })
    }
}

/// One place in history where a formation was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternOccurrence {
    pub name: String,
    pub bias: Bias,
    pub points: Vec<Pivot>,
    pub start_index: usize,
    pub end_index: usize,
    pub start_time: i64,
    pub end_time: i64,
}

/// Alternating swing pivots. Empty when `strength == 0` or there are fewer
/// than `2 * strength + 1` candles.
pub fn find_pivots(candles: &[Candle], strength: usize) -> Vec<Pivot> {
    let window = strength.checked_mul(2).and_then(|w| w.checked_add(1));
    if strength == 0 || window.map_or(true, |w| candles.len() < w) {
        return Vec::new();
    }

    let mut pivots: Vec<Pivot> = Vec::new();
    for i in strength..candles.len() - strength {
        let c = &candles[i];
        let left = &candles[i - strength..i];
        let right = &candles[i + 1..=i + strength];

        let is_high = left.iter().all(|x| c.high >= x.high) && right.iter().all(|x| c.high > x.high);
        let is_low = left.iter().all(|x| c.low <= x.low) && right.iter().all(|x| c.low < x.low);

        let pivot = match (is_high, is_low) {
            (true, false) => Pivot {
                index: i,
                timestamp: c.timestamp,
                price: c.high,
                kind: PivotKind::High,
            },
            (false, true) => Pivot {
                index: i,
                timestamp: c.timestamp,
                price: c.low,
                kind: PivotKind::Low,
            },
            _ => continue,
        };

        match pivots.last_mut() {
            Some(last) if last.kind == pivot.kind => {
                let more_extreme = match pivot.kind {
                    PivotKind::High => pivot.price > last.price,
                    PivotKind::Low => pivot.price < last.price,
                };
                if more_extreme {
                    *last = pivot;
                }
            }
            _ => pivots.push(pivot),
        }
    }

    pivots
}

/// Find every occurrence of `definition` in the candle history.
pub fn scan(
    candles: &[Candle],
    definition: &PatternDefinition,
    strength: usize,
    tolerance_pct: f64,
) -> Result<Vec<PatternOccurrence>, PatternError> {
    check_strength(strength)?;
    check_tolerance(tolerance_pct)?;

    let pivots = find_pivots(candles, strength);
    let mut found = Vec::new();
    if definition.points == 0 || pivots.len() < definition.points {
        return Ok(found);
    }

    for window in pivots.windows(definition.points) {
        let selection = window
            .iter()
            .map(|p| SelectedPoint {
                index: p.index,
                price: p.price,
                timestamp: Some(p.timestamp),
            })
            .collect();
        let points = PointSet::from_selection(selection)?;
        if evaluate(definition, &points, tolerance_pct)?.matched {
            let (first, last) = (window[0], window[window.len() - 1]);
            found.push(PatternOccurrence {
                name: definition.name.clone(),
                bias: definition.bias,
                points: window.to_vec(),
                start_index: first.index,
                end_index: last.index,
                start_time: first.timestamp,
                end_time: last.timestamp,
            });
        }
    }

    debug!(
        pattern = %definition.name,
        pivots = pivots.len(),
        occurrences = found.len(),
        "pattern scan complete"
    );
    Ok(found)
}
