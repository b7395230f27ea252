// =============================================================================
// Pattern Library — built-in chart formations
// =============================================================================
//
// Every formation is a list of relationships over chronologically ordered
// swing points. Bullish formations are written out; their bearish
// counterparts are the mirror image (`>` <-> `<`, `>=` <-> `<=`, `~=` kept).
//
//   double_bottom          5 points   start, low, peak, low, breakout
//   inverse_head_shoulders 7 points   start, shoulder, peak, head, peak, shoulder, breakout
//   triple_bottom          7 points   start, low, peak, low, peak, low, breakout
//   ascending_triangle     5 points   low, high, higher low, equal high, higher low
//   uptrend                4 points   low, high, higher low, higher high
// =============================================================================

use std::sync::OnceLock;

use serde::Serialize;

use crate::patterns::error::PatternError;
use crate::patterns::relation::{Comparator, Relationship};
use crate::types::Bias;

use Comparator::{Approx, Gt, Lt};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternDefinition {
    pub name: String,
    pub bias: Bias,
    /// Number of points the formation is drawn with.
    pub points: usize,
    pub relationships: Vec<Relationship>,
    pub description: String,
}

impl PatternDefinition {
    fn new(name: &str, bias: Bias, points: usize, relationships: &[(usize, Comparator, usize)], description: &str) -> Self {
        Self {
            name: name.to_string(),
            bias,
            points,
            relationships: relationships
                .iter()
                .map(|&(l, c, r)| Relationship::new(l, c, r))
                .collect(),
            description: description.to_string(),
        }
    }

    /// The same point layout with every inequality flipped.
    pub fn mirrored(&self, name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            bias: self.bias.mirror(),
            points: self.points,
            relationships: self.relationships.iter().map(Relationship::mirror).collect(),
            description: description.to_string(),
        }
    }

    /// A user-drawn formation over `points` selected points.
    pub fn custom(relationships: Vec<Relationship>, points: usize) -> Result<Self, PatternError> {
        if relationships.is_empty() {
            return Err(PatternError::NoRelationships);
        }
        if let Some(rel) = relationships.iter().find(|r| r.max_point() > points) {
            return Err(PatternError::UnknownPoint {
                label: format!("point{}", rel.max_point()),
                available: points,
            });
        }
        Ok(Self {
            name: "custom".to_string(),
            bias: Bias::Neutral,
            points,
            relationships,
            description: "User-defined relationships".to_string(),
        })
    }
}

/// All built-in formations, bullish before bearish for each pair.
pub fn builtin() -> &'static [PatternDefinition] {
    static LIBRARY: OnceLock<Vec<PatternDefinition>> = OnceLock::new();
    LIBRARY.get_or_init(build)
}

/// Look up a built-in formation by name.
pub fn find(name: &str) -> Option<&'static PatternDefinition> {
    builtin().iter().find(|d| d.name.eq_ignore_ascii_case(name))
}

fn build() -> Vec<PatternDefinition> {
    let double_bottom = PatternDefinition::new(
        "double_bottom",
        Bias::Bullish,
        5,
        &[(2, Lt, 1), (2, Lt, 3), (4, Lt, 3), (4, Lt, 5), (2, Approx, 4), (5, Gt, 3)],
        "Two equal lows separated by a peak, confirmed by a close above the peak",
    );
    let double_top = double_bottom.mirrored(
        "double_top",
        "Two equal highs separated by a trough, confirmed by a close below the trough",
    );

    let inverse_hs = PatternDefinition::new(
        "inverse_head_and_shoulders",
        Bias::Bullish,
        7,
        &[
            (2, Lt, 1),
            (4, Lt, 2),
            (4, Lt, 6),
            (3, Gt, 2),
            (5, Gt, 6),
            (3, Approx, 5),
            (2, Approx, 6),
            (7, Gt, 5),
        ],
        "Lowest low between two higher, similar lows with a flat neckline break",
    );
    let hs = inverse_hs.mirrored(
        "head_and_shoulders",
        "Highest high between two lower, similar highs with a flat neckline break",
    );

    let triple_bottom = PatternDefinition::new(
        "triple_bottom",
        Bias::Bullish,
        7,
        &[
            (2, Lt, 1),
            (3, Gt, 2),
            (4, Lt, 3),
            (5, Gt, 4),
            (6, Lt, 5),
            (2, Approx, 4),
            (4, Approx, 6),
            (7, Gt, 3),
            (7, Gt, 5),
        ],
        "Three equal lows, confirmed by a close above both intervening peaks",
    );
    let triple_top = triple_bottom.mirrored(
        "triple_top",
        "Three equal highs, confirmed by a close below both intervening troughs",
    );

    let ascending = PatternDefinition::new(
        "ascending_triangle",
        Bias::Bullish,
        5,
        &[(2, Gt, 1), (3, Gt, 1), (3, Lt, 2), (4, Approx, 2), (5, Gt, 3), (5, Lt, 4)],
        "Flat resistance with rising lows",
    );
    let descending = ascending.mirrored("descending_triangle", "Flat support with falling highs");

    let uptrend = PatternDefinition::new(
        "uptrend",
        Bias::Bullish,
        4,
        &[(2, Gt, 1), (3, Lt, 2), (3, Gt, 1), (4, Gt, 2)],
        "Higher highs and higher lows",
    );
    let downtrend = uptrend.mirrored("downtrend", "Lower highs and lower lows");

    vec![
        double_bottom,
        double_top,
        inverse_hs,
        hs,
        triple_bottom,
        triple_top,
        ascending,
        descending,
        uptrend,
        downtrend,
    ]
}
