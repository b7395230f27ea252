// =============================================================================
// Point Relationships — ordered inequalities between selected price points
// =============================================================================
//
//   "point1 > point2"    strictly greater
//   "p3 ~= p5"           approximately equal: |a - b| <= tol% * max(|a|, |b|)
//   "point2>=point4"     whitespace optional, `p<n>` aliases `point<n>`
//
// Points are 1-based and labelled in chronological order by the matcher.
// =============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::patterns::error::PatternError;
use crate::patterns::matcher::PointSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "~=")]
    Approx,
}

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Approx => "~=",
        }
    }

    /// Flip the inequality; approximate equality is symmetric.
    pub fn mirror(self) -> Self {
        match self {
            Self::Gt => Self::Lt,
            Self::Lt => Self::Gt,
            Self::Ge => Self::Le,
            Self::Le => Self::Ge,
            Self::Approx => Self::Approx,
        }
    }

    /// Compare `a` against `b`. `tolerance_pct` only affects `~=`.
    pub fn apply(self, a: f64, b: f64, tolerance_pct: f64) -> bool {
        match self {
            Self::Gt => a > b,
            Self::Lt => a < b,
            Self::Ge => a >= b,
            Self::Le => a <= b,
            Self::Approx => (a - b).abs() <= tolerance_pct / 100.0 * a.abs().max(b.abs()),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// `point{left} <comparator> point{right}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Relationship {
    pub left: usize,
    pub comparator: Comparator,
    pub right: usize,
}

impl Relationship {
    pub const fn new(left: usize, comparator: Comparator, right: usize) -> Self {
        Self {
            left,
            comparator,
            right,
        }
    }

    /// Highest point number this relationship references.
    pub fn max_point(&self) -> usize {
        self.left.max(self.right)
    }

    pub fn mirror(&self) -> Self {
        Self {
            comparator: self.comparator.mirror(),
            ..*self
        }
    }

    /// Evaluate against the labelled selection.
    pub fn holds(&self, points: &PointSet, tolerance_pct: f64) -> Result<bool, PatternError> {
        let lookup = |n: usize| {
            points.price(n).ok_or_else(|| PatternError::UnknownPoint {
                label: format!("point{n}"),
                available: points.len(),
            })
        };
        let a = lookup(self.left)?;
        let b = lookup(self.right)?;
        Ok(self.comparator.apply(a, b, tolerance_pct))
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "point{} {} point{}", self.left, self.comparator, self.right)
    }
}

impl FromStr for Relationship {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| PatternError::InvalidRelationship {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let op_start = s
            .find(['>', '<', '~', '='])
            .ok_or_else(|| invalid("missing comparator"))?;
        let rest = &s[op_start..];

        let comparator = if rest.starts_with(">=") {
            Comparator::Ge
        } else if rest.starts_with("<=") {
            Comparator::Le
        } else if rest.starts_with("~=") {
            Comparator::Approx
        } else if rest.starts_with('>') {
            Comparator::Gt
        } else if rest.starts_with('<') {
            Comparator::Lt
        } else {
            return Err(invalid("unsupported comparator"));
        };

        let left = parse_label(&s[..op_start]).ok_or_else(|| invalid("left side is not a point label"))?;
        let right = parse_label(&rest[comparator.symbol().len()..])
            .ok_or_else(|| invalid("right side is not a point label"))?;

        Ok(Self::new(left, comparator, right))
    }
}

impl TryFrom<String> for Relationship {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Relationship> for String {
    fn from(value: Relationship) -> Self {
        value.to_string()
    }
}

/// `point7` / `p7` / `Point7` => 7. Zero is not a valid label.
fn parse_label(raw: &str) -> Option<usize> {
    let label = raw.trim().to_ascii_lowercase();
    let digits = label
        .strip_prefix("point")
        .or_else(|| label.strip_prefix('p'))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|&n| n > 0)
}
