//! Pattern matching errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PatternError {
    /// A relationship string that does not parse as `pointN <op> pointM`.
    #[error("invalid relationship '{input}': {reason}")]
    InvalidRelationship { input: String, reason: String },

    /// A relationship refers to a point the selection does not have.
    #[error("unknown point '{label}' (selection has {available} points)")]
    UnknownPoint { label: String, available: usize },

    #[error("duplicate bar index {0} in point selection")]
    DuplicateIndex(usize),

    #[error("point at bar {index} has a non-finite price")]
    NonFinitePrice { index: usize },

    #[error("point selection is empty")]
    EmptySelection,

    #[error("custom pattern needs at least one relationship")]
    NoRelationships,

    #[error("tolerance must be a finite percentage >= 0, got {0}")]
    InvalidTolerance(f64),

    #[error("pivot strength must be in 1..={max}, got {value}")]
    InvalidStrength { value: usize, max: usize },

    #[error("unknown pattern '{0}'")]
    UnknownPattern(String),
}
