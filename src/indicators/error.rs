//! Indicator request errors.

use thiserror::Error;

/// Errors raised while validating an indicator request. The math itself never
/// errors; short inputs simply produce empty (all-`null`) lines.
#[derive(Debug, Error, PartialEq)]
pub enum IndicatorError {
    /// A look-back period of zero.
    #[error("{indicator}: {param} must be greater than zero")]
    ZeroPeriod {
        indicator: &'static str,
        param: &'static str,
    },

    /// Parameters that are individually valid but inconsistent.
    #[error("{indicator}: {reason}")]
    InvalidParams {
        indicator: &'static str,
        reason: String,
    },

    /// Parameter outside its valid range.
    #[error("{indicator}: {param} = {value} is out of range ({min}..={max})")]
    OutOfRange {
        indicator: &'static str,
        param: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}
