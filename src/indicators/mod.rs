// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the chart indicators. Series
// functions return a compact `Vec<f64>` that starts at the first bar with a
// defined value; an empty vec means insufficient data. `series` aligns those
// onto the candle axis for the API.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod ema;
pub mod error;
pub mod macd;
pub mod mfi;
pub mod psar;
pub mod roc;
pub mod rsi;
pub mod series;
pub mod sma;
pub mod stochastic;
pub mod vwap;
pub mod williams_r;
pub mod wma;

pub use error::IndicatorError;
pub use series::{compute, IndicatorOutput, IndicatorSpec};
