// =============================================================================
// Options Module
// =============================================================================
//
// Black-Scholes Greeks and option-chain analytics for the dashboard's
// option chain view.

pub mod chain;
pub mod greeks;

pub use chain::{analyze_chain, ChainAnalytics, ChainRow};
pub use greeks::{black_scholes, implied_volatility, Greeks, OptionInputs, OptionType, OptionsError};
