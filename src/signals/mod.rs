// =============================================================================
// Signals Module
// =============================================================================
//
// Signal processing for the technical summary card:
// - Weighted ensemble scoring
// - Indicator readings turned into directional votes

pub mod summary;
pub mod weighted_score;

pub use summary::{summarize, TechnicalSummary};
