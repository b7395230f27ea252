// =============================================================================
// Pattern Module
// =============================================================================
//
// Naive chart-pattern matching from ordered inequalities between price points:
// - relation: `point1 > point2` style relationships
// - library:  built-in formations (double top, head and shoulders, ...)
// - matcher:  score a user selection against one or all formations
// - pivots:   detect swing pivots and scan history for formations

pub mod error;
pub mod library;
pub mod matcher;
pub mod pivots;
pub mod relation;

pub use error::PatternError;
pub use library::PatternDefinition;
pub use matcher::{check_tolerance, evaluate, match_library, PatternMatch, PointSet, SelectedPoint};
pub use pivots::{check_strength, scan, PatternOccurrence};
pub use relation::Relationship;
