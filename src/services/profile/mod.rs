//! Sheet-agnostic profiling and insight generation.
//!
//! Everything in this module is a pure function of the table it is given:
//! no I/O, no caching, no cross-call state. Callers that want memoization
//! key it on [`profiler::fingerprint`] and own the cache themselves.

pub mod insights;
pub mod profiler;
pub mod types;

pub use insights::{generate_insights, generate_insights_with};
pub use profiler::{fingerprint, missing_value_report, profile};
pub use types::{
    ColumnKind, ColumnProfile, Insight, InsightKind, InsightOptions, MissingColumn, TableProfile,
};
