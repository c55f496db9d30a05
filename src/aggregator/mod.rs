//! Aggregation layer.
//!
//! Takes the raw issues produced by the rules and turns them into the
//! deduplicated, ordered issue list plus per-module rollups used by the
//! reporters.

pub mod collector;
pub mod summary;

pub use collector::IssueCollector;
pub use summary::{ModuleSummary, SummaryBuilder, Totals};
