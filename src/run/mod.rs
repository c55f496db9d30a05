//! Validation runs: options, the pipeline and its report.

mod pipeline;
mod report;

pub use pipeline::{LayerFilter, ValidateOptions, validate};
pub use report::Report;
