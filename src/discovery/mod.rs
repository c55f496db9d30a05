//! Discovery layer: which files are scanned, and as which tier.
//!
//! - `walker`: directory traversal, exclusion and ignore files
//! - `patterns`: tier classification from layout conventions

pub mod patterns;
pub mod walker;

pub use crate::ignore::IgnoreFilter;
pub use patterns::{FileRole, TierClassifier};
pub use walker::{DEFAULT_EXCLUDED_DIRS, PathFilter};
