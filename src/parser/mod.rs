//! Source parsing layer.
//!
//! - `traits`: source kind detection
//! - `source`: lexical helpers (comment masking, literals, delimiters, lines)
//! - `script`: structural facts about JS/TS (functions, calls, imports, JSX)

pub mod script;
pub mod source;
pub mod traits;

pub use script::{CallSite, FunctionIndex, Import};
pub use source::{LineIndex, StringLit, mask_comments};
pub use traits::SourceKind;
