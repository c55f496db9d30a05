pub mod builtin;
pub mod engine;
pub mod types;

pub use engine::{Rule, RuleContext, RuleEngine};
pub use types::*;
