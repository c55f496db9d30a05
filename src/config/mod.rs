//! Configuration layer for route-audit.
//!
//! This module provides configuration loading and the module/scope registry.
//!
//! ## Layers
//! - `types`: Configuration type definitions and registry lookups
//! - `loading`: File loading logic
//! - `error`: Configuration errors (always fatal)

mod error;
mod loading;
mod types;

pub use error::ConfigError;
pub use loading::CONFIG_FILE_NAMES;
pub use types::{
    ClientConfig, Config, DEFAULT_MODULE, HandlerConfig, LayoutConfig, ModuleEntry,
    PrimitivesConfig, Registry, ScopeRule, UNASSIGNED_MODULE,
};
