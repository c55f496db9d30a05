pub mod aggregator;
pub mod auth;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod ignore;
pub mod parser;
pub mod reporter;
pub mod routes;
pub mod rules;
pub mod run;
pub mod scoring;

#[cfg(test)]
pub mod test_utils;

pub use cli::{Cli, OutputFormat, ValidateArgs};
pub use config::{Config, ConfigError};
pub use error::{Result, ValidateError};
pub use reporter::{Reporter, json::JsonReporter, terminal::TerminalReporter};
pub use routes::{HttpVerb, RouteGraph, RouteKey, RouteRecord, normalize};
pub use rules::{Issue, IssueKind, RuleEngine, Severity};
pub use run::{LayerFilter, Report, ValidateOptions, validate};
pub use scoring::{CertificationPolicy, CertificationTier};
