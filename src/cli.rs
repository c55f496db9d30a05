use crate::run::LayerFilter;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "route-audit",
    version,
    about = "Cross-tier route and authorization compliance validator",
    long_about = "route-audit checks that every route called by the client exists in the handlers and the infrastructure, and that each handler enforces the authorization lifecycle its scope requires."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a project tree and report issues per module
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Clone)]
#[command(group(
    clap::ArgGroup::new("layers")
        .args(["layer1_only", "layer2_only", "all_auth"])
        .multiple(false)
))]
pub struct ValidateArgs {
    /// Project root to validate
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Configuration file (default: .route-audit.{yaml,yml,json,toml} in the root)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Restrict the report to one registry module
    #[arg(short, long)]
    pub module: Option<String>,

    /// Keep only Layer-1 (role gate) authorization issues
    #[arg(long)]
    pub layer1_only: bool,

    /// Keep only Layer-2 (membership and permission) authorization issues
    #[arg(long)]
    pub layer2_only: bool,

    /// Keep issues from both authorization layers (default)
    #[arg(long)]
    pub all_auth: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Print every issue, not only the module summary
    #[arg(short, long)]
    pub verbose: bool,

    /// CI mode: non-interactive output
    #[arg(long)]
    pub ci: bool,
}

impl ValidateArgs {
    pub fn layer_filter(&self) -> LayerFilter {
        if self.layer1_only {
            LayerFilter::Layer1Only
        } else if self.layer2_only {
            LayerFilter::Layer2Only
        } else {
            LayerFilter::All
        }
    }
}
