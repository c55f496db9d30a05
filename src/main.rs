use clap::Parser;
use route_audit::{Cli, cli::Commands, handlers::handle_validate};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Validate(args) => handle_validate(args),
    }
}
