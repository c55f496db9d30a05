//! Command handlers.

use crate::cli::{OutputFormat, ValidateArgs};
use crate::config::Config;
use crate::reporter::{Reporter, json::JsonReporter, terminal::TerminalReporter};
use crate::run::{ValidateOptions, validate};
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing::{debug, info};

/// Handle `route-audit validate`.
pub fn handle_validate(args: &ValidateArgs) -> ExitCode {
    info!(path = %args.path.display(), "Starting validation");

    let config = match Config::load(&args.path, args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    // The bar would corrupt JSON consumers reading a merged stream.
    let is_tty = args.format == OutputFormat::Text && std::io::stderr().is_terminal();
    let options = ValidateOptions::new(&args.path)
        .with_module(args.module.clone())
        .with_layers(args.layer_filter())
        .with_progress(is_tty, args.ci);

    let report = match validate(&config, &options) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    let output = match args.format {
        OutputFormat::Text => TerminalReporter::new(args.verbose).report(&report),
        OutputFormat::Json => JsonReporter::new().report(&report),
    };
    println!("{}", output);

    debug!(
        errors = report.totals.errors,
        warnings = report.totals.warnings,
        "Validation complete"
    );

    if report.has_errors() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
