use crate::reporter::Reporter;
use crate::rules::{Issue, Severity};
use crate::run::Report;
use crate::scoring::CertificationTier;
use colored::Colorize;

pub struct TerminalReporter {
    /// Print every issue, not only the module table.
    verbose: bool,
}

impl TerminalReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn severity_label(&self, severity: Severity) -> colored::ColoredString {
        let label = format!("[{}]", severity);
        match severity {
            Severity::Error => label.red().bold(),
            Severity::Warning => label.yellow(),
        }
    }

    fn tier_color(&self, tier: CertificationTier) -> colored::ColoredString {
        let label = tier.as_str();
        match tier {
            CertificationTier::Certified => label.green().bold(),
            CertificationTier::Conditional => label.yellow().bold(),
            CertificationTier::Uncertified => label.red().bold(),
        }
    }

    /// `file:line: [ERROR] kind: message` plus the route when known.
    fn format_issue(&self, issue: &Issue) -> String {
        let mut output = format!(
            "{}:{}: {} {}: {}\n",
            issue.file,
            issue.line,
            self.severity_label(issue.severity),
            issue.kind.as_str().bold(),
            issue.message
        );
        if let Some(route) = &issue.route {
            output.push_str(&format!("  {} {}\n", "=".dimmed(), route.cyan()));
        }
        output
    }

    fn format_modules(&self, report: &Report) -> String {
        let width = report
            .modules
            .iter()
            .map(|m| m.module.len())
            .max()
            .unwrap_or(6)
            .max(6);

        let mut output = format!(
            "{:width$}  {:>6}  {:>8}  {}\n",
            "MODULE".bold(),
            "ERRORS".bold(),
            "WARNINGS".bold(),
            "TIER".bold(),
            width = width
        );
        for summary in &report.modules {
            let errors = if summary.errors > 0 {
                summary.errors.to_string().red().bold()
            } else {
                summary.errors.to_string().green()
            };
            output.push_str(&format!(
                "{:width$}  {:>6}  {:>8}  {}\n",
                summary.module,
                errors,
                summary.warnings.to_string().yellow(),
                self.tier_color(summary.tier),
                width = width
            ));
            for (kind, count) in &summary.by_kind {
                output.push_str(&format!(
                    "{:width$}    {} {}\n",
                    "",
                    count,
                    kind.as_str().dimmed(),
                    width = width
                ));
            }
        }
        output
    }
}

impl Reporter for TerminalReporter {
    fn report(&self, report: &Report) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{}\n\n",
            format!(
                "route-audit v{} - Route & Authorization Compliance",
                report.version
            )
            .bold()
        ));
        output.push_str(&format!(
            "Validating: {} ({} files, {} routes)\n\n",
            report.root,
            report.files_scanned,
            report.routes.len()
        ));

        output.push_str(&self.format_modules(report));
        output.push('\n');

        // A module filter always shows full detail.
        if self.verbose || report.module.is_some() {
            if report.issues.is_empty() {
                output.push_str(&"No issues found.\n".green().to_string());
            }
            for issue in &report.issues {
                output.push_str(&self.format_issue(issue));
            }
            output.push('\n');
        }

        if !report.scan_warnings.is_empty() {
            output.push_str(&format!(
                "{}\n",
                format!("Incomplete scan ({} warning(s)):", report.scan_warnings.len()).yellow()
            ));
            for warning in &report.scan_warnings {
                output.push_str(&format!("  {}\n", warning.message));
            }
            output.push('\n');
        }

        output.push_str(&format!("{}\n", "━".repeat(50)));
        output.push_str(&format!(
            "Summary: {} error(s), {} warning(s)\n",
            report.totals.errors.to_string().red().bold(),
            report.totals.warnings.to_string().yellow()
        ));
        output.push_str(&format!("Certification: {}\n", self.tier_color(report.tier)));

        if report.has_errors() {
            output.push_str(&format!("Result: {}\n", "FAIL".red().bold()));
        } else {
            output.push_str(&format!("Result: {}\n", "PASS".green().bold()));
        }

        output
    }
}
