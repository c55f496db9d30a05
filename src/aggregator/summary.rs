//! Per-module rollups.

use crate::rules::{Issue, IssueKind, Severity};
use crate::scoring::{CertificationPolicy, CertificationTier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error and warning counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub errors: usize,
    pub warnings: usize,
}

impl Totals {
    pub fn of<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> Self {
        let mut totals = Self::default();
        for issue in issues {
            totals.add(issue.severity);
        }
        totals
    }

    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.errors + self.warnings
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSummary {
    pub module: String,
    pub errors: usize,
    pub warnings: usize,
    pub by_kind: BTreeMap<IssueKind, usize>,
    pub tier: CertificationTier,
}

/// Builds module summaries from a finished issue list.
#[derive(Debug, Default)]
pub struct SummaryBuilder {
    modules: Vec<String>,
    policy: CertificationPolicy,
}

impl SummaryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Modules that always get a row, even without issues.
    pub fn with_modules(mut self, modules: Vec<String>) -> Self {
        self.modules = modules;
        self
    }

    pub fn with_policy(mut self, policy: CertificationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self, issues: &[Issue]) -> Vec<ModuleSummary> {
        let mut grouped: BTreeMap<&str, Vec<&Issue>> = self
            .modules
            .iter()
            .map(|m| (m.as_str(), Vec::new()))
            .collect();
        for issue in issues {
            grouped.entry(issue.module.as_str()).or_default().push(issue);
        }

        grouped
            .into_iter()
            .map(|(module, issues)| {
                let totals = Totals::of(issues.iter().copied());
                let mut by_kind = BTreeMap::new();
                for issue in &issues {
                    *by_kind.entry(issue.kind).or_default() += 1;
                }
                ModuleSummary {
                    module: module.to_string(),
                    errors: totals.errors,
                    warnings: totals.warnings,
                    by_kind,
                    tier: self.policy.score(&totals),
                }
            })
            .collect()
    }
}
