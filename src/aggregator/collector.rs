//! Issue collector: ownership, deduplication and ordering.

use crate::config::Registry;
use crate::routes::{RouteKey, parse_route_spec};
use crate::rules::{Issue, IssueKind};
use std::collections::HashSet;

/// Collects issues from every rule into one deterministic list.
#[derive(Debug, Default)]
pub struct IssueCollector {
    issues: Vec<Issue>,
    seen: HashSet<(String, usize, IssueKind)>,
}

impl IssueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an issue unless one with the same (file, line, kind) exists.
    /// Returns whether the issue was kept.
    pub fn add(&mut self, issue: Issue) -> bool {
        let (file, line, kind) = issue.identity();
        if !self.seen.insert((file.to_string(), line, kind)) {
            return false;
        }
        self.issues.push(issue);
        true
    }

    pub fn add_all(&mut self, issues: impl IntoIterator<Item = Issue>) {
        for issue in issues {
            self.add(issue);
        }
    }

    pub fn total(&self) -> usize {
        self.issues.len()
    }

    /// Fill missing modules and return issues ordered by module, file, line, kind.
    pub fn finish(self, registry: &Registry) -> Vec<Issue> {
        let mut issues = self.issues;
        for issue in &mut issues {
            if issue.module.is_empty() {
                let key = issue.route.as_deref().and_then(route_key);
                issue.module = registry.owning_module(key.as_ref(), &issue.file);
            }
        }
        issues.sort_by(|a, b| {
            (&a.module, &a.file, a.line, a.kind).cmp(&(&b.module, &b.file, b.line, b.kind))
        });
        issues
    }
}

fn route_key(route: &str) -> Option<RouteKey> {
    let (verb, path) = parse_route_spec(route);
    verb.map(|verb| RouteKey::new(verb, path))
}
