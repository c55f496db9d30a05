//! Cross-tier consistency rules.

use crate::routes::RouteRecord;
use crate::rules::engine::{Rule, RuleContext};
use crate::rules::types::{Issue, IssueKind};

pub struct RouteNotFoundRule;

impl Rule for RouteNotFoundRule {
    fn id(&self) -> &'static str {
        "route-not-found"
    }

    fn check_graph(&self, ctx: &RuleContext<'_>) -> Vec<Issue> {
        let mut issues = Vec::new();
        for record in ctx.graph.records() {
            if !record.presence.client || record.handled_by.is_some() {
                continue;
            }
            for site in &record.call_sites {
                issues.push(
                    Issue::new(
                        IssueKind::RouteNotFound,
                        &site.file,
                        site.line,
                        format!("Client calls {} but no handler serves it", record.key),
                    )
                    .with_route(&record.key),
                );
            }
            for decl in &record.component_decls {
                issues.push(
                    Issue::new(
                        IssueKind::RouteNotFound,
                        &decl.file,
                        decl.line,
                        format!(
                            "<{}> declares {} but no handler serves it",
                            decl.component, record.key
                        ),
                    )
                    .with_route(&record.key),
                );
            }
        }
        issues
    }
}

pub struct OrphanedRouteRule;

impl Rule for OrphanedRouteRule {
    fn id(&self) -> &'static str {
        "orphaned-route"
    }

    fn check_graph(&self, ctx: &RuleContext<'_>) -> Vec<Issue> {
        ctx.graph
            .records()
            .filter(|r| !r.called && !r.internal && !only_async(r))
            .filter_map(|record| {
                let (file, line) = first_server_site(record)?;
                Some(
                    Issue::new(
                        IssueKind::OrphanedRoute,
                        file,
                        line,
                        format!("{} is never called by the client", record.key),
                    )
                    .with_route(&record.key),
                )
            })
            .collect()
    }
}

/// Every handler branch is queue-triggered; no client ever calls it.
fn only_async(record: &RouteRecord) -> bool {
    !record.handler_branches.is_empty() && record.handler_branches.iter().all(|b| b.exempt)
}

fn first_server_site(record: &RouteRecord) -> Option<(&str, usize)> {
    record
        .handler_branches
        .iter()
        .map(|b| (b.file.as_str(), b.branch_line))
        .next()
        .or_else(|| {
            record
                .infra_decls
                .iter()
                .map(|d| (d.file.as_str(), d.line))
                .next()
        })
}

pub struct TierConsistencyRule;

impl Rule for TierConsistencyRule {
    fn id(&self) -> &'static str {
        "tier-consistency"
    }

    fn check_graph(&self, ctx: &RuleContext<'_>) -> Vec<Issue> {
        // Projects without an infra tier have nothing to reconcile against.
        let has_infra = ctx.graph.records().any(|r| r.presence.infra);
        let mut issues = Vec::new();

        for record in ctx.graph.records() {
            if record.presence.infra && record.handled_by.is_none() {
                for decl in &record.infra_decls {
                    issues.push(
                        Issue::new(
                            IssueKind::InfraRouteWithoutHandler,
                            &decl.file,
                            decl.line,
                            format!(
                                "{} is deployed to {} but no handler branch serves it",
                                record.key, decl.target_ref
                            ),
                        )
                        .with_route(&record.key),
                    );
                }
            }

            if has_infra && record.presence.handler && !record.deployed {
                for branch in record.handler_branches.iter().filter(|b| !b.exempt) {
                    issues.push(
                        Issue::new(
                            IssueKind::HandlerRouteNotDeployed,
                            &branch.file,
                            branch.branch_line,
                            format!("{} is handled but not declared in infra", record.key),
                        )
                        .with_route(&record.key),
                    );
                }
            }
        }
        issues
    }
}

pub struct ScopeMismatchRule;

impl Rule for ScopeMismatchRule {
    fn id(&self) -> &'static str {
        "scope-mismatch"
    }

    fn check_graph(&self, ctx: &RuleContext<'_>) -> Vec<Issue> {
        let mut issues = Vec::new();
        for record in ctx.graph.records() {
            for decl in &record.component_decls {
                let Some(declared) = decl.scope else {
                    continue;
                };
                if declared != record.scope {
                    issues.push(
                        Issue::new(
                            IssueKind::ScopeMismatch,
                            &decl.file,
                            decl.line,
                            format!(
                                "<{}> annotates {} as {declared} but the registry scope is {}",
                                decl.component, record.key, record.scope
                            ),
                        )
                        .with_route(&record.key),
                    );
                }
            }
        }
        issues
    }
}
