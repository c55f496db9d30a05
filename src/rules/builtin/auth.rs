//! Authorization rules: server lifecycle, admin pages, public admin routes.

use crate::auth::{AuthFinding, ComponentDelegationDetector};
use crate::routes::Scope;
use crate::rules::engine::{Rule, RuleContext};
use crate::rules::types::{Issue, IssueKind};

pub struct AuthLifecycleRule;

impl Rule for AuthLifecycleRule {
    fn id(&self) -> &'static str {
        "auth-lifecycle"
    }

    fn check_graph(&self, ctx: &RuleContext<'_>) -> Vec<Issue> {
        let mut issues = Vec::new();
        for record in ctx.graph.records() {
            for finding in &record.auth_findings {
                let Some(kind) = finding.violation() else {
                    continue;
                };
                let message = describe(kind, finding, &record.key.to_string(), record.scope);
                issues.push(
                    Issue::new(kind, &finding.file, finding.line, message).with_route(&record.key),
                );
            }
        }
        issues
    }
}

fn describe(
    kind: IssueKind,
    finding: &AuthFinding,
    route: &str,
    scope: Scope,
) -> String {
    match kind {
        IssueKind::MissingAdminCheck => {
            format!("{route} is {scope}-scoped but its handler branch has no {scope} role gate")
        }
        IssueKind::PermissionBeforeMembership => {
            format!("{route} checks the resource permission before tenant membership")
        }
        IssueKind::AdminOverride => format!(
            "{route} short-circuits on an admin role; this never satisfies the resource checks"
        ),
        _ => format!("{route} handler branch lacks a {}", finding.primitive.label()),
    }
}

pub struct ComponentDelegationRule;

impl Rule for ComponentDelegationRule {
    fn id(&self) -> &'static str {
        "component-delegation"
    }

    fn check_graph(&self, ctx: &RuleContext<'_>) -> Vec<Issue> {
        let detector =
            ComponentDelegationDetector::new(ctx.config, ctx.graph, ctx.validator, ctx.files);
        ctx.files
            .iter()
            .filter(|f| f.page.is_some())
            .flat_map(|f| detector.check_page(f))
            .collect()
    }
}

pub struct PublicAdminRouteRule;

impl Rule for PublicAdminRouteRule {
    fn id(&self) -> &'static str {
        "public-admin-route"
    }

    fn check_graph(&self, ctx: &RuleContext<'_>) -> Vec<Issue> {
        ctx.graph
            .records()
            .filter(|record| record.scope.is_admin())
            .flat_map(|record| {
                record
                    .infra_decls
                    .iter()
                    .filter(|decl| decl.is_public)
                    .map(move |decl| {
                        Issue::new(
                            IssueKind::PublicAdminRoute,
                            &decl.file,
                            decl.line,
                            format!(
                                "{} is {}-scoped but declared public",
                                record.key, record.scope
                            ),
                        )
                        .with_route(&record.key)
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PrimitiveKind;
    use crate::config::Config;
    use crate::extract::PageFacts;
    use crate::routes::HttpVerb;
    use crate::rules::builtin::fixtures::{client, handler, infra, run_rule};
    use crate::rules::types::Severity;

    #[test]
    fn test_missing_admin_check_reported_once() {
        let config = Config::default();
        let files = vec![handler(
            "handlers/admin.ts",
            &[(HttpVerb::Get, "/admin/sys/widgets/{id}", vec![])],
        )];
        let issues = run_rule(&AuthLifecycleRule, &config, &files);
        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.kind, IssueKind::MissingAdminCheck);
        assert_eq!(issue.severity, Severity::Error);
        assert_eq!(issue.file, "handlers/admin.ts");
        assert_eq!(issue.line, 10);
        assert!(issue.message.contains("system-admin"));
        assert_eq!(issue.route.as_deref(), Some("GET /admin/sys/widgets/{}"));
    }

    #[test]
    fn test_gated_admin_route_passes() {
        let config = Config::default();
        let gate = PrimitiveKind::RoleGate {
            scope: Scope::SystemAdmin,
        };
        let files = vec![handler(
            "handlers/admin.ts",
            &[(HttpVerb::Get, "/admin/sys/widgets/{id}", vec![gate])],
        )];
        assert!(run_rule(&AuthLifecycleRule, &config, &files).is_empty());
    }

    #[test]
    fn test_public_admin_route() {
        let config = Config::default();
        let files = vec![infra(
            "infra/serverless.yml",
            &[
                (HttpVerb::Get, "/admin/org/widgets", true),
                (HttpVerb::Get, "/health", true),
                (HttpVerb::Get, "/admin/org/users", false),
            ],
        )];
        let issues = run_rule(&PublicAdminRouteRule, &config, &files);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::PublicAdminRoute);
        assert_eq!(issues[0].line, 5);
    }

    #[test]
    fn test_component_delegation_rule_flags_bare_admin_page() {
        let config = Config::default();
        let mut page = client("client/src/pages/admin/sys/index.tsx", &[]);
        page.page = Some(PageFacts {
            route: "/admin/sys".to_string(),
            imports: Vec::new(),
            rendered: vec!["Table".to_string(), "Header".to_string()],
            has_data_fetch: false,
            has_role_check: false,
        });
        let issues = run_rule(&ComponentDelegationRule, &config, &[page]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::PageMissingRoleCheck);
    }
}
