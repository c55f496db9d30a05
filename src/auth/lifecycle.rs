//! Layer-1 / Layer-2 evaluation of handler branches.

use super::{AuthFinding, PrimitiveKind};
use crate::config::HandlerConfig;
use crate::extract::ExtractedHandlerRoute;
use crate::routes::graph::RouteRecord;
use crate::routes::normalize::{is_param_segment, segments};
use crate::routes::{RouteKey, Scope};
use crate::rules::Severity;

/// Evaluates the authorization lifecycle of route records.
#[derive(Debug, Clone)]
pub struct AuthLifecycleValidator {
    tenant_segments: Vec<String>,
}

impl AuthLifecycleValidator {
    pub fn new(config: &HandlerConfig) -> Self {
        Self {
            tenant_segments: config.tenant_segments.clone(),
        }
    }

    /// A tenant segment (`orgs`, `workspaces`, ..) directly followed by a
    /// parameter anywhere in the path.
    pub fn is_tenant_scoped(&self, canonical_path: &str) -> bool {
        let segs: Vec<&str> = segments(canonical_path).collect();
        segs.windows(2).any(|pair| {
            self.tenant_segments.iter().any(|t| t == pair[0]) && is_param_segment(pair[1])
        })
    }

    /// Findings for every handler branch of a record. Routes without a
    /// handler branch yield nothing.
    pub fn evaluate(&self, record: &RouteRecord) -> Vec<AuthFinding> {
        let mut findings: Vec<AuthFinding> = record
            .handler_branches
            .iter()
            .flat_map(|branch| self.evaluate_branch(&record.key, record.scope, branch))
            .collect();
        findings.sort();
        findings.dedup();
        findings
    }

    /// True when no finding of the record raises an error.
    pub fn passes(&self, record: &RouteRecord) -> bool {
        !record.handler_branches.is_empty()
            && self
                .evaluate(record)
                .iter()
                .filter_map(AuthFinding::violation)
                .all(|kind| kind.severity() != Severity::Error)
    }

    pub fn evaluate_branch(
        &self,
        key: &RouteKey,
        scope: Scope,
        branch: &ExtractedHandlerRoute,
    ) -> Vec<AuthFinding> {
        let applicable = !branch.exempt && branch.forwarded_to.is_none();
        let kinds: Vec<PrimitiveKind> = branch.primitives.iter().map(|p| p.kind).collect();
        let position = |wanted: PrimitiveKind| kinds.iter().position(|k| *k == wanted);
        let finding = |primitive: PrimitiveKind, present: bool, ordered: bool| AuthFinding {
            layer: primitive.layer(),
            primitive,
            present,
            ordered,
            applicable,
            file: branch.file.clone(),
            line: branch.branch_line,
        };

        let mut findings = Vec::new();

        if scope.is_admin() {
            let gate = PrimitiveKind::RoleGate { scope };
            findings.push(finding(gate, position(gate).is_some(), true));
            return findings;
        }

        if key.has_resource_id() {
            if self.is_tenant_scoped(&key.path) {
                let membership = position(PrimitiveKind::Membership);
                let permission = position(PrimitiveKind::Permission);
                let ordered = match (membership, permission) {
                    (Some(m), Some(p)) => m < p,
                    _ => true,
                };
                findings.push(finding(
                    PrimitiveKind::Membership,
                    membership.is_some(),
                    ordered,
                ));
                findings.push(finding(
                    PrimitiveKind::Permission,
                    permission.is_some(),
                    true,
                ));
            } else {
                findings.push(finding(
                    PrimitiveKind::SelfOwnership,
                    position(PrimitiveKind::SelfOwnership).is_some(),
                    true,
                ));
            }
        }

        if position(PrimitiveKind::AdminOverride).is_some() {
            findings.push(finding(PrimitiveKind::AdminOverride, true, true));
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::PrimitiveCall;
    use crate::routes::HttpVerb;
    use crate::rules::IssueKind;

    fn validator() -> AuthLifecycleValidator {
        AuthLifecycleValidator::new(&HandlerConfig::default())
    }

    fn branch(path: &str, primitives: &[PrimitiveKind]) -> ExtractedHandlerRoute {
        ExtractedHandlerRoute {
            verb: HttpVerb::Get,
            path: path.to_string(),
            file: "handlers/api.ts".to_string(),
            branch_line: 7,
            handler_fn: None,
            primitives: primitives
                .iter()
                .enumerate()
                .map(|(i, kind)| PrimitiveCall {
                    name: format!("p{i}"),
                    kind: *kind,
                    line: 10 + i,
                })
                .collect(),
            forwarded_to: None,
            exempt: false,
        }
    }

    fn violations(path: &str, scope: Scope, primitives: &[PrimitiveKind]) -> Vec<IssueKind> {
        let key = RouteKey::new(HttpVerb::Get, path);
        validator()
            .evaluate_branch(&key, scope, &branch(path, primitives))
            .iter()
            .filter_map(AuthFinding::violation)
            .collect()
    }

    const SYS: PrimitiveKind = PrimitiveKind::RoleGate {
        scope: Scope::SystemAdmin,
    };
    const ORG: PrimitiveKind = PrimitiveKind::RoleGate {
        scope: Scope::OrgAdmin,
    };

    #[test]
    fn test_admin_route_requires_matching_gate() {
        assert_eq!(
            violations("/admin/sys/widgets/{id}", Scope::SystemAdmin, &[]),
            vec![IssueKind::MissingAdminCheck]
        );
        assert!(violations("/admin/sys/widgets/{id}", Scope::SystemAdmin, &[SYS]).is_empty());
        // A gate for another scope does not count.
        assert_eq!(
            violations("/admin/sys/widgets", Scope::SystemAdmin, &[ORG]),
            vec![IssueKind::MissingAdminCheck]
        );
    }

    #[test]
    fn test_tenant_route_membership_then_permission() {
        let path = "/orgs/{orgId}/docs/{docId}";
        assert!(
            violations(
                path,
                Scope::Data,
                &[PrimitiveKind::Membership, PrimitiveKind::Permission]
            )
            .is_empty()
        );
        assert_eq!(
            violations(
                path,
                Scope::Data,
                &[PrimitiveKind::Permission, PrimitiveKind::Membership]
            ),
            vec![IssueKind::PermissionBeforeMembership]
        );
        assert_eq!(
            violations(path, Scope::Data, &[]),
            vec![
                IssueKind::MissingMembershipCheck,
                IssueKind::MissingPermissionCheck
            ]
        );
    }

    #[test]
    fn test_self_service_route_needs_self_ownership_only() {
        let path = "/me/sessions/{id}";
        let found = violations(path, Scope::Data, &[]);
        assert_eq!(found, vec![IssueKind::MissingSelfOwnershipCheck]);
        assert!(!found.contains(&IssueKind::MissingMembershipCheck));
        assert!(violations(path, Scope::Data, &[PrimitiveKind::SelfOwnership]).is_empty());
    }

    #[test]
    fn test_admin_override_never_satisfies_layer2() {
        let found = violations(
            "/orgs/{orgId}/docs/{docId}",
            Scope::Data,
            &[PrimitiveKind::AdminOverride],
        );
        assert!(found.contains(&IssueKind::AdminOverride));
        assert!(found.contains(&IssueKind::MissingPermissionCheck));

        // Even a fully checked route keeps the override visible.
        let found = violations(
            "/orgs/{orgId}/docs/{docId}",
            Scope::Data,
            &[
                PrimitiveKind::AdminOverride,
                PrimitiveKind::Membership,
                PrimitiveKind::Permission,
            ],
        );
        assert_eq!(found, vec![IssueKind::AdminOverride]);
    }

    #[test]
    fn test_collection_route_has_no_layer2_requirement() {
        assert!(violations("/orgs", Scope::Data, &[]).is_empty());
    }

    #[test]
    fn test_exempt_and_forwarding_not_applicable() {
        let key = RouteKey::new(HttpVerb::Post, "/orgs/{id}/jobs/{jobId}");
        let mut exempt = branch("/orgs/{id}/jobs/{jobId}", &[]);
        exempt.exempt = true;
        let findings = validator().evaluate_branch(&key, Scope::Data, &exempt);
        assert!(!findings.is_empty());
        assert!(findings.iter().all(|f| !f.applicable && f.violation().is_none()));

        let mut forward = branch("/admin/org/{+}", &[]);
        forward.forwarded_to = Some("adminRouter".to_string());
        let key = RouteKey::new(HttpVerb::Any, "/admin/org/{+}");
        let findings = validator().evaluate_branch(&key, Scope::OrgAdmin, &forward);
        assert!(findings.iter().all(|f| f.violation().is_none()));
    }

    #[test]
    fn test_tenant_detection() {
        let v = validator();
        assert!(v.is_tenant_scoped("/orgs/{}/docs/{}"));
        assert!(v.is_tenant_scoped("/api/workspaces/{}"));
        assert!(!v.is_tenant_scoped("/orgs"));
        assert!(!v.is_tenant_scoped("/users/{}/orgs"));
    }
}
