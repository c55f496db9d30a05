use crate::auth::AuthLayer;
use crate::routes::RouteKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    MissingAdminCheck,
    MissingMembershipCheck,
    MissingPermissionCheck,
    PermissionBeforeMembership,
    MissingSelfOwnershipCheck,
    AdminOverride,
    PageMissingRoleCheck,
    DelegationWithoutMetadata,
    DelegatedComponentAuthFailure,
    RouteNotFound,
    OrphanedRoute,
    InfraRouteWithoutHandler,
    HandlerRouteNotDeployed,
    DirectNetworkCall,
    UnparseableCall,
    PublicAdminRoute,
    ScopeMismatch,
}

impl IssueKind {
    pub const ALL: [IssueKind; 17] = [
        IssueKind::MissingAdminCheck,
        IssueKind::MissingMembershipCheck,
        IssueKind::MissingPermissionCheck,
        IssueKind::PermissionBeforeMembership,
        IssueKind::MissingSelfOwnershipCheck,
        IssueKind::AdminOverride,
        IssueKind::PageMissingRoleCheck,
        IssueKind::DelegationWithoutMetadata,
        IssueKind::DelegatedComponentAuthFailure,
        IssueKind::RouteNotFound,
        IssueKind::OrphanedRoute,
        IssueKind::InfraRouteWithoutHandler,
        IssueKind::HandlerRouteNotDeployed,
        IssueKind::DirectNetworkCall,
        IssueKind::UnparseableCall,
        IssueKind::PublicAdminRoute,
        IssueKind::ScopeMismatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::MissingAdminCheck => "missing-admin-check",
            IssueKind::MissingMembershipCheck => "missing-membership-check",
            IssueKind::MissingPermissionCheck => "missing-permission-check",
            IssueKind::PermissionBeforeMembership => "permission-before-membership",
            IssueKind::MissingSelfOwnershipCheck => "missing-self-ownership-check",
            IssueKind::AdminOverride => "admin-override",
            IssueKind::PageMissingRoleCheck => "page-missing-role-check",
            IssueKind::DelegationWithoutMetadata => "delegation-without-metadata",
            IssueKind::DelegatedComponentAuthFailure => "delegated-component-auth-failure",
            IssueKind::RouteNotFound => "route-not-found",
            IssueKind::OrphanedRoute => "orphaned-route",
            IssueKind::InfraRouteWithoutHandler => "infra-route-without-handler",
            IssueKind::HandlerRouteNotDeployed => "handler-route-not-deployed",
            IssueKind::DirectNetworkCall => "direct-network-call",
            IssueKind::UnparseableCall => "unparseable-call",
            IssueKind::PublicAdminRoute => "public-admin-route",
            IssueKind::ScopeMismatch => "scope-mismatch",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::AdminOverride
            | IssueKind::DelegationWithoutMetadata
            | IssueKind::OrphanedRoute
            | IssueKind::HandlerRouteNotDeployed
            | IssueKind::UnparseableCall
            | IssueKind::ScopeMismatch => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Authorization layer of the kind; `None` for tier and hygiene checks.
    pub fn layer(&self) -> Option<AuthLayer> {
        match self {
            IssueKind::MissingAdminCheck
            | IssueKind::PageMissingRoleCheck
            | IssueKind::DelegationWithoutMetadata
            | IssueKind::DelegatedComponentAuthFailure
            | IssueKind::PublicAdminRoute => Some(AuthLayer::Layer1),
            IssueKind::MissingMembershipCheck
            | IssueKind::MissingPermissionCheck
            | IssueKind::PermissionBeforeMembership
            | IssueKind::MissingSelfOwnershipCheck
            | IssueKind::AdminOverride => Some(AuthLayer::Layer2),
            _ => None,
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One reportable problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    /// Root-relative path with `/` separators.
    pub file: String,
    pub line: usize,
    pub message: String,
    /// Owning module; filled by the collector when left empty.
    pub module: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    pub fingerprint: String,
}

impl Issue {
    pub fn new(kind: IssueKind, file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        let mut issue = Self {
            kind,
            severity: kind.severity(),
            file: file.into(),
            line,
            message: message.into(),
            module: String::new(),
            route: None,
            fingerprint: String::new(),
        };
        issue.fingerprint = issue.compute_fingerprint();
        issue
    }

    pub fn with_route(mut self, route: &RouteKey) -> Self {
        self.route = Some(route.to_string());
        self.fingerprint = self.compute_fingerprint();
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    /// Stable identity of the issue across runs (kind, location, route).
    fn compute_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(self.file.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.line.to_string().as_bytes());
        hasher.update(b"\0");
        hasher.update(self.route.as_deref().unwrap_or("").as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        hash[..16].to_string()
    }

    /// Deduplication key.
    pub fn identity(&self) -> (&str, usize, IssueKind) {
        (&self.file, self.line, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::HttpVerb;

    #[test]
    fn test_severity_order_and_display() {
        assert!(Severity::Error > Severity::Warning);
        assert_eq!(Severity::Error.to_string(), "ERROR");
        assert_eq!(serde_json::to_string(&Severity::Warning).unwrap(), "\"warning\"");
    }

    #[test]
    fn test_issue_kind_strings_are_unique() {
        let mut names: Vec<&str> = IssueKind::ALL.iter().map(|k| k.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), IssueKind::ALL.len());
    }

    #[test]
    fn test_issue_kind_serde_matches_as_str() {
        for kind in IssueKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_kind_layers() {
        assert_eq!(IssueKind::MissingAdminCheck.layer(), Some(AuthLayer::Layer1));
        assert_eq!(IssueKind::AdminOverride.layer(), Some(AuthLayer::Layer2));
        assert_eq!(IssueKind::RouteNotFound.layer(), None);
        assert_eq!(IssueKind::AdminOverride.severity(), Severity::Warning);
        assert_eq!(IssueKind::InfraRouteWithoutHandler.severity(), Severity::Error);
    }

    #[test]
    fn test_fingerprint_stable_and_route_sensitive() {
        let a = Issue::new(IssueKind::OrphanedRoute, "h.ts", 3, "x");
        let b = Issue::new(IssueKind::OrphanedRoute, "h.ts", 3, "different message");
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.fingerprint.len(), 16);

        let c = a.clone().with_route(&RouteKey::new(HttpVerb::Get, "/x"));
        assert_ne!(a.fingerprint, c.fingerprint);
        assert_eq!(c.route.as_deref(), Some("GET /x"));
    }
}
