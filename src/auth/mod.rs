//! Two-layer authorization model.
//!
//! Layer 1 is the role gate of admin-scoped routes. Layer 2 is the
//! membership/permission (or self-ownership) lifecycle of data routes that
//! carry a resource identifier.

pub mod delegation;
pub mod lifecycle;

pub use delegation::{ComponentDelegationDetector, DelegationOutcome, page_route_template};
pub use lifecycle::AuthLifecycleValidator;

use crate::routes::Scope;
use crate::rules::IssueKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AuthLayer {
    #[serde(rename = "L1")]
    Layer1,
    #[serde(rename = "L2")]
    Layer2,
}

impl AuthLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthLayer::Layer1 => "L1",
            AuthLayer::Layer2 => "L2",
        }
    }
}

impl std::fmt::Display for AuthLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of a server-side authorization primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PrimitiveKind {
    RoleGate { scope: Scope },
    Membership,
    Permission,
    SelfOwnership,
    AdminOverride,
}

impl PrimitiveKind {
    pub fn layer(&self) -> AuthLayer {
        match self {
            PrimitiveKind::RoleGate { .. } => AuthLayer::Layer1,
            _ => AuthLayer::Layer2,
        }
    }

    pub fn label(&self) -> String {
        match self {
            PrimitiveKind::RoleGate { scope } => format!("{scope} role gate"),
            PrimitiveKind::Membership => "membership check".to_string(),
            PrimitiveKind::Permission => "permission check".to_string(),
            PrimitiveKind::SelfOwnership => "self-ownership check".to_string(),
            PrimitiveKind::AdminOverride => "admin override".to_string(),
        }
    }
}

/// One authorization requirement evaluated against one handler branch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AuthFinding {
    pub layer: AuthLayer,
    /// The primitive kind this finding is about.
    pub primitive: PrimitiveKind,
    pub present: bool,
    /// Order requirement met (only meaningful for membership).
    pub ordered: bool,
    /// False for queue-triggered and forwarding branches.
    pub applicable: bool,
    pub file: String,
    pub line: usize,
}

impl AuthFinding {
    /// Issue kind this finding raises, if any.
    pub fn violation(&self) -> Option<IssueKind> {
        if !self.applicable {
            return None;
        }
        match self.primitive {
            PrimitiveKind::AdminOverride => self.present.then_some(IssueKind::AdminOverride),
            _ if !self.present => Some(match self.primitive {
                PrimitiveKind::RoleGate { .. } => IssueKind::MissingAdminCheck,
                PrimitiveKind::Membership => IssueKind::MissingMembershipCheck,
                PrimitiveKind::Permission => IssueKind::MissingPermissionCheck,
                _ => IssueKind::MissingSelfOwnershipCheck,
            }),
            PrimitiveKind::Membership if !self.ordered => {
                Some(IssueKind::PermissionBeforeMembership)
            }
            _ => None,
        }
    }
}
