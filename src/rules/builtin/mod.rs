mod auth;
mod client;
mod tiers;

use crate::rules::engine::Rule;

pub use auth::{AuthLifecycleRule, ComponentDelegationRule, PublicAdminRouteRule};
pub use client::{DirectNetworkCallRule, UnparseableCallRule};
pub use tiers::{OrphanedRouteRule, RouteNotFoundRule, ScopeMismatchRule, TierConsistencyRule};

/// Built-in rules in registration order.
pub fn all_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(AuthLifecycleRule),
        Box::new(ComponentDelegationRule),
        Box::new(RouteNotFoundRule),
        Box::new(OrphanedRouteRule),
        Box::new(TierConsistencyRule),
        Box::new(DirectNetworkCallRule),
        Box::new(UnparseableCallRule),
        Box::new(PublicAdminRouteRule),
        Box::new(ScopeMismatchRule),
    ]
}
