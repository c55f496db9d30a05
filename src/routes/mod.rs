//! Route identity and the cross-tier route graph.
//!
//! - `normalize`: canonical path-template notation
//! - `graph`: merge of observations into one record per route

pub mod graph;
pub mod normalize;

pub use graph::{RouteGraph, RouteGraphBuilder, RouteRecord, TierPresence};
pub use normalize::normalize;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Any,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Head => "HEAD",
            HttpVerb::Options => "OPTIONS",
            HttpVerb::Any => "ANY",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HttpVerb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpVerb::Get),
            "POST" => Ok(HttpVerb::Post),
            "PUT" => Ok(HttpVerb::Put),
            "PATCH" => Ok(HttpVerb::Patch),
            "DELETE" | "DEL" => Ok(HttpVerb::Delete),
            "HEAD" => Ok(HttpVerb::Head),
            "OPTIONS" => Ok(HttpVerb::Options),
            "ANY" | "*" => Ok(HttpVerb::Any),
            other => Err(format!("unknown HTTP verb: {other}")),
        }
    }
}

/// Authorization scope a route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    SystemAdmin,
    OrgAdmin,
    WorkspaceAdmin,
    Data,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::SystemAdmin => "system-admin",
            Scope::OrgAdmin => "org-admin",
            Scope::WorkspaceAdmin => "workspace-admin",
            Scope::Data => "data",
        }
    }

    pub fn is_admin(&self) -> bool {
        !matches!(self, Scope::Data)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system-admin" | "system" | "sys" => Ok(Scope::SystemAdmin),
            "org-admin" | "org" | "organization" => Ok(Scope::OrgAdmin),
            "workspace-admin" | "workspace" | "ws" => Ok(Scope::WorkspaceAdmin),
            "data" => Ok(Scope::Data),
            other => Err(format!("unknown scope: {other}")),
        }
    }
}

/// Canonical identity of a route: verb plus normalized path.
///
/// Only constructed through [`RouteKey::new`], so the path is always canonical.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    pub verb: HttpVerb,
    pub path: String,
}

impl RouteKey {
    pub fn new(verb: HttpVerb, template: &str) -> Self {
        Self {
            verb,
            path: normalize(template),
        }
    }

    /// True when the path carries at least one parameter segment.
    pub fn has_resource_id(&self) -> bool {
        normalize::segments(&self.path).any(normalize::is_param_segment)
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.path)
    }
}

/// Parse `"GET /path"` (verb optional) into its parts.
pub fn parse_route_spec(spec: &str) -> (Option<HttpVerb>, &str) {
    let spec = spec.trim();
    match spec.split_once(char::is_whitespace) {
        Some((verb, rest)) => match verb.parse::<HttpVerb>() {
            Ok(verb) => (Some(verb), rest.trim()),
            Err(_) => (None, spec),
        },
        None => (None, spec),
    }
}

/// Segment-boundary prefix match on canonical paths.
pub fn path_has_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
