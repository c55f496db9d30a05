//! Configuration type definitions.

use crate::auth::PrimitiveKind;
use crate::routes::{RouteKey, Scope, normalize, parse_route_spec, path_has_prefix};
use crate::scoring::CertificationPolicy;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;

use super::error::ConfigError;

/// Name of the implicit module used when the registry declares none.
pub const DEFAULT_MODULE: &str = "app";
/// Module assigned to issues no registry entry claims.
pub const UNASSIGNED_MODULE: &str = "unassigned";

/// Main configuration structure for route-audit.
///
/// Passed by reference through the whole pipeline; nothing reads global state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where each tier lives, relative to the project root or a module path.
    pub layout: LayoutConfig,
    /// Module / scope registry.
    pub registry: Registry,
    /// Client call-site extraction settings.
    pub client: ClientConfig,
    /// Handler dispatch extraction settings.
    pub handler: HandlerConfig,
    /// Authorization primitive names.
    pub primitives: PrimitivesConfig,
    /// Extra excluded directory names or root-relative paths.
    pub exclude: Vec<String>,
    /// Follow symbolic links while walking (cycles are still detected).
    pub follow_symlinks: bool,
    /// Scan `*.test.*`, `*.spec.*`, `__tests__/` and `__mocks__/` sources too.
    pub include_tests: bool,
    /// Certification tier thresholds.
    pub certification: CertificationPolicy,
}

impl Config {
    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for module in &self.registry.modules {
            if module.name.trim().is_empty() {
                return Err(ConfigError::EmptyModuleName);
            }
            if !names.insert(module.name.as_str()) {
                return Err(ConfigError::DuplicateModule(module.name.clone()));
            }
            if module.name == UNASSIGNED_MODULE {
                return Err(ConfigError::ReservedModule(module.name.clone()));
            }
        }

        for rule in &self.registry.scopes {
            if !rule.prefix.starts_with('/') {
                return Err(ConfigError::ScopePrefix(rule.prefix.clone()));
            }
        }

        for entry in &self.registry.internal {
            let (_, path) = parse_route_spec(entry);
            if !path.starts_with('/') {
                return Err(ConfigError::InternalRoute(entry.clone()));
            }
        }

        let wrapper = self.client.wrapper.trim();
        if wrapper.is_empty()
            || !wrapper
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            return Err(ConfigError::Wrapper(self.client.wrapper.clone()));
        }

        if self.layout.handler_dir.trim().is_empty() {
            return Err(ConfigError::EmptyLayoutDir("handler_dir"));
        }
        if self.layout.infra_dir.trim().is_empty() {
            return Err(ConfigError::EmptyLayoutDir("infra_dir"));
        }

        Ok(())
    }
}

/// Module-relative layout conventions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Client application trees, relative to the project root.
    pub client_roots: Vec<String>,
    /// Page trees (file path maps to page route), relative to the project root.
    pub page_roots: Vec<String>,
    /// Handler tree name inside each module path.
    pub handler_dir: String,
    /// Infra declaration tree name inside each module path.
    pub infra_dir: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            client_roots: vec!["client/src".to_string()],
            page_roots: vec!["client/src/pages".to_string()],
            handler_dir: "handlers".to_string(),
            infra_dir: "infra".to_string(),
        }
    }
}

/// One registered module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub name: String,
    /// Module directory relative to the project root.
    #[serde(default = "default_module_path")]
    pub path: String,
    /// Route prefixes owned by this module.
    #[serde(default)]
    pub prefixes: Vec<String>,
}

fn default_module_path() -> String {
    ".".to_string()
}

impl ModuleEntry {
    fn implicit() -> Self {
        Self {
            name: DEFAULT_MODULE.to_string(),
            path: ".".to_string(),
            prefixes: Vec::new(),
        }
    }

    /// Module path with `./` and trailing slashes removed; empty for the root.
    pub fn relative_path(&self) -> &str {
        let p = self.path.trim().trim_start_matches("./").trim_end_matches('/');
        if p == "." { "" } else { p }
    }
}

/// Prefix → scope assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRule {
    pub prefix: String,
    pub scope: Scope,
}

/// Route-prefix → module/scope registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Registry {
    pub modules: Vec<ModuleEntry>,
    pub scopes: Vec<ScopeRule>,
    /// Routes never called by the client on purpose: `"GET /health"` (exact)
    /// or `"/internal"` (prefix, any verb).
    pub internal: Vec<String>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            modules: Vec::new(),
            scopes: vec![
                ScopeRule {
                    prefix: "/admin/sys".to_string(),
                    scope: Scope::SystemAdmin,
                },
                ScopeRule {
                    prefix: "/admin/org".to_string(),
                    scope: Scope::OrgAdmin,
                },
                ScopeRule {
                    prefix: "/admin/ws".to_string(),
                    scope: Scope::WorkspaceAdmin,
                },
            ],
            internal: Vec::new(),
        }
    }
}

impl Registry {
    /// Registered modules, or the implicit root module when none are declared.
    pub fn effective_modules(&self) -> Cow<'_, [ModuleEntry]> {
        if self.modules.is_empty() {
            Cow::Owned(vec![ModuleEntry::implicit()])
        } else {
            Cow::Borrowed(&self.modules)
        }
    }

    pub fn module_names(&self) -> Vec<String> {
        self.effective_modules()
            .iter()
            .map(|m| m.name.clone())
            .collect()
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.effective_modules().iter().any(|m| m.name == name)
    }

    /// Scope of a canonical path: longest matching registry prefix, else data.
    pub fn scope_for(&self, canonical_path: &str) -> Scope {
        self.scopes
            .iter()
            .filter(|rule| path_has_prefix(canonical_path, &normalize(&rule.prefix)))
            .max_by_key(|rule| normalize(&rule.prefix).len())
            .map(|rule| rule.scope)
            .unwrap_or(Scope::Data)
    }

    /// Module owning a canonical route path (longest prefix).
    pub fn module_for_route(&self, canonical_path: &str) -> Option<String> {
        self.effective_modules()
            .iter()
            .flat_map(|m| m.prefixes.iter().map(move |p| (m, normalize(p))))
            .filter(|(_, prefix)| path_has_prefix(canonical_path, prefix))
            .max_by_key(|(_, prefix)| prefix.len())
            .map(|(m, _)| m.name.clone())
    }

    /// Module owning a root-relative file path (deepest module directory).
    pub fn module_for_file(&self, relative_file: &str) -> Option<String> {
        self.effective_modules()
            .iter()
            .filter(|m| {
                let dir = m.relative_path();
                dir.is_empty()
                    || relative_file == dir
                    || relative_file
                        .strip_prefix(dir)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|m| m.relative_path().len())
            .map(|m| m.name.clone())
    }

    /// Route ownership first, then file location.
    pub fn owning_module(&self, route: Option<&RouteKey>, relative_file: &str) -> String {
        route
            .and_then(|key| self.module_for_route(&key.path))
            .or_else(|| self.module_for_file(relative_file))
            .unwrap_or_else(|| UNASSIGNED_MODULE.to_string())
    }

    /// Registry-tagged internal route (never expected in the client tier).
    pub fn is_internal(&self, key: &RouteKey) -> bool {
        self.internal.iter().any(|entry| {
            let (verb, path) = parse_route_spec(entry);
            let path = normalize(path);
            match verb {
                Some(verb) => verb == key.verb && path == key.path,
                None => path_has_prefix(&key.path, &path),
            }
        })
    }
}

/// Client call-site extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Identifier of the sanctioned request wrapper.
    pub wrapper: String,
    /// Regexes for legitimate out-of-band calls (matched against the call text).
    pub direct_call_whitelist: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            wrapper: "apiRequest".to_string(),
            direct_call_whitelist: vec![
                r"(?i)\b(pre)?signed\w*url\b".to_string(),
                r"(?i)\bupload\w*url\b".to_string(),
            ],
        }
    }
}

/// Handler dispatch extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Callee suffixes identifying a shared sub-router.
    pub sub_router_suffixes: Vec<String>,
    /// Regexes marking a file as queue/event triggered (no end-user principal).
    /// Matched against code with comments blanked; patterns starting with `@`
    /// are annotations and are matched inside comments too.
    pub async_markers: Vec<String>,
    /// Literal segments that introduce an organization/workspace identifier.
    pub tenant_segments: Vec<String>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            sub_router_suffixes: vec!["Router".to_string()],
            async_markers: vec![
                r"\bSQSEvent\b".to_string(),
                r"\bSNSEvent\b".to_string(),
                r"\bEventBridgeEvent\b".to_string(),
                r"\bScheduledEvent\b".to_string(),
                r"\bevent\.Records\b".to_string(),
                r"@queue-handler\b".to_string(),
            ],
            tenant_segments: vec![
                "orgs".to_string(),
                "organizations".to_string(),
                "workspaces".to_string(),
            ],
        }
    }
}

/// Authorization primitive names, per kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimitivesConfig {
    pub system_admin: Vec<String>,
    pub org_admin: Vec<String>,
    pub workspace_admin: Vec<String>,
    pub membership: Vec<String>,
    pub permission: Vec<String>,
    pub self_ownership: Vec<String>,
    pub admin_override: Vec<String>,
    /// Client-side role gates (hooks or guard components) on admin pages.
    pub client_role_checks: Vec<String>,
    /// Client-side data-fetching hooks; their presence rules out delegation.
    pub data_fetch: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for PrimitivesConfig {
    fn default() -> Self {
        Self {
            system_admin: strings(&["requireSystemAdmin"]),
            org_admin: strings(&["requireOrgAdmin"]),
            workspace_admin: strings(&["requireWorkspaceAdmin"]),
            membership: strings(&[
                "requireOrgMembership",
                "requireWorkspaceMembership",
                "checkMembership",
            ]),
            permission: strings(&["requirePermission", "checkPermission", "assertCanAccess"]),
            self_ownership: strings(&["requireSelf", "assertSelfOwnership", "requireOwnership"]),
            admin_override: strings(&["isSystemAdmin", "isPlatformAdmin", "bypassIfAdmin"]),
            client_role_checks: strings(&[
                "useRequireRole",
                "requireRole",
                "RequireRole",
                "AdminGuard",
                "RoleGate",
            ]),
            data_fetch: strings(&[
                "useQuery",
                "useSWR",
                "useEffect",
                "useMutation",
                "useInfiniteQuery",
            ]),
        }
    }
}

impl PrimitivesConfig {
    /// Classify a server-side callee name.
    pub fn classify(&self, name: &str) -> Option<PrimitiveKind> {
        let has = |list: &[String]| list.iter().any(|n| n == name);
        if has(&self.system_admin) {
            Some(PrimitiveKind::RoleGate {
                scope: Scope::SystemAdmin,
            })
        } else if has(&self.org_admin) {
            Some(PrimitiveKind::RoleGate {
                scope: Scope::OrgAdmin,
            })
        } else if has(&self.workspace_admin) {
            Some(PrimitiveKind::RoleGate {
                scope: Scope::WorkspaceAdmin,
            })
        } else if has(&self.membership) {
            Some(PrimitiveKind::Membership)
        } else if has(&self.permission) {
            Some(PrimitiveKind::Permission)
        } else if has(&self.self_ownership) {
            Some(PrimitiveKind::SelfOwnership)
        } else if has(&self.admin_override) {
            Some(PrimitiveKind::AdminOverride)
        } else {
            None
        }
    }

    pub fn is_client_role_check(&self, name: &str) -> bool {
        self.client_role_checks.iter().any(|n| n == name)
    }

    pub fn is_data_fetch(&self, name: &str) -> bool {
        self.data_fetch.iter().any(|n| n == name)
    }
}
