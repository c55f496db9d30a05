//! Admin page role checks and component delegation.
//!
//! An admin page either gates itself with a client role check or hands the
//! whole screen to one imported component. The component's `@route`
//! annotations then have to pass the server-side lifecycle on their own.

use super::AuthLifecycleValidator;
use crate::config::Config;
use crate::extract::{ExtractedComponentRoute, PageFacts, ScannedFile};
use crate::routes::{RouteGraph, RouteKey, Scope, normalize};
use crate::rules::{Issue, IssueKind, Severity};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

const COMPONENT_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js"];

/// Page route of a file under one of `page_roots`, or `None` when the file is
/// not a page.
///
/// `pages/admin/org/widgets.tsx` maps to `/admin/org/widgets`; a trailing
/// `index` is dropped and route groups such as `(admin)` vanish. Bracket
/// parameters are left for the normalizer.
pub fn page_route_template(relative: &str, page_roots: &[String]) -> Option<String> {
    let rest = page_roots.iter().find_map(|root| {
        let root = root.trim_matches('/');
        relative
            .strip_prefix(root)
            .and_then(|rest| rest.strip_prefix('/'))
    })?;

    let stem = match rest.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => rest,
    };

    let mut segments: Vec<&str> = stem
        .split('/')
        .filter(|s| !s.is_empty() && !(s.starts_with('(') && s.ends_with(')')))
        .collect();
    if segments.last() == Some(&"index") {
        segments.pop();
    }
    Some(format!("/{}", segments.join("/")))
}

/// What the detector concluded for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegationOutcome {
    /// The page route is not admin-scoped.
    NotAdmin,
    /// The page gates itself.
    RoleChecked,
    /// No role check and no recognisable delegation.
    MissingRoleCheck { scope: Scope },
    /// Delegation recognised but the target carries no route metadata.
    WithoutMetadata { component: String },
    /// Delegation to an annotated component; lists the failing routes.
    Delegated {
        component: String,
        target: String,
        failures: Vec<(ExtractedComponentRoute, String)>,
    },
}

/// Resolves page delegation against scanned files and the route graph.
pub struct ComponentDelegationDetector<'a> {
    config: &'a Config,
    graph: &'a RouteGraph,
    validator: &'a AuthLifecycleValidator,
    files: BTreeMap<&'a str, &'a ScannedFile>,
}

impl<'a> ComponentDelegationDetector<'a> {
    pub fn new(
        config: &'a Config,
        graph: &'a RouteGraph,
        validator: &'a AuthLifecycleValidator,
        files: &'a [ScannedFile],
    ) -> Self {
        Self {
            config,
            graph,
            validator,
            files: files.iter().map(|f| (f.file.as_str(), f)).collect(),
        }
    }

    pub fn classify(&self, page_file: &str, page: &PageFacts) -> DelegationOutcome {
        let scope = self.config.registry.scope_for(&normalize(&page.route));
        if !scope.is_admin() {
            return DelegationOutcome::NotAdmin;
        }
        if page.has_role_check {
            return DelegationOutcome::RoleChecked;
        }
        if page.has_data_fetch {
            return DelegationOutcome::MissingRoleCheck { scope };
        }

        let delegated: Vec<_> = page
            .rendered
            .iter()
            .filter_map(|name| page.imports.iter().find(|i| &i.local == name))
            .collect();
        let [import] = delegated.as_slice() else {
            return DelegationOutcome::MissingRoleCheck { scope };
        };

        let Some(target) = self.resolve(page_file, &import.source) else {
            debug!(page = page_file, source = %import.source, "Delegation target not found");
            return DelegationOutcome::WithoutMetadata {
                component: import.local.clone(),
            };
        };
        if target.component_routes.is_empty() {
            return DelegationOutcome::WithoutMetadata {
                component: import.local.clone(),
            };
        }

        let failures = target
            .component_routes
            .iter()
            .filter_map(|route| {
                self.route_failure(route)
                    .map(|reason| (route.clone(), reason))
            })
            .collect();

        DelegationOutcome::Delegated {
            component: import.local.clone(),
            target: target.file.clone(),
            failures,
        }
    }

    /// Issues for one scanned page file.
    pub fn check_page(&self, file: &ScannedFile) -> Vec<Issue> {
        let Some(page) = &file.page else {
            return Vec::new();
        };

        match self.classify(&file.file, page) {
            DelegationOutcome::NotAdmin | DelegationOutcome::RoleChecked => Vec::new(),
            DelegationOutcome::MissingRoleCheck { scope } => vec![Issue::new(
                IssueKind::PageMissingRoleCheck,
                &file.file,
                1,
                format!(
                    "Admin page {} ({scope}) has no client role check and no recognisable delegation",
                    page.route
                ),
            )],
            DelegationOutcome::WithoutMetadata { component } => vec![Issue::new(
                IssueKind::DelegationWithoutMetadata,
                &file.file,
                1,
                format!(
                    "Admin page {} delegates to <{component}> which declares no @route metadata; review manually",
                    page.route
                ),
            )],
            DelegationOutcome::Delegated {
                component,
                failures,
                ..
            } => failures
                .into_iter()
                .map(|(route, reason)| {
                    let key = RouteKey::new(route.verb, &route.path);
                    Issue::new(
                        IssueKind::DelegatedComponentAuthFailure,
                        &route.file,
                        route.line,
                        format!(
                            "<{component}> (rendered by {}) declares {key}, which fails server authorization: {reason}",
                            file.file
                        ),
                    )
                    .with_route(&key)
                })
                .collect(),
        }
    }

    /// Why a declared route fails, or `None` when it passes.
    ///
    /// Forwarding branches only hand the request to a sub-router, so the
    /// verdict comes from a branch that actually handles the route.
    fn route_failure(&self, route: &ExtractedComponentRoute) -> Option<String> {
        let key = RouteKey::new(route.verb, &route.path);
        let records = self.graph.lookup(&key);
        let serving = records.iter().find(|r| {
            r.handler_branches
                .iter()
                .any(|b| b.forwarded_to.is_none())
        });
        let Some(record) = serving else {
            let routers: BTreeSet<&str> = records
                .iter()
                .flat_map(|r| &r.handler_branches)
                .filter_map(|b| b.forwarded_to.as_deref())
                .collect();
            if routers.is_empty() {
                return Some("no handler branch serves it".to_string());
            }
            let routers: Vec<&str> = routers.into_iter().collect();
            return Some(format!(
                "forwarded to {} but no branch there serves it",
                routers.join(", ")
            ));
        };
        if self.validator.passes(record) {
            return None;
        }
        let kinds: Vec<&str> = self
            .validator
            .evaluate(record)
            .iter()
            .filter_map(|f| f.violation())
            .filter(|k| k.severity() == Severity::Error)
            .map(|k| k.as_str())
            .collect();
        Some(kinds.join(", "))
    }

    /// Resolve an import specifier to a scanned file.
    fn resolve(&self, page_file: &str, source: &str) -> Option<&'a ScannedFile> {
        let base = if source.starts_with('.') {
            let dir = page_file.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
            join_relative(dir, source)?
        } else if let Some(rest) = source
            .strip_prefix("@/")
            .or_else(|| source.strip_prefix("~/"))
        {
            let root = self.config.layout.client_roots.first()?;
            format!("{}/{rest}", root.trim_end_matches('/'))
        } else {
            return None;
        };

        let candidates = std::iter::once(base.clone())
            .chain(COMPONENT_EXTENSIONS.iter().map(|ext| format!("{base}.{ext}")))
            .chain(
                COMPONENT_EXTENSIONS
                    .iter()
                    .map(|ext| format!("{base}/index.{ext}")),
            );
        candidates
            .filter_map(|candidate| self.files.get(candidate.as_str()).copied())
            .next()
    }
}

/// Join `dir` and a `./` / `../` specifier; `None` when it climbs above the root.
fn join_relative(dir: &str, source: &str) -> Option<String> {
    let mut parts: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in source.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}
