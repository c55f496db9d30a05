//! Cross-tier route graph.
//!
//! [`RouteGraphBuilder`] is the only place route records are created. Every
//! merge is a set union or a flag OR, so folding the same observations in any
//! order produces the same graph.

use super::normalize::{GREEDY, PARAM, segments};
use super::{HttpVerb, RouteKey, Scope};
use crate::auth::AuthFinding;
use crate::config::{Registry, UNASSIGNED_MODULE};
use crate::extract::{
    ExtractedAsyncTrigger, ExtractedCallSite, ExtractedComponentRoute, ExtractedHandlerRoute,
    ExtractedInfraRoute, PathExpr, ScannedFile,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierPresence {
    pub client: bool,
    pub handler: bool,
    pub infra: bool,
}

/// A file location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SiteRef {
    pub file: String,
    pub line: usize,
}

/// One route's state across all tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteRecord {
    pub key: RouteKey,
    pub presence: TierPresence,
    pub scope: Scope,
    pub module: String,
    /// Registry-tagged internal route, never expected in the client tier.
    pub internal: bool,
    /// Raw templates seen for this route before normalization.
    pub templates: BTreeSet<String>,
    pub call_sites: BTreeSet<SiteRef>,
    pub handler_branches: BTreeSet<ExtractedHandlerRoute>,
    pub infra_decls: BTreeSet<ExtractedInfraRoute>,
    pub component_decls: BTreeSet<ExtractedComponentRoute>,
    /// A related route (possibly this one) with a handler branch.
    pub handled_by: Option<RouteKey>,
    /// A related route is invoked from the client tier.
    pub called: bool,
    /// A related route is declared in the infra tier.
    pub deployed: bool,
    pub auth_findings: Vec<AuthFinding>,
    /// Fingerprints of the issues reported against this route.
    pub issues: Vec<String>,
}

impl RouteRecord {
    fn new(key: RouteKey, scope: Scope) -> Self {
        Self {
            key,
            presence: TierPresence::default(),
            scope,
            module: String::new(),
            internal: false,
            templates: BTreeSet::new(),
            call_sites: BTreeSet::new(),
            handler_branches: BTreeSet::new(),
            infra_decls: BTreeSet::new(),
            component_decls: BTreeSet::new(),
            handled_by: None,
            called: false,
            deployed: false,
            auth_findings: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Every file that contributed an observation, in order.
    pub fn files(&self) -> BTreeSet<&str> {
        self.call_sites
            .iter()
            .map(|s| s.file.as_str())
            .chain(self.handler_branches.iter().map(|h| h.file.as_str()))
            .chain(self.infra_decls.iter().map(|i| i.file.as_str()))
            .chain(self.component_decls.iter().map(|c| c.file.as_str()))
            .collect()
    }
}

/// Upserts route records from extractor observations.
pub struct RouteGraphBuilder<'a> {
    registry: &'a Registry,
    records: BTreeMap<RouteKey, RouteRecord>,
    async_triggers: BTreeSet<ExtractedAsyncTrigger>,
}

impl<'a> RouteGraphBuilder<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            records: BTreeMap::new(),
            async_triggers: BTreeSet::new(),
        }
    }

    fn upsert(&mut self, verb: HttpVerb, template: &str) -> &mut RouteRecord {
        let key = RouteKey::new(verb, template);
        let scope = self.registry.scope_for(&key.path);
        let record = self
            .records
            .entry(key.clone())
            .or_insert_with(|| RouteRecord::new(key, scope));
        record.templates.insert(template.to_string());
        record
    }

    /// Unresolved call sites carry no route identity and are skipped.
    pub fn add_call_site(&mut self, site: &ExtractedCallSite) {
        if let PathExpr::Resolved(path) = &site.path {
            let record = self.upsert(site.verb, path);
            record.presence.client = true;
            record.call_sites.insert(SiteRef {
                file: site.file.clone(),
                line: site.line,
            });
        }
    }

    pub fn add_component_route(&mut self, route: &ExtractedComponentRoute) {
        let record = self.upsert(route.verb, &route.path);
        record.presence.client = true;
        record.component_decls.insert(route.clone());
    }

    pub fn add_handler_route(&mut self, route: &ExtractedHandlerRoute) {
        let record = self.upsert(route.verb, &route.path);
        record.presence.handler = true;
        record.handler_branches.insert(route.clone());
    }

    pub fn add_infra_route(&mut self, route: &ExtractedInfraRoute) {
        let record = self.upsert(route.verb, &route.path);
        record.presence.infra = true;
        record.infra_decls.insert(route.clone());
    }

    pub fn add_async_trigger(&mut self, trigger: &ExtractedAsyncTrigger) {
        self.async_triggers.insert(trigger.clone());
    }

    /// Fold every observation of one scanned file.
    pub fn merge(&mut self, file: &ScannedFile) {
        for site in &file.call_sites {
            self.add_call_site(site);
        }
        for route in &file.component_routes {
            self.add_component_route(route);
        }
        for route in &file.handler_routes {
            self.add_handler_route(route);
        }
        for route in &file.infra_routes {
            self.add_infra_route(route);
        }
        for trigger in &file.async_triggers {
            self.add_async_trigger(trigger);
        }
    }

    /// Finish the graph: async exemptions, ownership and cross-tier links.
    pub fn build(self) -> RouteGraph {
        let Self {
            registry,
            mut records,
            async_triggers,
        } = self;

        for record in records.values_mut() {
            if !async_triggers.is_empty() {
                record.handler_branches = std::mem::take(&mut record.handler_branches)
                    .into_iter()
                    .map(|mut branch| {
                        if async_triggers.iter().any(|t| t.targets(&branch.file)) {
                            branch.exempt = true;
                        }
                        branch
                    })
                    .collect();
            }

            record.internal = registry.is_internal(&record.key);
            record.module = registry
                .module_for_route(&record.key.path)
                .or_else(|| {
                    record
                        .files()
                        .into_iter()
                        .find_map(|file| registry.module_for_file(file))
                })
                .unwrap_or_else(|| UNASSIGNED_MODULE.to_string());
        }

        link_tiers(&mut records);
        debug!(routes = records.len(), "Built route graph");
        RouteGraph { records }
    }
}

/// Fill `handled_by`, `called` and `deployed` from related records.
fn link_tiers(records: &mut BTreeMap<RouteKey, RouteRecord>) {
    let snapshot: Vec<(RouteKey, TierPresence)> = records
        .values()
        .map(|r| (r.key.clone(), r.presence))
        .collect();

    for record in records.values_mut() {
        let key = record.key.clone();
        // Exact key first, then the first related key in order.
        record.handled_by = if record.presence.handler {
            Some(key.clone())
        } else {
            neighbours(&snapshot, &key)
                .find(|(_, presence)| presence.handler)
                .map(|(other, _)| other.clone())
        };
        record.called = neighbours(&snapshot, &key).any(|(_, presence)| presence.client);
        record.deployed = neighbours(&snapshot, &key).any(|(_, presence)| presence.infra);
    }
}

fn neighbours<'s>(
    snapshot: &'s [(RouteKey, TierPresence)],
    key: &'s RouteKey,
) -> impl Iterator<Item = &'s (RouteKey, TierPresence)> {
    snapshot.iter().filter(move |(other, _)| related(key, other))
}

/// Two routes refer to the same endpoint: compatible verbs and one path
/// pattern covers the other.
pub fn related(a: &RouteKey, b: &RouteKey) -> bool {
    let verbs = a.verb == b.verb || a.verb == HttpVerb::Any || b.verb == HttpVerb::Any;
    verbs && (covers(&a.path, &b.path) || covers(&b.path, &a.path))
}

/// True when canonical `pattern` matches canonical `path`.
///
/// `{}` matches any one segment, a trailing `{+}` one or more segments.
pub fn covers(pattern: &str, path: &str) -> bool {
    let pattern: Vec<&str> = segments(pattern).collect();
    let path: Vec<&str> = segments(path).collect();

    for (i, p) in pattern.iter().enumerate() {
        if *p == GREEDY {
            return path.len() > i;
        }
        let Some(q) = path.get(i) else {
            return false;
        };
        if !segment_matches(p, q) {
            return false;
        }
    }
    pattern.len() == path.len()
}

fn segment_matches(pattern: &str, segment: &str) -> bool {
    if pattern == segment || pattern == PARAM {
        return true;
    }
    if !pattern.contains(PARAM) {
        return false;
    }
    // Mixed segment such as `{}.json`: literal parts must appear in order.
    let parts: Vec<&str> = pattern.split(PARAM).collect();
    let (Some(first), Some(last)) = (parts.first(), parts.last()) else {
        return false;
    };
    if segment.len() < first.len() + last.len()
        || !segment.starts_with(first)
        || !segment.ends_with(last)
    {
        return false;
    }
    let mut rest = &segment[first.len()..segment.len() - last.len()];
    for middle in &parts[1..parts.len() - 1] {
        match rest.find(middle) {
            Some(idx) => rest = &rest[idx + middle.len()..],
            None => return false,
        }
    }
    true
}

/// The merged, immutable-by-key route graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteGraph {
    records: BTreeMap<RouteKey, RouteRecord>,
}

impl RouteGraph {
    pub fn get(&self, key: &RouteKey) -> Option<&RouteRecord> {
        self.records.get(key)
    }

    /// Records serving `key`: exact key, then the `ANY` verb, then greedy or
    /// parameter coverage.
    pub fn lookup(&self, key: &RouteKey) -> Vec<&RouteRecord> {
        let mut found = Vec::new();
        if let Some(exact) = self.records.get(key) {
            found.push(exact);
        }
        let any = RouteKey {
            verb: HttpVerb::Any,
            path: key.path.clone(),
        };
        if key.verb != HttpVerb::Any
            && let Some(record) = self.records.get(&any)
        {
            found.push(record);
        }
        for record in self.records.values() {
            if record.key != *key && record.key != any && related(&record.key, key) {
                found.push(record);
            }
        }
        found
    }

    pub fn records(&self) -> impl Iterator<Item = &RouteRecord> {
        self.records.values()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut RouteRecord> {
        self.records.values_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleEntry;
    use crate::extract::Tier;

    fn call(verb: HttpVerb, path: &str, file: &str, line: usize) -> ExtractedCallSite {
        ExtractedCallSite {
            verb,
            path: PathExpr::Resolved(path.to_string()),
            file: file.to_string(),
            line,
        }
    }

    fn handler(verb: HttpVerb, path: &str, file: &str) -> ExtractedHandlerRoute {
        ExtractedHandlerRoute {
            verb,
            path: path.to_string(),
            file: file.to_string(),
            branch_line: 3,
            handler_fn: None,
            primitives: Vec::new(),
            forwarded_to: None,
            exempt: false,
        }
    }

    fn infra(verb: HttpVerb, path: &str) -> ExtractedInfraRoute {
        ExtractedInfraRoute {
            verb,
            path: path.to_string(),
            target_ref: "handlers/api.handler".to_string(),
            is_public: false,
            file: "infra/serverless.yml".to_string(),
            line: 5,
        }
    }

    #[test]
    fn test_param_names_merge_into_one_record() {
        let registry = Registry::default();
        let mut builder = RouteGraphBuilder::new(&registry);
        builder.add_handler_route(&handler(HttpVerb::Post, "/chats/{sessionId}", "handlers/chat.ts"));
        builder.add_call_site(&call(HttpVerb::Post, "/chats/${id}", "client/src/chat.ts", 9));
        let graph = builder.build();

        assert_eq!(graph.len(), 1);
        let record = graph.records().next().unwrap();
        assert!(record.presence.client && record.presence.handler);
        assert_eq!(record.templates.len(), 2);
        assert_eq!(record.handled_by, Some(record.key.clone()));
        assert!(record.called);
    }

    #[test]
    fn test_unresolved_call_sites_skipped() {
        let registry = Registry::default();
        let mut builder = RouteGraphBuilder::new(&registry);
        builder.add_call_site(&ExtractedCallSite {
            verb: HttpVerb::Get,
            path: PathExpr::Unresolved("dynamic".to_string()),
            file: "a.ts".to_string(),
            line: 1,
        });
        assert!(builder.build().is_empty());
    }

    #[test]
    fn test_merge_is_order_independent() {
        let registry = Registry::default();
        let mut files = Vec::new();
        for i in 0..4 {
            let mut f = ScannedFile::new(format!("f{i}.ts"), Tier::Client);
            f.call_sites.push(call(HttpVerb::Get, "/widgets/{id}", &format!("f{i}.ts"), i + 1));
            f.handler_routes.push(handler(HttpVerb::Get, "/widgets/:id", &format!("h{i}.ts")));
            f.infra_routes.push(infra(HttpVerb::Any, "/widgets/{proxy+}"));
            files.push(f);
        }

        let build = |order: &[usize]| {
            let mut builder = RouteGraphBuilder::new(&registry);
            for &i in order {
                builder.merge(&files[i]);
            }
            // Merging twice changes nothing.
            builder.merge(&files[order[0]]);
            builder.build()
        };

        let reference = build(&[0, 1, 2, 3]);
        for order in [[3, 2, 1, 0], [1, 3, 0, 2], [2, 0, 3, 1]] {
            assert_eq!(build(&order), reference);
        }
        assert_eq!(reference.len(), 2);
    }

    #[test]
    fn test_lookup_any_and_greedy() {
        let registry = Registry::default();
        let mut builder = RouteGraphBuilder::new(&registry);
        builder.add_handler_route(&handler(HttpVerb::Any, "/files/{key+}", "h.ts"));
        builder.add_handler_route(&handler(HttpVerb::Any, "/status", "h.ts"));
        let graph = builder.build();

        let hits = graph.lookup(&RouteKey::new(HttpVerb::Get, "/files/a/b"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key.path, "/files/{+}");

        let hits = graph.lookup(&RouteKey::new(HttpVerb::Get, "/status"));
        assert_eq!(hits.len(), 1);
        assert!(graph.lookup(&RouteKey::new(HttpVerb::Get, "/files")).is_empty());
    }

    #[test]
    fn test_links_across_related_routes() {
        let registry = Registry::default();
        let mut builder = RouteGraphBuilder::new(&registry);
        builder.add_infra_route(&infra(HttpVerb::Any, "/{proxy+}"));
        builder.add_handler_route(&handler(HttpVerb::Get, "/widgets", "h.ts"));
        builder.add_call_site(&call(HttpVerb::Get, "/gadgets", "c.ts", 1));
        let graph = builder.build();

        let widgets = graph.get(&RouteKey::new(HttpVerb::Get, "/widgets")).unwrap();
        assert!(widgets.deployed);
        assert!(!widgets.called);

        let gadgets = graph.get(&RouteKey::new(HttpVerb::Get, "/gadgets")).unwrap();
        assert!(gadgets.handled_by.is_none());
    }

    #[test]
    fn test_async_trigger_marks_branches_exempt() {
        let registry = Registry::default();
        let mut builder = RouteGraphBuilder::new(&registry);
        builder.add_handler_route(&handler(HttpVerb::Post, "/jobs/{id}", "svc/handlers/worker.ts"));
        builder.add_async_trigger(&ExtractedAsyncTrigger::new(
            "handlers/worker.handler",
            "svc/infra/serverless.yml",
            "infra",
        ));
        let graph = builder.build();
        let record = graph.records().next().unwrap();
        assert!(record.handler_branches.iter().all(|b| b.exempt));
    }

    #[test]
    fn test_async_trigger_leaves_other_services_alone() {
        let registry = Registry::default();
        let mut builder = RouteGraphBuilder::new(&registry);
        builder.add_handler_route(&handler(
            HttpVerb::Get,
            "/admin/sys/widgets/{id}",
            "services/b/handlers/index.ts",
        ));
        builder.add_async_trigger(&ExtractedAsyncTrigger::new(
            "handlers/index.handler",
            "services/a/serverless.yml",
            "infra",
        ));
        let graph = builder.build();
        let record = graph.records().next().unwrap();
        assert!(record.handler_branches.iter().all(|b| !b.exempt));
    }

    #[test]
    fn test_scope_module_and_internal() {
        let registry = Registry {
            modules: vec![ModuleEntry {
                name: "widgets".to_string(),
                path: "services/widgets".to_string(),
                prefixes: vec!["/admin/sys/widgets".to_string()],
            }],
            internal: vec!["GET /health".to_string()],
            ..Registry::default()
        };
        let mut builder = RouteGraphBuilder::new(&registry);
        builder.add_handler_route(&handler(HttpVerb::Get, "/admin/sys/widgets/{id}", "x.ts"));
        builder.add_handler_route(&handler(
            HttpVerb::Get,
            "/health",
            "services/widgets/handlers/health.ts",
        ));
        let graph = builder.build();

        let widget = graph.get(&RouteKey::new(HttpVerb::Get, "/admin/sys/widgets/{}")).unwrap();
        assert_eq!(widget.scope, Scope::SystemAdmin);
        assert_eq!(widget.module, "widgets");

        let health = graph.get(&RouteKey::new(HttpVerb::Get, "/health")).unwrap();
        assert!(health.internal);
        assert_eq!(health.module, "widgets");
        assert_eq!(health.scope, Scope::Data);
    }

    #[test]
    fn test_covers() {
        assert!(covers("/a/{}", "/a/b"));
        assert!(covers("/a/{+}", "/a/b/c"));
        assert!(!covers("/a/{+}", "/a"));
        assert!(covers("/files/{}.json", "/files/report.json"));
        assert!(!covers("/files/{}.json", "/files/report.csv"));
        assert!(!covers("/a/b", "/a/{}"));
        assert!(covers("/", "/"));
    }
}
