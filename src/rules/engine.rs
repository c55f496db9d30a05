use crate::auth::AuthLifecycleValidator;
use crate::config::Config;
use crate::extract::ScannedFile;
use crate::routes::RouteGraph;
use crate::rules::builtin;
use crate::rules::types::Issue;
use tracing::trace;

/// Everything a rule may look at. Shared read-only by all rules.
pub struct RuleContext<'a> {
    pub config: &'a Config,
    pub graph: &'a RouteGraph,
    /// Scanned files, sorted by path.
    pub files: &'a [ScannedFile],
    pub validator: &'a AuthLifecycleValidator,
}

/// A single, independent check.
pub trait Rule: Send + Sync {
    fn id(&self) -> &'static str;

    /// Checks over the whole route graph.
    fn check_graph(&self, _ctx: &RuleContext<'_>) -> Vec<Issue> {
        Vec::new()
    }

    /// Checks over one scanned file.
    fn check_file(&self, _file: &ScannedFile, _ctx: &RuleContext<'_>) -> Vec<Issue> {
        Vec::new()
    }
}

pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self {
            rules: builtin::all_rules(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<Box<dyn Rule>>) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Run every rule. Output is unsorted and may contain duplicates; the
    /// collector takes care of both.
    pub fn run(&self, ctx: &RuleContext<'_>) -> Vec<Issue> {
        let mut issues = Vec::new();
        for rule in &self.rules {
            let found = rule.check_graph(ctx);
            trace!(rule = rule.id(), issues = found.len(), "Graph rule finished");
            issues.extend(found);
        }
        for file in ctx.files {
            for rule in &self.rules {
                issues.extend(rule.check_file(file, ctx));
            }
        }
        issues
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}
