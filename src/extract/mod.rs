//! Per-tier route extraction.
//!
//! Extractors read one file each and emit immutable observation values. They
//! never build route records and never canonicalize paths: raw templates go
//! into the observations and [`crate::routes::RouteGraphBuilder`] does the rest.

pub mod client;
pub mod handler;
pub mod infra;

use crate::auth::PrimitiveKind;
use crate::config::Config;
use crate::error::ValidateError;
use crate::parser::Import;
use crate::routes::{HttpVerb, Scope};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which tier a scanned file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Client,
    Handler,
    Infra,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Client => "client",
            Tier::Handler => "handler",
            Tier::Infra => "infra",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A path argument as found at a call site.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum PathExpr {
    /// Literal or template literal text (placeholders kept raw).
    Resolved(String),
    /// Dynamic expression; the string says why.
    Unresolved(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExtractedCallSite {
    pub verb: HttpVerb,
    pub path: PathExpr,
    pub file: String,
    pub line: usize,
}

/// Route declared by a component's `@route` annotation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExtractedComponentRoute {
    pub verb: HttpVerb,
    pub path: String,
    pub component: String,
    pub scope: Option<Scope>,
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExtractedDirectCall {
    pub callee: String,
    pub file: String,
    pub line: usize,
    pub whitelisted: bool,
}

/// Structural facts about a client page file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFacts {
    /// Page route template derived from the file path.
    pub route: String,
    pub imports: Vec<Import>,
    /// Capitalised JSX elements rendered, in first-seen order.
    pub rendered: Vec<String>,
    pub has_data_fetch: bool,
    pub has_role_check: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrimitiveCall {
    pub name: String,
    pub kind: PrimitiveKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExtractedHandlerRoute {
    pub verb: HttpVerb,
    pub path: String,
    pub file: String,
    pub branch_line: usize,
    pub handler_fn: Option<String>,
    /// Authorization primitives reachable from the branch, in execution order.
    pub primitives: Vec<PrimitiveCall>,
    pub forwarded_to: Option<String>,
    pub exempt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExtractedInfraRoute {
    pub verb: HttpVerb,
    pub path: String,
    pub target_ref: String,
    pub is_public: bool,
    pub file: String,
    pub line: usize,
}

/// A function wired to a queue, topic, schedule or stream.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExtractedAsyncTrigger {
    pub target_ref: String,
    pub file: String,
    /// Directory `target_ref` is relative to.
    pub service_dir: String,
}

impl ExtractedAsyncTrigger {
    /// The service directory is the declaring file's directory, or the parent
    /// of the nearest enclosing `infra_dir` when the file sits inside one.
    pub fn new(target_ref: impl Into<String>, file: impl Into<String>, infra_dir: &str) -> Self {
        let file = file.into();
        let dir = file.rsplit_once('/').map_or("", |(dir, _)| dir);
        let segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
        let service = match segments.iter().rposition(|s| *s == infra_dir) {
            Some(i) => &segments[..i],
            None => &segments[..],
        };
        Self {
            target_ref: target_ref.into(),
            service_dir: service.join("/"),
            file,
        }
    }

    /// Root-relative module path, without extension, this trigger invokes.
    ///
    /// `handlers/worker.handler` declared under `svc/` resolves to
    /// `svc/handlers/worker`. `None` when the reference climbs above the root.
    pub fn module_path(&self) -> Option<String> {
        let module = match self.target_ref.rsplit_once('.') {
            Some((path, _export)) if !path.is_empty() && !path.ends_with('.') => path,
            _ => self.target_ref.as_str(),
        };
        let mut resolved: Vec<&str> = self
            .service_dir
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        for segment in module.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    resolved.pop()?;
                }
                s => resolved.push(s),
            }
        }
        Some(resolved.join("/"))
    }

    /// True when `handler_file` (root-relative) is the file this trigger targets.
    pub fn targets(&self, handler_file: &str) -> bool {
        let stem = match handler_file.rsplit_once('.') {
            Some((stem, _ext)) => stem,
            None => handler_file,
        };
        self.module_path().is_some_and(|module| module == stem)
    }
}

/// Per-file, recoverable problems. Reported as scan warnings.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Skipped {path}: {message}")]
    Walk { path: String, message: String },

    #[error("Malformed YAML in {path}: {message}")]
    Yaml { path: String, message: String },

    #[error("Unrecognised route declaration in {path}:{line}: {message}")]
    Declaration {
        path: String,
        line: usize,
        message: String,
    },
}

/// Serializable form of a [`ScanError`] for the report.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScanWarning {
    pub message: String,
}

impl From<&ScanError> for ScanWarning {
    fn from(error: &ScanError) -> Self {
        Self {
            message: error.to_string(),
        }
    }
}

/// Everything extracted from one file.
#[derive(Debug, Clone, Default)]
pub struct ScannedFile {
    pub file: String,
    pub tier: Option<Tier>,
    pub call_sites: Vec<ExtractedCallSite>,
    pub component_routes: Vec<ExtractedComponentRoute>,
    pub direct_calls: Vec<ExtractedDirectCall>,
    pub page: Option<PageFacts>,
    pub handler_routes: Vec<ExtractedHandlerRoute>,
    pub infra_routes: Vec<ExtractedInfraRoute>,
    pub async_triggers: Vec<ExtractedAsyncTrigger>,
    pub warnings: Vec<ScanWarning>,
}

impl ScannedFile {
    pub fn new(file: impl Into<String>, tier: Tier) -> Self {
        Self {
            file: file.into(),
            tier: Some(tier),
            ..Default::default()
        }
    }

    /// Every raw path template this file contributes to the graph.
    pub fn templates(&self) -> impl Iterator<Item = &str> {
        let client = self.call_sites.iter().filter_map(|c| match &c.path {
            PathExpr::Resolved(p) => Some(p.as_str()),
            PathExpr::Unresolved(_) => None,
        });
        client
            .chain(self.component_routes.iter().map(|c| c.path.as_str()))
            .chain(self.handler_routes.iter().map(|h| h.path.as_str()))
            .chain(self.infra_routes.iter().map(|i| i.path.as_str()))
    }
}

/// Regexes compiled once from configuration and shared by every worker.
#[derive(Debug, Clone)]
pub struct ExtractPatterns {
    pub wrapper_call: Regex,
    pub direct_call_whitelist: Vec<Regex>,
    /// Markers matched against comment-masked code.
    pub async_markers: Vec<Regex>,
    /// `@`-prefixed markers matched against the raw text.
    pub async_annotations: Vec<Regex>,
}

impl ExtractPatterns {
    pub fn compile(config: &Config) -> Result<Self, ValidateError> {
        let wrapper = regex::escape(config.client.wrapper.trim());
        let wrapper_call = Regex::new(&format!(
            r"\b{wrapper}\s*(?:\.\s*(get|post|put|patch|delete|head|options)\s*)?\("
        ))
        .map_err(|source| ValidateError::Regex {
            field: "client.wrapper".to_string(),
            source,
        })?;

        let (annotations, markers): (Vec<String>, Vec<String>) = config
            .handler
            .async_markers
            .iter()
            .cloned()
            .partition(|p| p.starts_with('@'));

        Ok(Self {
            wrapper_call,
            direct_call_whitelist: compile_list(
                &config.client.direct_call_whitelist,
                "client.direct_call_whitelist",
            )?,
            async_markers: compile_list(&markers, "handler.async_markers")?,
            async_annotations: compile_list(&annotations, "handler.async_markers")?,
        })
    }

    /// True when a handler file is queue/event triggered.
    pub fn is_async_handler(&self, content: &str, masked: &str) -> bool {
        self.async_markers.iter().any(|re| re.is_match(masked))
            || self.async_annotations.iter().any(|re| re.is_match(content))
    }
}

fn compile_list(patterns: &[String], field: &str) -> Result<Vec<Regex>, ValidateError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|source| ValidateError::Regex {
                field: format!("{field} ({p})"),
                source,
            })
        })
        .collect()
}

/// Shorten an expression for messages.
pub(crate) fn excerpt(text: &str) -> String {
    const MAX: usize = 60;
    let single_line: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= MAX {
        single_line
    } else {
        let cut: String = single_line.chars().take(MAX).collect();
        format!("{cut}...")
    }
}
