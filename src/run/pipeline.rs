//! The validation pipeline: discover, extract, merge, check, aggregate.

use super::report::Report;
use crate::aggregator::{IssueCollector, SummaryBuilder, Totals};
use crate::auth::{AuthLayer, AuthLifecycleValidator};
use crate::config::Config;
use crate::discovery::{FileRole, PathFilter, TierClassifier};
use crate::error::{Result, ValidateError};
use crate::extract::{self, ExtractPatterns, ScanError, ScanWarning, ScannedFile, Tier};
use crate::reporter::progress::ExtractionProgress;
use crate::routes::{RouteGraphBuilder, normalize};
use crate::rules::{IssueKind, RuleContext, RuleEngine};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Which authorization layer's issues to keep. Non-auth issues are always kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LayerFilter {
    #[default]
    All,
    Layer1Only,
    Layer2Only,
}

impl LayerFilter {
    pub fn keeps(&self, kind: IssueKind) -> bool {
        match (self, kind.layer()) {
            (LayerFilter::Layer1Only, Some(AuthLayer::Layer2)) => false,
            (LayerFilter::Layer2Only, Some(AuthLayer::Layer1)) => false,
            _ => true,
        }
    }
}

/// Per-run options that do not belong in the config file.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    pub root: PathBuf,
    pub module: Option<String>,
    pub layers: LayerFilter,
    /// Interactive terminal; enables the progress bar.
    pub is_tty: bool,
    pub ci: bool,
    /// Set from another thread to abort the run.
    pub cancel: Arc<AtomicBool>,
}

impl ValidateOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn with_module(mut self, module: Option<String>) -> Self {
        self.module = module;
        self
    }

    pub fn with_layers(mut self, layers: LayerFilter) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_progress(mut self, is_tty: bool, ci: bool) -> Self {
        self.is_tty = is_tty;
        self.ci = ci;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }
}

/// One discovered file, ready for extraction.
struct Candidate {
    path: PathBuf,
    relative: String,
    role: FileRole,
}

/// Run a full validation and build the report.
///
/// Configuration problems are raised before any file is read.
pub fn validate(config: &Config, options: &ValidateOptions) -> Result<Report> {
    let root = options.root.as_path();
    if !root.exists() {
        return Err(ValidateError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ValidateError::NotADirectory(root.to_path_buf()));
    }
    if let Some(module) = &options.module
        && !config.registry.has_module(module)
    {
        return Err(ValidateError::UnknownModule {
            name: module.clone(),
            known: config.registry.module_names().join(", "),
        });
    }
    let patterns = ExtractPatterns::compile(config)?;

    let (candidates, mut scan_warnings) = discover(root, config);
    info!(root = %root.display(), files = candidates.len(), "Discovered files");

    let mut files = extract_all(&candidates, config, &patterns, options)?;
    files.sort_by(|a, b| a.file.cmp(&b.file));
    check_normalization(&files)?;

    let mut builder = RouteGraphBuilder::new(&config.registry);
    for file in &files {
        builder.merge(file);
        scan_warnings.extend(file.warnings.iter().cloned());
    }
    let mut graph = builder.build();

    let validator = AuthLifecycleValidator::new(&config.handler);
    for record in graph.records_mut() {
        record.auth_findings = validator.evaluate(record);
    }

    let ctx = RuleContext {
        config,
        graph: &graph,
        files: &files,
        validator: &validator,
    };
    let mut collector = IssueCollector::new();
    collector.add_all(RuleEngine::new().run(&ctx));
    debug!(issues = collector.total(), "Rules finished");

    let mut issues = collector.finish(&config.registry);
    issues.retain(|issue| options.layers.keeps(issue.kind));

    for record in graph.records_mut() {
        let route = record.key.to_string();
        let mut fingerprints: Vec<String> = issues
            .iter()
            .filter(|i| i.route.as_deref() == Some(route.as_str()))
            .map(|i| i.fingerprint.clone())
            .collect();
        fingerprints.sort();
        fingerprints.dedup();
        record.issues = fingerprints;
    }

    let mut routes: Vec<_> = graph.records().cloned().collect();
    let mut module_names = config.registry.module_names();
    if let Some(module) = &options.module {
        issues.retain(|i| &i.module == module);
        routes.retain(|r| &r.module == module);
        module_names = vec![module.clone()];
    }

    scan_warnings.sort();
    scan_warnings.dedup();

    let totals = Totals::of(&issues);
    let modules = SummaryBuilder::new()
        .with_modules(module_names)
        .with_policy(config.certification.clone())
        .build(&issues);
    let tier = config.certification.score(&totals);

    info!(
        errors = totals.errors,
        warnings = totals.warnings,
        routes = routes.len(),
        tier = %tier,
        "Validation finished"
    );

    Ok(Report {
        version: env!("CARGO_PKG_VERSION").to_string(),
        root: root.display().to_string(),
        complete: scan_warnings.is_empty(),
        tier,
        totals,
        files_scanned: files.len(),
        module: options.module.clone(),
        modules,
        routes,
        issues,
        scan_warnings,
    })
}

/// Walk and classify. Walk errors become scan warnings.
fn discover(root: &Path, config: &Config) -> (Vec<Candidate>, Vec<ScanWarning>) {
    let filter = PathFilter::new(root, config);
    let classifier = TierClassifier::new(&config.layout);
    let mut candidates = Vec::new();
    let mut warnings = Vec::new();

    for entry in filter.walk() {
        match entry {
            Ok(path) => {
                let Some(relative) = filter.relative(&path) else {
                    continue;
                };
                if let Some(role) = classifier.classify(&relative) {
                    candidates.push(Candidate {
                        path,
                        relative,
                        role,
                    });
                }
            }
            Err(error) => warnings.push((&error).into()),
        }
    }
    (candidates, warnings)
}

/// Extract every candidate in parallel. Workers only return values.
fn extract_all(
    candidates: &[Candidate],
    config: &Config,
    patterns: &ExtractPatterns,
    options: &ValidateOptions,
) -> Result<Vec<ScannedFile>> {
    let progress = ExtractionProgress::new(candidates.len(), options.is_tty, options.ci);
    let cancel = &options.cancel;

    let files: Vec<ScannedFile> = candidates
        .par_iter()
        .filter_map(|candidate| {
            if cancel.load(Ordering::Relaxed) {
                return None;
            }
            let scanned = extract_one(candidate, config, patterns);
            progress.record(candidate.role.tier);
            Some(scanned)
        })
        .collect();
    let counts = progress.finish();
    debug!(
        client = counts.client,
        handler = counts.handler,
        infra = counts.infra,
        "Extraction finished"
    );

    if cancel.load(Ordering::Relaxed) {
        warn!("Validation cancelled");
        return Err(ValidateError::Cancelled);
    }
    Ok(files)
}

fn extract_one(candidate: &Candidate, config: &Config, patterns: &ExtractPatterns) -> ScannedFile {
    let relative = candidate.relative.as_str();
    let tier = candidate.role.tier;
    let content = match fs::read_to_string(&candidate.path) {
        Ok(content) => content,
        Err(source) => {
            let error = ScanError::ReadFile {
                path: relative.to_string(),
                source,
            };
            warn!(file = relative, error = %error, "Failed to read file");
            let mut scanned = ScannedFile::new(relative, tier);
            scanned.warnings.push((&error).into());
            return scanned;
        }
    };

    debug!(file = relative, tier = %tier, "Extracting");
    match tier {
        Tier::Client => extract::client::extract(
            relative,
            &content,
            candidate.role.page_route.clone(),
            config,
            patterns,
        ),
        Tier::Handler => extract::handler::extract(relative, &content, config, patterns),
        Tier::Infra => extract::infra::extract(relative, &content, &config.layout.infra_dir),
    }
}

/// Every template must already be a fixed point of normalization once
/// normalized; anything else is a defect in the normalizer.
fn check_normalization(files: &[ScannedFile]) -> Result<()> {
    for file in files {
        for template in file.templates() {
            let once = normalize(template);
            let twice = normalize(&once);
            if once != twice {
                return Err(ValidateError::InvariantViolation(format!(
                    "normalization of '{template}' in {} is not idempotent: '{once}' -> '{twice}'",
                    file.file
                )));
            }
        }
    }
    Ok(())
}
