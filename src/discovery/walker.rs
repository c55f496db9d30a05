//! Project tree walking with build-output exclusion.

use crate::config::Config;
use crate::extract::ScanError;
use crate::ignore::IgnoreFilter;
use crate::parser::SourceKind;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};
use walkdir::{DirEntry, WalkDir};

/// Directory names never descended into.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    "out",
    ".next",
    ".nuxt",
    ".svelte-kit",
    "coverage",
    ".serverless",
    ".aws-sam",
    "cdk.out",
    ".turbo",
    ".cache",
    ".parcel-cache",
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    "target",
    "__pycache__",
];

/// Decides which paths under a project root are scanned.
///
/// The filter is a plain value; [`PathFilter::walk`] can be called any number
/// of times and yields the same sequence each time.
pub struct PathFilter {
    root: PathBuf,
    excluded_names: BTreeSet<String>,
    /// Root-relative directory paths (`services/legacy`).
    excluded_paths: Vec<String>,
    ignore: IgnoreFilter,
    follow_symlinks: bool,
}

impl PathFilter {
    pub fn new(root: &Path, config: &Config) -> Self {
        let mut excluded_names: BTreeSet<String> =
            DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect();
        let mut excluded_paths = Vec::new();
        for entry in &config.exclude {
            let entry = entry.trim().trim_matches('/');
            if entry.is_empty() {
                continue;
            }
            if entry.contains('/') {
                excluded_paths.push(entry.to_string());
            } else {
                excluded_names.insert(entry.to_string());
            }
        }

        Self {
            root: root.to_path_buf(),
            excluded_names,
            excluded_paths,
            ignore: IgnoreFilter::new(root).with_include_tests(config.include_tests),
            follow_symlinks: config.follow_symlinks,
        }
    }

    /// Segment-boundary exclusion of a root-relative path.
    pub fn is_excluded(&self, relative: &str) -> bool {
        relative
            .split('/')
            .any(|segment| self.excluded_names.contains(segment))
            || self.excluded_paths.iter().any(|prefix| {
                relative == prefix
                    || relative
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
    }

    fn keep_entry(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        let Some(relative) = self.relative(entry.path()) else {
            return false;
        };
        let is_dir = entry.file_type().is_dir();
        if self.is_excluded(&relative) || self.ignore.is_ignored(entry.path(), is_dir) {
            trace!(path = %relative, "Excluded");
            return false;
        }
        true
    }

    /// Root-relative path with `/` separators.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    /// Lazily walk the root in file-name order, yielding candidate source
    /// files. Unreadable entries and symlink loops are yielded as errors and
    /// the walk continues.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf, ScanError>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| self.keep_entry(entry))
            .filter_map(move |entry| match entry {
                Ok(entry) => {
                    let is_source = entry.file_type().is_file()
                        && SourceKind::from_path(entry.path()) != SourceKind::Unknown;
                    is_source.then(|| Ok(entry.into_path()))
                }
                Err(err) => {
                    let path = err
                        .path()
                        .and_then(|p| self.relative(p))
                        .unwrap_or_else(|| self.root.display().to_string());
                    let message = if err.loop_ancestor().is_some() {
                        "symbolic link cycle".to_string()
                    } else {
                        err.io_error()
                            .map(|e| e.to_string())
                            .unwrap_or_else(|| err.to_string())
                    };
                    warn!(path = %path, error = %message, "Skipping unreadable path");
                    Some(Err(ScanError::Walk { path, message }))
                }
            })
    }
}
