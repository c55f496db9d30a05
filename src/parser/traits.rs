//! Source kind detection for scanned files.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// The kind of source detected in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// JavaScript / TypeScript, with or without JSX.
    Script,
    /// YAML infrastructure declarations.
    Yaml,
    /// Anything the extractors do not read.
    Unknown,
}

impl SourceKind {
    /// Detect source kind from a file extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs" | "mts" | "cts" => Self::Script,
            "yml" | "yaml" => Self::Yaml,
            _ => Self::Unknown,
        }
    }

    /// Detect source kind from a path.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        // Type declarations carry no call sites or dispatch tables.
        if name.ends_with(".d.ts") {
            return Self::Unknown;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }
}
