//! Tier classification of discovered files.

use crate::auth::page_route_template;
use crate::config::LayoutConfig;
use crate::extract::Tier;
use crate::parser::SourceKind;
use std::path::Path;

/// Infra declaration file names recognised anywhere in the tree.
pub const INFRA_FILE_NAMES: &[&str] = &["serverless.yml", "serverless.yaml"];

/// Role of one file in the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRole {
    pub tier: Tier,
    /// Page route template for files under a page root.
    pub page_route: Option<String>,
}

/// Maps root-relative paths to tiers using the layout conventions.
pub struct TierClassifier<'a> {
    layout: &'a LayoutConfig,
}

impl<'a> TierClassifier<'a> {
    pub fn new(layout: &'a LayoutConfig) -> Self {
        Self { layout }
    }

    pub fn classify(&self, relative: &str) -> Option<FileRole> {
        let (dir, name) = relative.rsplit_once('/').unwrap_or(("", relative));
        let kind = SourceKind::from_path(Path::new(relative));

        if kind == SourceKind::Yaml {
            let in_infra_dir = dir.split('/').any(|s| s == self.layout.infra_dir);
            return (INFRA_FILE_NAMES.contains(&name) || in_infra_dir).then_some(FileRole {
                tier: Tier::Infra,
                page_route: None,
            });
        }

        if kind != SourceKind::Script {
            return None;
        }

        if self.layout.client_roots.iter().any(|root| under(relative, root)) {
            return Some(FileRole {
                tier: Tier::Client,
                page_route: page_route_template(relative, &self.layout.page_roots),
            });
        }

        if dir.split('/').any(|s| s == self.layout.handler_dir) {
            return Some(FileRole {
                tier: Tier::Handler,
                page_route: None,
            });
        }

        None
    }
}

fn under(relative: &str, root: &str) -> bool {
    let root = root.trim_matches('/');
    root.is_empty()
        || relative
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}
