use crate::aggregator::{ModuleSummary, Totals};
use crate::extract::ScanWarning;
use crate::routes::RouteRecord;
use crate::rules::Issue;
use crate::scoring::CertificationTier;
use serde::Serialize;

/// Final artifact of one validation run.
///
/// Everything in here is sorted; two runs over the same tree serialize to the
/// same bytes.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub version: String,
    pub root: String,
    /// False when at least one file could not be read or parsed.
    pub complete: bool,
    pub tier: CertificationTier,
    pub totals: Totals,
    pub files_scanned: usize,
    /// Module filter applied to this report, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub modules: Vec<ModuleSummary>,
    pub routes: Vec<RouteRecord>,
    pub issues: Vec<Issue>,
    pub scan_warnings: Vec<ScanWarning>,
}

impl Report {
    pub fn has_errors(&self) -> bool {
        self.totals.errors > 0
    }
}
