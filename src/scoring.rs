use crate::aggregator::Totals;
use serde::{Deserialize, Serialize};

const DEFAULT_CONDITIONAL_MAX_ERRORS: usize = 5;

/// Certification tier of a validated project or module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificationTier {
    Certified,
    Conditional,
    Uncertified,
}

impl CertificationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificationTier::Certified => "CERTIFIED",
            CertificationTier::Conditional => "CONDITIONAL",
            CertificationTier::Uncertified => "UNCERTIFIED",
        }
    }
}

impl std::fmt::Display for CertificationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Thresholds for the certification tiers (`certification:` config section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificationPolicy {
    /// Most errors a `conditional` project may carry.
    pub conditional_max_errors: usize,
    /// Most warnings a `conditional` project may carry; unlimited when unset.
    pub conditional_max_warnings: Option<usize>,
}

impl Default for CertificationPolicy {
    fn default() -> Self {
        Self {
            conditional_max_errors: DEFAULT_CONDITIONAL_MAX_ERRORS,
            conditional_max_warnings: None,
        }
    }
}

impl CertificationPolicy {
    /// Map issue totals to a tier.
    ///
    /// Zero errors always certifies, whatever the warning count.
    pub fn score(&self, totals: &Totals) -> CertificationTier {
        if totals.errors == 0 {
            return CertificationTier::Certified;
        }

        let warnings_ok = self
            .conditional_max_warnings
            .is_none_or(|max| totals.warnings <= max);

        if totals.errors <= self.conditional_max_errors && warnings_ok {
            CertificationTier::Conditional
        } else {
            CertificationTier::Uncertified
        }
    }
}
