//! Extraction progress: one bar over all candidates, with a running count per
//! tier.

use crate::extract::Tier;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Smaller trees finish before a bar is worth drawing.
const MIN_FILES_FOR_PROGRESS: usize = 10;

/// Files extracted per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierCounts {
    pub client: usize,
    pub handler: usize,
    pub infra: usize,
}

impl TierCounts {
    pub fn total(&self) -> usize {
        self.client + self.handler + self.infra
    }
}

impl std::fmt::Display for TierCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "client {}, handler {}, infra {}",
            self.client, self.handler, self.infra
        )
    }
}

/// Shared by the extraction workers; counting always happens, drawing only
/// on an interactive terminal.
pub struct ExtractionProgress {
    bar: Option<ProgressBar>,
    counts: [AtomicUsize; 3],
}

impl ExtractionProgress {
    pub fn new(candidates: usize, is_tty: bool, is_ci: bool) -> Self {
        let bar =
            should_show_progress(candidates, is_tty, is_ci).then(|| create_progress_bar(candidates));
        Self {
            bar,
            counts: Default::default(),
        }
    }

    /// One file of `tier` extracted.
    pub fn record(&self, tier: Tier) {
        self.counts[slot(tier)].fetch_add(1, Ordering::Relaxed);
        if let Some(bar) = &self.bar {
            bar.set_message(self.counts().to_string());
            bar.inc(1);
        }
    }

    pub fn counts(&self) -> TierCounts {
        let load = |tier| self.counts[slot(tier)].load(Ordering::Relaxed);
        TierCounts {
            client: load(Tier::Client),
            handler: load(Tier::Handler),
            infra: load(Tier::Infra),
        }
    }

    /// Clear the bar and return the final counts.
    pub fn finish(&self) -> TierCounts {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
        self.counts()
    }
}

fn slot(tier: Tier) -> usize {
    match tier {
        Tier::Client => 0,
        Tier::Handler => 1,
        Tier::Infra => 2,
    }
}

fn should_show_progress(candidates: usize, is_tty: bool, is_ci: bool) -> bool {
    candidates >= MIN_FILES_FOR_PROGRESS && is_tty && !is_ci
}

fn create_progress_bar(candidates: usize) -> ProgressBar {
    let pb = ProgressBar::new(candidates as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "Extracting {bar:40} {pos:>4}/{len:4} files [{elapsed_precise}] {msg}",
        )
        .expect("Invalid progress bar template")
        .progress_chars("⣿⣀ "),
    );
    pb
}
