#[cfg(test)]
pub mod fixtures {
    use crate::aggregator::{SummaryBuilder, Totals};
    use crate::run::Report;
    use crate::scoring::CertificationPolicy;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Report over the given issues, as a run with no routes would produce.
    pub fn report_with(issues: Vec<crate::rules::Issue>) -> Report {
        let totals = Totals::of(&issues);
        let modules = SummaryBuilder::new().build(&issues);
        Report {
            version: "0.1.0".to_string(),
            root: "./project".to_string(),
            complete: true,
            tier: CertificationPolicy::default().score(&totals),
            totals,
            files_scanned: 3,
            module: None,
            modules,
            routes: Vec::new(),
            issues,
            scan_warnings: Vec::new(),
        }
    }

    /// Writes a throwaway project tree.
    #[derive(Default)]
    pub struct ProjectBuilder {
        files: Vec<(PathBuf, Vec<u8>)>,
    }

    impl ProjectBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn file(self, relative: &str, content: &str) -> Self {
            self.bytes(relative, content.as_bytes())
        }

        pub fn bytes(mut self, relative: &str, content: &[u8]) -> Self {
            self.files.push((PathBuf::from(relative), content.to_vec()));
            self
        }

        pub fn build(self) -> TempDir {
            let dir = TempDir::new().unwrap();
            for (relative, content) in self.files {
                let path = dir.path().join(relative);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).unwrap();
                }
                fs::write(path, content).unwrap();
            }
            dir
        }
    }
}
