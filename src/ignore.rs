use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

/// Name of the project-level ignore file (gitignore syntax).
pub const IGNORE_FILE_NAME: &str = ".route-auditignore";

#[derive(Default)]
pub struct IgnoreFilter {
    gitignore: Option<Gitignore>,
    include_tests: bool,
}

impl IgnoreFilter {
    pub fn new(root: &Path) -> Self {
        Self {
            gitignore: Self::load_ignorefiles(root),
            include_tests: false,
        }
    }

    pub fn with_include_tests(mut self, include: bool) -> Self {
        self.include_tests = include;
        self
    }

    fn load_ignorefiles(root: &Path) -> Option<Gitignore> {
        let mut builder = GitignoreBuilder::new(root);
        let mut has_patterns = false;

        // .gitignore only counts inside a git checkout
        let git_dir = root.join(".git");
        let gitignore_file = root.join(".gitignore");
        if git_dir.exists() && gitignore_file.exists() && builder.add(&gitignore_file).is_none() {
            has_patterns = true;
        }

        let own = root.join(IGNORE_FILE_NAME);
        if own.exists() && builder.add(&own).is_none() {
            has_patterns = true;
        }

        if has_patterns {
            builder.build().ok()
        } else {
            None
        }
    }

    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        if !self.include_tests && !is_dir && self.is_test_path(path) {
            return true;
        }

        if let Some(ref gitignore) = self.gitignore {
            return gitignore.matched(path, is_dir).is_ignore();
        }

        false
    }

    /// Unit-test and mock sources: their calls target stubbed routes.
    fn is_test_path(&self, path: &Path) -> bool {
        let in_test_dir = path.components().any(|c| {
            let name = c.as_os_str().to_string_lossy();
            name == "__tests__" || name == "__mocks__"
        });
        let test_file = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .is_some_and(|name| name.contains(".test.") || name.contains(".spec."));
        in_test_dir || test_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_excludes_unit_tests() {
        let dir = TempDir::new().unwrap();
        let filter = IgnoreFilter::new(dir.path());

        assert!(filter.is_ignored(Path::new("/project/client/src/api.test.ts"), false));
        assert!(filter.is_ignored(Path::new("/project/client/src/__tests__/a.ts"), false));
        assert!(filter.is_ignored(Path::new("/project/handlers/chat.spec.js"), false));
        assert!(!filter.is_ignored(Path::new("/project/client/src/api.ts"), false));
        assert!(!filter.is_ignored(Path::new("/project/contest/app.ts"), false));
    }

    #[test]
    fn test_include_tests() {
        let dir = TempDir::new().unwrap();
        let filter = IgnoreFilter::new(dir.path()).with_include_tests(true);

        assert!(!filter.is_ignored(Path::new("/project/client/src/api.test.ts"), false));
    }

    #[test]
    fn test_custom_ignorefile() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(IGNORE_FILE_NAME),
            "# generated clients\n*.generated.ts\nlegacy/\n",
        )
        .unwrap();

        let filter = IgnoreFilter::new(dir.path());

        assert!(filter.is_ignored(&dir.path().join("client/api.generated.ts"), false));
        assert!(filter.is_ignored(&dir.path().join("legacy"), true));
        assert!(!filter.is_ignored(&dir.path().join("client/api.ts"), false));
    }

    #[test]
    fn test_gitignore_needs_git_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "*.ts\n").unwrap();

        let filter = IgnoreFilter::new(dir.path());
        assert!(!filter.is_ignored(&dir.path().join("a.ts"), false));

        fs::create_dir(dir.path().join(".git")).unwrap();
        let filter = IgnoreFilter::new(dir.path());
        assert!(filter.is_ignored(&dir.path().join("a.ts"), false));
    }

    #[test]
    fn test_no_ignorefile() {
        let dir = TempDir::new().unwrap();
        let filter = IgnoreFilter::new(dir.path());

        assert!(!filter.is_ignored(&dir.path().join("src/main.ts"), false));
    }
}
