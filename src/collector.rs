use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};

use crate::errors::{AppError, AppResult};

/// Screenshots Cypress writes under any `screenshots` folder
pub const SCREENSHOT_GLOB: &str = "**/screenshots/**/*.png";

/// Failure reports written under any `logs` folder
pub const LOG_GLOB: &str = "**/logs/*.json";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Walks a directory tree and yields relative paths matching glob patterns.
///
/// Every call starts a fresh traversal, so the returned sequence can be
/// restarted by walking again.
pub trait DirectoryWalker {
    fn walk<'a>(
        &'a self,
        root: &Path,
        globs: &[&str],
    ) -> AppResult<Box<dyn Iterator<Item = AppResult<String>> + 'a>>;
}

/// Filesystem walker backed by walkdir, visiting entries in file-name order
#[derive(Debug, Default, Clone, Copy)]
pub struct FsWalker;

impl DirectoryWalker for FsWalker {
    fn walk<'a>(
        &'a self,
        root: &Path,
        globs: &[&str],
    ) -> AppResult<Box<dyn Iterator<Item = AppResult<String>> + 'a>> {
        Ok(Box::new(Matches::new(root, globs)?))
    }
}

/// Lazy iterator over the files below `root` matching any of the patterns
pub struct Matches {
    root: PathBuf,
    entries: Option<walkdir::IntoIter>,
    patterns: Vec<Pattern>,
}

impl Matches {
    pub fn new(root: &Path, globs: &[&str]) -> AppResult<Self> {
        let patterns = globs
            .iter()
            .map(|g| Pattern::new(g))
            .collect::<Result<Vec<_>, _>>()?;

        let entries = if root.exists() {
            Some(
                walkdir::WalkDir::new(root)
                    .sort_by_file_name()
                    .into_iter(),
            )
        } else {
            log::warn!(
                "Directory {} does not exist, nothing to collect",
                root.display()
            );
            None
        };

        Ok(Self {
            root: root.to_path_buf(),
            entries,
            patterns,
        })
    }
}

impl Iterator for Matches {
    type Item = AppResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let entries = self.entries.as_mut()?;

        loop {
            let entry = match entries.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(AppError::from(e))),
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = match entry.path().strip_prefix(&self.root) {
                Ok(path) => to_slash_path(path),
                Err(_) => continue,
            };

            if self
                .patterns
                .iter()
                .any(|pattern| pattern.matches_with(&relative, MATCH_OPTIONS))
            {
                return Some(Ok(relative));
            }
        }
    }
}

/// Collect every match of a single glob into a vector
pub fn collect_matches<W: DirectoryWalker + ?Sized>(
    walker: &W,
    root: &Path,
    glob: &str,
) -> AppResult<Vec<String>> {
    walker.walk(root, &[glob])?.collect()
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_collects_nested_screenshots_in_order() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "screenshots/image2.png");
        touch(temp.path(), "screenshots/image1.png");
        touch(temp.path(), "screenshots/login.cy.js/fails (failed).png");
        touch(temp.path(), "screenshots/notes.txt");
        touch(temp.path(), "videos/run.png");

        let found = collect_matches(&FsWalker, temp.path(), SCREENSHOT_GLOB).unwrap();
        assert_eq!(
            found,
            vec![
                "screenshots/image1.png".to_string(),
                "screenshots/image2.png".to_string(),
                "screenshots/login.cy.js/fails (failed).png".to_string(),
            ]
        );
    }

    #[test]
    fn test_collects_logs_one_level_below_logs_dir() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "logs/b.json");
        touch(temp.path(), "logs/a.json");
        touch(temp.path(), "e2e/logs/c.json");
        touch(temp.path(), "logs/nested/d.json");
        touch(temp.path(), "logs/readme.md");

        let found = collect_matches(&FsWalker, temp.path(), LOG_GLOB).unwrap();
        assert_eq!(
            found,
            vec![
                "e2e/logs/c.json".to_string(),
                "logs/a.json".to_string(),
                "logs/b.json".to_string(),
            ]
        );
    }

    #[test]
    fn test_no_matches_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "screenshots/a.png");

        let found = collect_matches(&FsWalker, temp.path(), LOG_GLOB).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_missing_root_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("does-not-exist");

        let found = collect_matches(&FsWalker, &missing, SCREENSHOT_GLOB).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_walk_is_restartable() {
        let temp = tempfile::tempdir().unwrap();
        touch(temp.path(), "logs/a.json");

        let walker = FsWalker;
        let first: Vec<String> = walker
            .walk(temp.path(), &[LOG_GLOB])
            .unwrap()
            .collect::<AppResult<_>>()
            .unwrap();
        let second: Vec<String> = walker
            .walk(temp.path(), &[LOG_GLOB])
            .unwrap()
            .collect::<AppResult<_>>()
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let temp = tempfile::tempdir().unwrap();
        let walker = FsWalker;
        let result = walker.walk(temp.path(), &["a**b"]);
        assert!(matches!(result, Err(AppError::Pattern(_))));
    }
}
