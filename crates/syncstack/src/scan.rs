//! Discovery of existing working copies below a directory.

use std::io;
use std::path::Path;
use std::sync::Arc;

use log::debug;
use walkdir::WalkDir;

use crate::engine::status::is_working_copy;
use crate::engine::types::RepoRecord;
use crate::error::{Result, SyncError};
use crate::sanitize::redact_repo_url;
use crate::vcs::VcsRunner;

/// Directory depth searched when none is given.
pub const DEFAULT_SCAN_DEPTH: usize = 3;

pub struct LocalScanner {
    runner: Arc<dyn VcsRunner>,
}

impl LocalScanner {
    pub fn new(runner: Arc<dyn VcsRunner>) -> Self {
        Self { runner }
    }

    /// Finds working copies at most `max_depth` levels below `root`.
    ///
    /// A found working copy is not descended into, and hidden directories
    /// are skipped. Records are named by their path relative to `root` and
    /// carry the redacted `origin` URL, or an empty string without one.
    pub fn scan(&self, root: &Path, max_depth: usize) -> Result<Vec<RepoRecord>> {
        if !root.is_dir() {
            return Err(SyncError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("'{}' is not a directory", root.display()),
            )));
        }

        let mut records = Vec::new();
        let mut walker = WalkDir::new(root)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry during scan: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }

            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if entry.depth() > 0 && hidden {
                walker.skip_current_dir();
                continue;
            }

            if is_working_copy(entry.path()) {
                records.push(self.record(root, entry.path()));
                walker.skip_current_dir();
            }
        }

        debug!("Found {} working copies below {}", records.len(), root.display());
        Ok(records)
    }

    fn record(&self, root: &Path, path: &Path) -> RepoRecord {
        let name = match path.strip_prefix(root) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            _ => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
        };

        let remote_url = self
            .runner
            .run(path, &["config", "--get", "remote.origin.url"])
            .ok()
            .filter(|output| output.success())
            .map(|output| redact_repo_url(output.stdout_trimmed()))
            .unwrap_or_default();

        RepoRecord {
            name,
            local_path: path.to_path_buf(),
            remote_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::testing::ScriptedRunner;
    use tempfile::TempDir;

    fn repo(root: &Path, relative: &str) {
        std::fs::create_dir_all(root.join(relative).join(".git")).unwrap();
    }

    #[test]
    fn test_scan_finds_working_copies() {
        let root = TempDir::new().unwrap();
        repo(root.path(), "alpha");
        repo(root.path(), "org/beta");
        repo(root.path(), "alpha/vendored");
        repo(root.path(), ".cache/gamma");
        std::fs::create_dir_all(root.path().join("plain/dir")).unwrap();

        let scanner = LocalScanner::new(Arc::new(
            ScriptedRunner::new().ok(&["config"], "https://tok@github.com/o/r.git\n"),
        ));
        let records = scanner.scan(root.path(), DEFAULT_SCAN_DEPTH).unwrap();

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "org/beta"]);
        assert_eq!(records[0].remote_url, "https://****@github.com/o/r.git");
        assert_eq!(records[1].local_path, root.path().join("org/beta"));
    }

    #[test]
    fn test_scan_respects_depth() {
        let root = TempDir::new().unwrap();
        repo(root.path(), "a/b/c/deep");
        repo(root.path(), "a/shallow");

        let scanner = LocalScanner::new(Arc::new(ScriptedRunner::new()));
        let records = scanner.scan(root.path(), 3).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "a/shallow");
    }

    #[test]
    fn test_scan_root_is_working_copy() {
        let root = TempDir::new().unwrap();
        repo(root.path(), "");
        repo(root.path(), "inner");

        let scanner = LocalScanner::new(Arc::new(ScriptedRunner::new().fail(&["config"], "")));
        let records = scanner.scan(root.path(), 3).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].local_path, root.path());
        assert_eq!(records[0].remote_url, "");
    }

    #[test]
    fn test_scan_missing_root() {
        let root = TempDir::new().unwrap();
        let scanner = LocalScanner::new(Arc::new(ScriptedRunner::new()));
        assert!(scanner.scan(&root.path().join("missing"), 3).is_err());
    }
}
