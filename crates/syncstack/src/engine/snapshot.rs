//! Backup branches taken before destructive operations.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local};

use super::status::is_working_copy;
use super::types::{SnapshotInfo, SnapshotRef};
use crate::error::{classify_git_error, Result, SyncError};
use crate::vcs::parse::format_git_error;
use crate::vcs::VcsRunner;

/// Timestamp layout of backup branch names.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Upper bound on `-N` suffixes tried within one second.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Creates and manages `<prefix>-backup-<YYYYMMDD_HHMMSS>` branches.
///
/// Backups are never deleted by the engine.
pub struct SnapshotManager {
    runner: Arc<dyn VcsRunner>,
    prefix: String,
}

impl SnapshotManager {
    pub fn new(runner: Arc<dyn VcsRunner>, prefix: impl Into<String>) -> Self {
        Self {
            runner,
            prefix: prefix.into(),
        }
    }

    /// Branch name namespace shared by all backups, e.g. `gh-sync-backup-`.
    pub fn namespace(&self) -> String {
        format!("{}-backup-", self.prefix)
    }

    /// Base branch name for a snapshot taken at `at`.
    pub fn branch_name_at(&self, at: &DateTime<Local>) -> String {
        format!("{}{}", self.namespace(), at.format(TIMESTAMP_FORMAT))
    }

    /// Points a new backup branch at `HEAD`.
    ///
    /// Returns `None` when the branch cannot be created, e.g. in a repository
    /// without commits. A second snapshot within the same second gets a
    /// `-1`, `-2`, ... suffix.
    pub fn snapshot(&self, path: &Path) -> Option<SnapshotRef> {
        self.snapshot_at(path, Local::now())
    }

    fn snapshot_at(&self, path: &Path, created_at: DateTime<Local>) -> Option<SnapshotRef> {
        let base = self.branch_name_at(&created_at);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let branch_name = if attempt == 0 {
                base.clone()
            } else {
                format!("{}-{}", base, attempt)
            };

            match self.branch_exists(path, &branch_name) {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    log::warn!("Snapshot skipped in {}: {}", path.display(), e);
                    return None;
                }
            }

            return match self.runner.run(path, &["branch", &branch_name]) {
                Ok(output) if output.success() => {
                    log::info!("Created backup branch {} in {}", branch_name, path.display());
                    Some(SnapshotRef {
                        branch_name,
                        created_at,
                    })
                }
                Ok(output) => {
                    log::warn!(
                        "Could not create backup branch in {}: {}",
                        path.display(),
                        format_git_error(&output)
                    );
                    None
                }
                Err(failure) => {
                    log::warn!("Snapshot skipped in {}: {}", path.display(), failure);
                    None
                }
            };
        }

        log::warn!("No free backup branch name for {} in {}", base, path.display());
        None
    }

    /// Lists backup branches, newest first.
    pub fn list(&self, path: &Path) -> Result<Vec<SnapshotInfo>> {
        if !is_working_copy(path) {
            return Err(SyncError::NotARepository(path.to_path_buf()));
        }

        let pattern = format!("refs/heads/{}*", self.namespace());
        let output = self
            .runner
            .run(
                path,
                &[
                    "for-each-ref",
                    "--sort=-committerdate",
                    "--format=%(refname:short)%1f%(objectname:short)%1f%(committerdate:unix)",
                    &pattern,
                ],
            )
            .map_err(|failure| SyncError::GitUnavailable(failure.reason))?;

        if !output.success() {
            return Err(classify_git_error(&format_git_error(&output)));
        }

        let snapshots = output
            .stdout
            .lines()
            .filter_map(|line| {
                let mut fields = line.split('\u{1f}');
                let branch_name = fields.next()?.trim().to_string();
                let commit = fields.next()?.trim().to_string();
                let committed_at = fields.next()?.trim().parse().ok()?;
                Some(SnapshotInfo {
                    branch_name,
                    commit,
                    committed_at,
                })
            })
            .collect();

        Ok(snapshots)
    }

    /// Hard-resets the current branch to a backup branch.
    ///
    /// A fresh snapshot of the current state is taken first and returned.
    /// Only branches inside this manager's namespace can be restored.
    pub fn restore(&self, path: &Path, branch_name: &str) -> Result<Option<SnapshotRef>> {
        if !is_working_copy(path) {
            return Err(SyncError::NotARepository(path.to_path_buf()));
        }
        if !branch_name.starts_with(&self.namespace()) {
            return Err(SyncError::GitOperation(format!(
                "'{}' is not a backup branch",
                branch_name
            )));
        }
        if !self.branch_exists(path, branch_name)? {
            return Err(SyncError::GitOperation(format!(
                "Backup branch '{}' not found",
                branch_name
            )));
        }

        let safety = self.snapshot(path);

        let target = format!("refs/heads/{}", branch_name);
        let output = self
            .runner
            .run(path, &["reset", "--hard", &target])
            .map_err(|failure| SyncError::GitUnavailable(failure.reason))?;

        if output.success() {
            log::info!("Restored {} from {}", path.display(), branch_name);
            Ok(safety)
        } else {
            Err(classify_git_error(&format_git_error(&output)))
        }
    }

    fn branch_exists(&self, path: &Path, branch_name: &str) -> Result<bool> {
        let reference = format!("refs/heads/{}", branch_name);
        self.runner
            .run(path, &["show-ref", "--verify", "--quiet", &reference])
            .map(|output| output.success())
            .map_err(|failure| SyncError::GitUnavailable(failure.reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::testing::ScriptedRunner;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn manager(runner: ScriptedRunner) -> (SnapshotManager, Arc<ScriptedRunner>) {
        let runner = Arc::new(runner);
        (SnapshotManager::new(runner.clone(), "gh-sync"), runner)
    }

    #[test]
    fn test_branch_name_format() {
        let (manager, _) = manager(ScriptedRunner::new());
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(manager.branch_name_at(&at), "gh-sync-backup-20240309_070501");
    }

    #[test]
    fn test_snapshot_creates_branch() {
        let dir = TempDir::new().unwrap();
        let (manager, runner) = manager(ScriptedRunner::new().fail(&["show-ref"], ""));

        let snapshot = manager.snapshot(dir.path()).unwrap();
        assert!(snapshot.branch_name.starts_with("gh-sync-backup-"));
        assert!(runner.called(&["branch", &snapshot.branch_name]));
    }

    #[test]
    fn test_snapshot_suffixes_taken_name() {
        let dir = TempDir::new().unwrap();
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let (manager, runner) = manager(
            ScriptedRunner::new()
                .ok(
                    &["show-ref", "--verify", "--quiet", "refs/heads/gh-sync-backup-20240309_070501"],
                    "",
                )
                .ok(
                    &["show-ref", "--verify", "--quiet", "refs/heads/gh-sync-backup-20240309_070501-1"],
                    "",
                )
                .fail(&["show-ref"], ""),
        );

        let snapshot = manager.snapshot_at(dir.path(), at).unwrap();
        assert_eq!(snapshot.branch_name, "gh-sync-backup-20240309_070501-2");
        assert!(runner.called(&["branch", "gh-sync-backup-20240309_070501-2"]));
        assert!(!runner.called(&["branch", "gh-sync-backup-20240309_070501"]));
    }

    #[test]
    fn test_snapshot_failure_returns_none() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(
            ScriptedRunner::new()
                .fail(&["show-ref"], "")
                .fail(&["branch"], "fatal: not a valid object name: 'master'"),
        );

        assert!(manager.snapshot(dir.path()).is_none());
    }

    #[test]
    fn test_snapshot_absent_git_returns_none() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(ScriptedRunner::new().absent(&[]));
        assert!(manager.snapshot(dir.path()).is_none());
    }

    #[test]
    fn test_restore_refuses_foreign_branch() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let (manager, runner) = manager(ScriptedRunner::new());

        let err = manager.restore(dir.path(), "main").unwrap_err();
        assert!(err.to_string().contains("not a backup branch"));
        assert!(!runner.called(&["reset"]));
    }

    #[test]
    fn test_list_parses_refs() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let (manager, _) = manager(ScriptedRunner::new().ok(
            &["for-each-ref"],
            "gh-sync-backup-20240102_000000\u{1f}abc1234\u{1f}1704153600\n\
             gh-sync-backup-20240101_000000\u{1f}def5678\u{1f}1704067200\n",
        ));

        let snapshots = manager.list(dir.path()).unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].commit, "abc1234");
        assert_eq!(snapshots[1].committed_at, 1_704_067_200);
    }
}
