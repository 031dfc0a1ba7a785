//! Working-copy status inspection.

use std::path::Path;
use std::sync::Arc;

use super::types::{ChangeKind, CommitInfo, DetailedStatus, FileChange, RepoState, StatusReport};
use crate::error::{classify_git_error, Result, SyncError};
use crate::sanitize::check_relative_path;
use crate::vcs::parse::{
    count_porcelain_entries, format_git_error, log_format_arg, parse_left_right_counts,
    parse_log, parse_numstat, parse_porcelain_z,
};
use crate::vcs::{ProcessOutput, VcsRunner};

/// Branch assumed when the current branch cannot be determined.
pub const FALLBACK_BRANCH: &str = "main";

/// Returns true if `path` holds version-control metadata.
pub fn is_working_copy(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Computes [`StatusReport`]s from VCS queries. Nothing is cached: every
/// call reflects the working copy at call time.
pub struct StatusInspector {
    runner: Arc<dyn VcsRunner>,
    history_limit: usize,
}

impl StatusInspector {
    pub fn new(runner: Arc<dyn VcsRunner>, history_limit: usize) -> Self {
        Self {
            runner,
            history_limit,
        }
    }

    /// Inspects one working copy.
    ///
    /// Fetch failures and a missing remote branch degrade to `ahead = behind
    /// = 0` with `remote_reachable = false`; they are not errors.
    pub fn inspect(&self, path: &Path) -> StatusReport {
        if !is_working_copy(path) {
            return StatusReport::absent();
        }

        let branch = self.current_branch(path);

        let changes_count = self
            .query(path, &["status", "--porcelain"])
            .map(|output| count_porcelain_entries(&output.stdout))
            .unwrap_or(0);

        let (ahead, behind, remote_reachable) = match self.divergence(path, &branch) {
            Some((ahead, behind)) => (ahead, behind, true),
            None => (0, 0, false),
        };

        StatusReport::present(RepoState::new(
            branch,
            changes_count,
            ahead,
            behind,
            remote_reachable,
        ))
    }

    /// Status plus per-file changes and the most recent commits.
    pub fn inspect_detailed(&self, path: &Path) -> Result<DetailedStatus> {
        let status = self.inspect(path);
        if !status.exists {
            return Ok(DetailedStatus {
                status,
                files: Vec::new(),
                commits: Vec::new(),
            });
        }

        let files = self.file_changes(path)?;
        let commits = self.recent_commits(path);

        Ok(DetailedStatus {
            status,
            files,
            commits,
        })
    }

    /// Unified diff of one file against `HEAD`. Untracked files are diffed
    /// against the empty file.
    pub fn file_diff(&self, path: &Path, file: &str) -> Result<String> {
        if !is_working_copy(path) {
            return Err(SyncError::NotARepository(path.to_path_buf()));
        }
        check_relative_path(file).map_err(SyncError::PathTraversal)?;

        let output = self.run_checked(path, &["diff", "HEAD", "--", file])
            .or_else(|_| self.run_checked(path, &["diff", "--", file]))?;
        if !output.stdout.trim().is_empty() {
            return Ok(output.stdout);
        }

        let untracked = self.run_checked(
            path,
            &["ls-files", "--others", "--exclude-standard", "--", file],
        )?;
        if untracked.stdout.trim().is_empty() {
            return Ok(String::new());
        }

        // --no-index exits 1 when the files differ.
        let output = self.run_raw(path, &["diff", "--no-index", "--", "/dev/null", file])?;
        match output.exit_code {
            0 | 1 => Ok(output.stdout),
            _ => Err(classify_git_error(&format_git_error(&output))),
        }
    }

    /// Current branch name, falling back to [`FALLBACK_BRANCH`].
    pub fn current_branch(&self, path: &Path) -> String {
        self.query(path, &["rev-parse", "--abbrev-ref", "HEAD"])
            .map(|output| output.stdout_trimmed().to_string())
            .filter(|branch| !branch.is_empty())
            .unwrap_or_else(|| FALLBACK_BRANCH.to_string())
    }

    /// Refreshes remote tracking refs and counts `(ahead, behind)` against
    /// `origin/<branch>`. `None` when either step fails.
    fn divergence(&self, path: &Path, branch: &str) -> Option<(u32, u32)> {
        if self.query(path, &["fetch", "--quiet"]).is_none() {
            log::debug!("Fetch failed in {}, divergence unknown", path.display());
            return None;
        }

        let range = format!("HEAD...origin/{}", branch);
        let counts = self.query(path, &["rev-list", "--left-right", "--count", &range])?;
        parse_left_right_counts(&counts.stdout)
    }

    fn file_changes(&self, path: &Path) -> Result<Vec<FileChange>> {
        let output = self.run_checked(path, &["status", "--porcelain", "-z"])?;

        let changes = parse_porcelain_z(&output.stdout)
            .into_iter()
            .map(|entry| {
                let status_code = entry.kind();
                let (additions, deletions) = if status_code == ChangeKind::Modified {
                    self.line_counts(path, &entry.path)
                } else {
                    (0, 0)
                };

                FileChange {
                    path: entry.path,
                    status_code,
                    additions,
                    deletions,
                }
            })
            .collect();

        Ok(changes)
    }

    fn line_counts(&self, path: &Path, file: &str) -> (u32, u32) {
        self.query(path, &["diff", "--numstat", "HEAD", "--", file])
            .map(|output| parse_numstat(&output.stdout))
            .unwrap_or((0, 0))
    }

    fn recent_commits(&self, path: &Path) -> Vec<CommitInfo> {
        if self.history_limit == 0 {
            return Vec::new();
        }

        let limit = format!("-n{}", self.history_limit);
        let format = log_format_arg();
        self.query(path, &["log", &limit, &format])
            .map(|output| parse_log(&output.stdout))
            .unwrap_or_default()
    }

    /// Runs a read-only query; `None` on spawn failure or nonzero exit.
    fn query(&self, path: &Path, args: &[&str]) -> Option<ProcessOutput> {
        self.runner
            .run(path, args)
            .ok()
            .filter(|output| output.success())
    }

    fn run_raw(&self, path: &Path, args: &[&str]) -> Result<ProcessOutput> {
        self.runner
            .run(path, args)
            .map_err(|failure| SyncError::GitUnavailable(failure.reason))
    }

    fn run_checked(&self, path: &Path, args: &[&str]) -> Result<ProcessOutput> {
        let output = self.run_raw(path, args)?;
        if output.success() {
            Ok(output)
        } else {
            Err(classify_git_error(&format_git_error(&output)))
        }
    }
}
