//! Pure data types for the reconciliation engine.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One working copy and its authoritative remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRecord {
    /// Full repository name, e.g. `owner/repo`.
    pub name: String,
    /// Local working-copy path.
    pub local_path: PathBuf,
    /// Remote URL the working copy tracks.
    pub remote_url: String,
}

/// Sync risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Low,
    Medium,
    High,
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Risk::Low => "low",
            Risk::Medium => "medium",
            Risk::High => "high",
        };
        f.write_str(s)
    }
}

/// Classifies the risk of syncing a working copy in the given state.
///
/// High when dirty and behind. Medium when dirty with unpushed commits, or
/// clean and behind. Low otherwise.
pub fn classify_risk(is_dirty: bool, ahead: u32, behind: u32) -> (Risk, String) {
    match (is_dirty, ahead > 0, behind > 0) {
        (true, _, true) => (
            Risk::High,
            format!(
                "Uncommitted changes while {} commit(s) behind remote; pulling may conflict",
                behind
            ),
        ),
        (true, true, false) => (
            Risk::Medium,
            format!(
                "Uncommitted changes on top of {} unpushed commit(s)",
                ahead
            ),
        ),
        (false, _, true) => (
            Risk::Medium,
            format!("Remote has {} new commit(s) to integrate", behind),
        ),
        (true, false, false) => (
            Risk::Low,
            "Uncommitted changes, remote has nothing new".to_string(),
        ),
        (false, _, false) => (Risk::Low, "No incoming changes".to_string()),
    }
}

/// Human-readable status line. Priority: dirty, diverged, ahead, behind, up to date.
pub fn humanize_status(is_dirty: bool, ahead: u32, behind: u32) -> String {
    if is_dirty {
        return "Uncommitted changes".to_string();
    }
    match (ahead, behind) {
        (0, 0) => "Up to date".to_string(),
        (a, 0) => format!("{} commits ahead (Push needed)", a),
        (0, b) => format!("{} commits behind (Pull needed)", b),
        (a, b) => format!("Diverged ({}↑ / {}↓)", a, b),
    }
}

/// Observed state of an existing working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoState {
    pub branch: String,
    pub is_dirty: bool,
    pub changes_count: usize,
    pub ahead: u32,
    pub behind: u32,
    /// False when the fetch or the divergence count failed; `ahead` and
    /// `behind` are then reported as zero and mean "unknown".
    pub remote_reachable: bool,
    pub risk: Risk,
    pub risk_reason: String,
    pub human_status: String,
}

impl RepoState {
    /// Derives risk and status text from the raw observations.
    pub fn new(
        branch: impl Into<String>,
        changes_count: usize,
        ahead: u32,
        behind: u32,
        remote_reachable: bool,
    ) -> Self {
        let is_dirty = changes_count > 0;
        let (risk, risk_reason) = classify_risk(is_dirty, ahead, behind);

        Self {
            branch: branch.into(),
            is_dirty,
            changes_count,
            ahead,
            behind,
            remote_reachable,
            risk,
            risk_reason,
            human_status: humanize_status(is_dirty, ahead, behind),
        }
    }
}

/// Status of one working copy, computed fresh from VCS queries.
///
/// Serializes as `{"exists": false}` when there is no working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub exists: bool,
    #[serde(flatten)]
    pub state: Option<RepoState>,
}

impl StatusReport {
    pub fn absent() -> Self {
        Self {
            exists: false,
            state: None,
        }
    }

    pub fn present(state: RepoState) -> Self {
        Self {
            exists: true,
            state: Some(state),
        }
    }

    /// Current branch, if the working copy exists.
    pub fn branch(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.branch.as_str())
    }

    pub fn risk(&self) -> Option<Risk> {
        self.state.as_ref().map(|s| s.risk)
    }
}

/// Kind of local modification of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
    Untracked,
}

/// One changed file in the working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub status_code: ChangeKind,
    /// Line counts, only computed for modified files.
    pub additions: u32,
    pub deletions: u32,
}

/// One commit of the history display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Abbreviated hash.
    pub hash: String,
    pub author: String,
    pub email: String,
    /// Author time, seconds since the epoch.
    pub timestamp: i64,
    pub subject: String,
}

/// Status plus per-file changes and recent history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailedStatus {
    #[serde(flatten)]
    pub status: StatusReport,
    pub files: Vec<FileChange>,
    pub commits: Vec<CommitInfo>,
}

/// Backup branch created before a destructive operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRef {
    pub branch_name: String,
    pub created_at: DateTime<Local>,
}

/// A backup branch found in a working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub branch_name: String,
    /// Abbreviated hash the branch points at.
    pub commit: String,
    /// Committer time of that commit, seconds since the epoch.
    pub committed_at: i64,
}

/// Reconciliation method applied to an existing working copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Pull,
    Rebase,
    Reset,
}

impl Strategy {
    /// Parses a strategy token. Anything other than `pull`, `rebase` or
    /// `reset` (case-insensitive) selects the default `Pull` strategy.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "rebase" => Strategy::Rebase,
            "reset" => Strategy::Reset,
            "pull" => Strategy::Pull,
            other => {
                log::debug!("Unknown sync strategy '{}', using pull", other);
                Strategy::Pull
            }
        }
    }
}

/// Operation reported in a [`SyncResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Clone,
    Pull,
    Rebase,
    Reset,
}

impl From<Strategy> for Operation {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Pull => Operation::Pull,
            Strategy::Rebase => Operation::Rebase,
            Strategy::Reset => Operation::Reset,
        }
    }
}

/// Suggestion attached to a failed sync that has a backup branch.
pub const RESTORE_SUGGESTION: &str =
    "A backup branch was created. You can restore your work if needed.";

/// Suggestion attached to a failed sync whose backup could not be created.
pub const NO_BACKUP_SUGGESTION: &str =
    "No backup branch could be created. Inspect the working copy before retrying.";

/// Outcome of one sync invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    pub operation: Operation,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl SyncResult {
    pub fn cloned() -> Self {
        Self {
            success: true,
            operation: Operation::Clone,
            message: "Repository cloned successfully".to_string(),
            snapshot: None,
            suggestion: None,
        }
    }

    pub fn clone_failed(diagnostic: &str) -> Self {
        Self {
            success: false,
            operation: Operation::Clone,
            message: format!("Clone failed: {}", diagnostic),
            snapshot: None,
            suggestion: None,
        }
    }

    pub fn synced(strategy: Strategy, snapshot: Option<SnapshotRef>) -> Self {
        Self {
            success: true,
            operation: strategy.into(),
            message: "Sync completed successfully".to_string(),
            snapshot,
            suggestion: None,
        }
    }

    pub fn sync_failed(strategy: Strategy, diagnostic: &str, snapshot: Option<SnapshotRef>) -> Self {
        let suggestion = if snapshot.is_some() {
            RESTORE_SUGGESTION
        } else {
            NO_BACKUP_SUGGESTION
        };

        Self {
            success: false,
            operation: strategy.into(),
            message: format!("Sync failed: {}", diagnostic),
            snapshot,
            suggestion: Some(suggestion.to_string()),
        }
    }

    /// A sync that was refused before any VCS command ran.
    pub fn rejected(strategy: Strategy, reason: &str) -> Self {
        Self {
            success: false,
            operation: strategy.into(),
            message: format!("Sync rejected: {}", reason),
            snapshot: None,
            suggestion: None,
        }
    }
}

/// One batch entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub repo: String,
    pub result: SyncResult,
}

/// Per-repository outcomes of a batch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub results: Vec<BatchEntry>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|e| e.result.success).count()
    }
}
