//! Repository reconciliation and safe-sync engine.

pub mod batch;
pub mod credentials;
pub mod snapshot;
pub mod status;
pub mod sync;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use secrecy::SecretString;

pub use batch::{parse_repo_list, BatchOrchestrator, RepoSpec};
pub use credentials::{CredentialHostRule, CredentialPolicy, HostMatcher};
pub use snapshot::SnapshotManager;
pub use status::StatusInspector;
pub use sync::SyncExecutor;
pub use types::{
    BatchEntry, BatchResult, ChangeKind, CommitInfo, DetailedStatus, FileChange, Operation,
    RepoRecord, RepoState, Risk, SnapshotInfo, SnapshotRef, StatusReport, Strategy, SyncResult,
};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::scan::LocalScanner;
use crate::vcs::{GitProcessRunner, VcsRunner};

/// The engine's components wired to one [`VcsRunner`].
pub struct SyncEngine {
    executor: Arc<SyncExecutor>,
    batch: BatchOrchestrator,
    scanner: LocalScanner,
}

impl SyncEngine {
    /// Builds an engine that runs the configured git binary.
    pub fn from_config(config: &EngineConfig) -> Self {
        let runner: Arc<dyn VcsRunner> = Arc::new(GitProcessRunner::new(&config.git_binary));
        Self::with_runner(config, runner)
    }

    pub fn with_runner(config: &EngineConfig, runner: Arc<dyn VcsRunner>) -> Self {
        let executor = Arc::new(SyncExecutor::new(
            Arc::clone(&runner),
            StatusInspector::new(Arc::clone(&runner), config.history_limit),
            SnapshotManager::new(Arc::clone(&runner), config.snapshot_prefix.clone()),
            CredentialPolicy::from_rules(&config.credential_hosts),
        ));
        let batch = BatchOrchestrator::new(
            Arc::clone(&executor),
            config.workspace_root.clone(),
            config.batch_parallelism,
        );

        Self {
            executor,
            batch,
            scanner: LocalScanner::new(runner),
        }
    }

    pub fn status(&self, path: &Path) -> StatusReport {
        self.executor.inspector().inspect(path)
    }

    pub fn detailed_status(&self, path: &Path) -> Result<DetailedStatus> {
        self.executor.inspector().inspect_detailed(path)
    }

    pub fn file_diff(&self, path: &Path, file: &str) -> Result<String> {
        self.executor.inspector().file_diff(path, file)
    }

    pub fn sync(
        &self,
        path: &Path,
        name: &str,
        remote_url: &str,
        credential: &SecretString,
        strategy: Strategy,
    ) -> SyncResult {
        self.executor.sync(path, name, remote_url, credential, strategy)
    }

    pub fn batch_sync(
        &self,
        credential: &SecretString,
        repos: &[RepoSpec],
        strategy: Strategy,
    ) -> BatchResult {
        self.batch.batch_sync(credential, repos, strategy)
    }

    pub fn list_snapshots(&self, path: &Path) -> Result<Vec<SnapshotInfo>> {
        self.executor.snapshots().list(path)
    }

    /// Restores a backup branch; returns the snapshot taken of the state
    /// that was replaced.
    pub fn restore_snapshot(&self, path: &Path, branch_name: &str) -> Result<Option<SnapshotRef>> {
        self.executor.snapshots().restore(path, branch_name)
    }

    pub fn scan(&self, root: &Path, max_depth: usize) -> Result<Vec<RepoRecord>> {
        self.scanner.scan(root, max_depth)
    }

    pub fn workspace_root(&self) -> &Path {
        self.batch.workspace_root()
    }
}
