//! Clone-or-update of a single repository.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use super::credentials::CredentialPolicy;
use super::snapshot::SnapshotManager;
use super::status::StatusInspector;
use super::types::{Risk, Strategy, SyncResult};
use crate::sanitize::{redact_repo_url, redact_urls_in, scrub_secret};
use crate::vcs::parse::format_git_error;
use crate::vcs::VcsRunner;

/// Performs one sync: clone when the working copy is absent, otherwise
/// snapshot then apply the chosen strategy.
pub struct SyncExecutor {
    runner: Arc<dyn VcsRunner>,
    inspector: StatusInspector,
    snapshots: SnapshotManager,
    credentials: CredentialPolicy,
}

impl SyncExecutor {
    pub fn new(
        runner: Arc<dyn VcsRunner>,
        inspector: StatusInspector,
        snapshots: SnapshotManager,
        credentials: CredentialPolicy,
    ) -> Self {
        Self {
            runner,
            inspector,
            snapshots,
            credentials,
        }
    }

    pub fn inspector(&self) -> &StatusInspector {
        &self.inspector
    }

    pub fn snapshots(&self) -> &SnapshotManager {
        &self.snapshots
    }

    /// Syncs `path` with `remote_url`.
    ///
    /// The strategy is ignored when the working copy does not exist yet: the
    /// repository is cloned and the result reports `clone`. For an existing
    /// working copy a backup branch is always attempted before anything is
    /// mutated; a failed backup does not block the sync.
    ///
    /// `Reset` fails without resetting when `fetch origin` fails, rather than
    /// resetting to a possibly stale `origin/<branch>`.
    pub fn sync(
        &self,
        path: &Path,
        name: &str,
        remote_url: &str,
        credential: &SecretString,
        strategy: Strategy,
    ) -> SyncResult {
        let status = self.inspector.inspect(path);
        let Some(state) = status.state else {
            return self.clone_repo(path, name, remote_url, credential);
        };

        match state.risk {
            Risk::High => log::warn!(
                "Syncing {} with {} risk: {}",
                name,
                state.risk,
                state.risk_reason
            ),
            _ => log::info!("Syncing {} ({} risk, {:?})", name, state.risk, strategy),
        }

        let snapshot = self.snapshots.snapshot(path);
        if snapshot.is_none() {
            log::warn!("Proceeding without backup branch for {}", name);
        }

        match self.apply(path, &state.branch, strategy) {
            Ok(()) => SyncResult::synced(strategy, snapshot),
            Err(diagnostic) => {
                let diagnostic = scrub_credential(&diagnostic, credential);
                log::warn!("Sync of {} failed: {}", name, diagnostic);
                SyncResult::sync_failed(strategy, &diagnostic, snapshot)
            }
        }
    }

    fn apply(&self, path: &Path, branch: &str, strategy: Strategy) -> Result<(), String> {
        match strategy {
            Strategy::Reset => {
                self.step(path, &["fetch", "origin"])?;
                let target = format!("origin/{}", branch);
                self.step(path, &["reset", "--hard", &target])
            }
            Strategy::Rebase => self.step(path, &["pull", "--rebase", "origin", branch]),
            Strategy::Pull => self.step(path, &["pull", "--no-rebase", "origin", branch]),
        }
    }

    /// Runs one mutating command; the error is the diagnostic text.
    fn step(&self, path: &Path, args: &[&str]) -> Result<(), String> {
        match self.runner.run(path, args) {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => Err(format_git_error(&output)),
            Err(failure) => Err(failure.to_string()),
        }
    }

    fn clone_repo(
        &self,
        path: &Path,
        name: &str,
        remote_url: &str,
        credential: &SecretString,
    ) -> SyncResult {
        let Some(target) = path.file_name().and_then(|n| n.to_str()) else {
            return SyncResult::clone_failed(&format!(
                "invalid target path '{}'",
                path.display()
            ));
        };
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        if let Err(e) = std::fs::create_dir_all(&parent) {
            return SyncResult::clone_failed(&format!(
                "could not create '{}': {}",
                parent.display(),
                e
            ));
        }

        log::info!(
            "Cloning {} from {} into {}",
            name,
            redact_repo_url(remote_url),
            path.display()
        );

        let auth_url = self.credentials.authenticated_url(remote_url, credential);
        match self.runner.run(&parent, &["clone", &auth_url, target]) {
            Ok(output) if output.success() => SyncResult::cloned(),
            Ok(output) => {
                let diagnostic = scrub_credential(&output.stderr, credential);
                log::warn!("Clone of {} failed: {}", name, diagnostic.trim());
                SyncResult::clone_failed(&diagnostic)
            }
            Err(failure) => SyncResult::clone_failed(&failure.to_string()),
        }
    }
}

/// Shorter secrets are only masked where they appear as URL userinfo;
/// replacing them everywhere would mangle ordinary words in the diagnostic.
const MIN_SCRUBBED_SECRET_LEN: usize = 8;

fn scrub_credential(text: &str, credential: &SecretString) -> String {
    let mut scrubbed = redact_urls_in(text);
    let secret = credential.expose_secret();
    let token = secret.split_once(':').map(|(_, token)| token);

    for part in std::iter::once(secret).chain(token) {
        if part.len() >= MIN_SCRUBBED_SECRET_LEN {
            scrubbed = scrub_secret(&scrubbed, part);
        }
    }
    scrubbed
}
