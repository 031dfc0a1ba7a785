//! Sync across many repositories with per-repository outcomes.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info, warn};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::info_span;

use super::sync::SyncExecutor;
use super::types::{BatchEntry, BatchResult, RepoRecord, Strategy, SyncResult};
use crate::error::{Result, SyncError};
use crate::sanitize::check_repo_name;

/// One repository of a batch request.
///
/// Accepts `fullName`/`full_name`/`name` and `cloneUrl`/`clone_url`/`url`,
/// preferring them in that order, so raw hosting API objects (which carry
/// both `name` and `full_name`) can be passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawRepoSpec")]
pub struct RepoSpec {
    pub full_name: String,
    pub clone_url: String,
}

#[derive(Deserialize)]
struct RawRepoSpec {
    #[serde(rename = "fullName")]
    full_name_camel: Option<String>,
    full_name: Option<String>,
    name: Option<String>,
    #[serde(rename = "cloneUrl")]
    clone_url_camel: Option<String>,
    clone_url: Option<String>,
    url: Option<String>,
}

impl TryFrom<RawRepoSpec> for RepoSpec {
    type Error = String;

    fn try_from(raw: RawRepoSpec) -> std::result::Result<Self, Self::Error> {
        let full_name = raw
            .full_name_camel
            .or(raw.full_name)
            .or(raw.name)
            .ok_or("missing field `fullName`")?;
        let clone_url = raw
            .clone_url_camel
            .or(raw.clone_url)
            .or(raw.url)
            .ok_or("missing field `cloneUrl`")?;

        Ok(Self {
            full_name,
            clone_url,
        })
    }
}

/// Parses a JSON array of [`RepoSpec`]s.
pub fn parse_repo_list(json: &str) -> Result<Vec<RepoSpec>> {
    serde_json::from_str(json).map_err(|e| SyncError::InvalidRepoList(e.to_string()))
}

/// A repository whose working-copy path has been resolved, or the reason it
/// could not be.
type Planned = std::result::Result<RepoRecord, String>;

struct Job<'a> {
    index: usize,
    record: &'a RepoRecord,
}

/// Runs [`SyncExecutor`] over a list of repositories.
///
/// The result always holds exactly one entry per input repository, in input
/// order, whatever happens to the individual syncs.
pub struct BatchOrchestrator {
    executor: Arc<SyncExecutor>,
    workspace_root: PathBuf,
    parallelism: usize,
}

impl BatchOrchestrator {
    pub fn new(executor: Arc<SyncExecutor>, workspace_root: impl Into<PathBuf>, parallelism: usize) -> Self {
        Self {
            executor,
            workspace_root: workspace_root.into(),
            parallelism: parallelism.max(1),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Working-copy path for a repository: `<workspace root>/<full name>`,
    /// always a directory strictly below the root.
    pub fn target_path(&self, full_name: &str) -> Result<PathBuf> {
        check_repo_name(full_name).map_err(SyncError::PathTraversal)?;
        Ok(self.workspace_root.join(full_name))
    }

    fn plan(&self, repos: &[RepoSpec]) -> Vec<Planned> {
        repos
            .iter()
            .map(|spec| {
                self.target_path(&spec.full_name)
                    .map(|local_path| RepoRecord {
                        name: spec.full_name.clone(),
                        local_path,
                        remote_url: spec.clone_url.clone(),
                    })
                    .map_err(|e| e.to_string())
            })
            .collect()
    }

    /// Syncs every repository with the same credential and strategy.
    pub fn batch_sync(
        &self,
        credential: &SecretString,
        repos: &[RepoSpec],
        strategy: Strategy,
    ) -> BatchResult {
        let planned = self.plan(repos);
        let runnable: Vec<Job<'_>> = planned
            .iter()
            .enumerate()
            .filter_map(|(index, plan)| plan.as_ref().ok().map(|record| Job { index, record }))
            .collect();

        let mut outcomes: Vec<Option<SyncResult>> = vec![None; planned.len()];

        if self.parallelism > 1 && runnable.len() > 1 && !has_duplicate_paths(&runnable) {
            self.run_parallel(credential, runnable, strategy, &mut outcomes);
        } else {
            if self.parallelism > 1 && has_duplicate_paths(&runnable) {
                warn!("Duplicate target paths in batch, syncing sequentially");
            }
            for job in runnable {
                outcomes[job.index] = Some(self.sync_one(credential, job.record, strategy));
            }
        }

        let results: Vec<BatchEntry> = repos
            .iter()
            .zip(planned)
            .zip(outcomes)
            .map(|((spec, plan), outcome)| {
                let result = match (plan, outcome) {
                    (Err(reason), _) => {
                        warn!("Skipping {}: {}", spec.full_name, reason);
                        SyncResult::rejected(strategy, &reason)
                    }
                    (Ok(_), Some(result)) => result,
                    (Ok(_), None) => SyncResult::rejected(strategy, "worker exited before reporting"),
                };
                BatchEntry {
                    repo: spec.full_name.clone(),
                    result,
                }
            })
            .collect();

        let batch = BatchResult { results };
        info!(
            "Batch sync finished: {}/{} succeeded",
            batch.succeeded(),
            batch.len()
        );
        batch
    }

    fn run_parallel(
        &self,
        credential: &SecretString,
        jobs: Vec<Job<'_>>,
        strategy: Strategy,
        outcomes: &mut [Option<SyncResult>],
    ) {
        let worker_count = self.parallelism.min(jobs.len());
        let (job_sender, job_receiver) = bounded::<Job<'_>>(worker_count * 2);
        let (result_sender, result_receiver) = bounded::<(usize, SyncResult)>(jobs.len());

        thread::scope(|scope| {
            for worker_id in 0..worker_count {
                let job_rx = job_receiver.clone();
                let result_tx = result_sender.clone();
                scope.spawn(move || self.run_worker(worker_id, job_rx, result_tx, credential, strategy));
            }
            drop(result_sender);

            info!("Started {} sync workers", worker_count);
            for job in jobs {
                if job_sender.send(job).is_err() {
                    error!("Sync workers stopped before all jobs were queued");
                    break;
                }
            }
            drop(job_sender);
        });

        for (index, result) in result_receiver.try_iter() {
            outcomes[index] = Some(result);
        }
    }

    fn run_worker(
        &self,
        worker_id: usize,
        job_receiver: Receiver<Job<'_>>,
        result_sender: Sender<(usize, SyncResult)>,
        credential: &SecretString,
        strategy: Strategy,
    ) {
        debug!("Sync worker {} started", worker_id);

        for job in job_receiver.iter() {
            let result = self.sync_one(credential, job.record, strategy);
            if let Err(e) = result_sender.send((job.index, result)) {
                error!("Sync worker {} failed to send result: {}", worker_id, e);
                break;
            }
        }

        debug!("Sync worker {} stopped", worker_id);
    }

    /// Syncs one repository; a panic becomes a failed result.
    fn sync_one(&self, credential: &SecretString, record: &RepoRecord, strategy: Strategy) -> SyncResult {
        let _span = info_span!("sync_repo", repo = %record.name).entered();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.executor.sync(
                &record.local_path,
                &record.name,
                &record.remote_url,
                credential,
                strategy,
            )
        }));

        match outcome {
            Ok(result) => result,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!("Sync of {} panicked: {}", record.name, reason);
                SyncResult::sync_failed(strategy, &format!("internal error: {}", reason), None)
            }
        }
    }
}

fn has_duplicate_paths(jobs: &[Job<'_>]) -> bool {
    let mut seen = HashSet::new();
    jobs.iter().any(|job| !seen.insert(job.record.local_path.as_path()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
