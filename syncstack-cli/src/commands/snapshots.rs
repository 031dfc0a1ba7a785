use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use syncstack::{SnapshotInfo, SnapshotRef, SyncEngine};

use super::ApiResponse;

#[derive(Debug, Serialize)]
pub struct Snapshots {
    pub snapshots: Vec<SnapshotInfo>,
}

#[derive(Debug, Serialize)]
pub struct Restored {
    pub restored: String,
    /// Backup of the state that was replaced, if one could be taken.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotRef>,
}

pub fn list_snapshots(engine: &SyncEngine, path: &Path) -> Value {
    let response: ApiResponse<Snapshots> = engine
        .list_snapshots(path)
        .map(|snapshots| Snapshots { snapshots })
        .into();
    response.into_json()
}

pub fn restore_snapshot(engine: &SyncEngine, path: &Path, branch: &str) -> Value {
    let response: ApiResponse<Restored> = engine
        .restore_snapshot(path, branch)
        .map(|snapshot| Restored {
            restored: branch.to_string(),
            snapshot,
        })
        .into();
    response.into_json()
}
