use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use syncstack::{RepoRecord, SyncEngine};

use super::ApiResponse;

#[derive(Debug, Serialize)]
pub struct ScanResult {
    pub repos: Vec<RepoRecord>,
}

pub fn scan_local(engine: &SyncEngine, path: &Path, depth: usize) -> Value {
    let response: ApiResponse<ScanResult> = engine
        .scan(path, depth)
        .map(|repos| ScanResult { repos })
        .into();
    response.into_json()
}
