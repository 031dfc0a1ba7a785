use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use syncstack::SyncEngine;

use super::{to_json, ApiResponse};

#[derive(Debug, Serialize)]
pub struct FileDiff {
    pub file: String,
    pub diff: String,
}

/// Prints the bare status report; `{"exists": false}` for a non-repository.
pub fn get_status(engine: &SyncEngine, path: &Path) -> Value {
    to_json(&engine.status(path))
}

pub fn get_detailed_status(engine: &SyncEngine, path: &Path) -> Value {
    ApiResponse::from(engine.detailed_status(path)).into_json()
}

pub fn get_file_diff(engine: &SyncEngine, path: &Path, file: &str) -> Value {
    let response: ApiResponse<FileDiff> = engine
        .file_diff(path, file)
        .map(|diff| FileDiff {
            file: file.to_string(),
            diff,
        })
        .into();
    response.into_json()
}
