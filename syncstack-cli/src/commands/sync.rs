use std::path::Path;

use secrecy::SecretString;
use serde_json::Value;

use syncstack::{parse_repo_list, Strategy, SyncEngine};

use super::{to_json, ApiResponse};

/// Prints the bare [`SyncResult`](syncstack::SyncResult).
pub fn sync(
    engine: &SyncEngine,
    path: &Path,
    name: &str,
    url: &str,
    credential: String,
    strategy: &str,
) -> Value {
    let credential = SecretString::from(credential);
    let result = engine.sync(path, name, url, &credential, Strategy::from_token(strategy));
    to_json(&result)
}

/// `{"success": true, "results": [{"repo", "result"}]}`. Only a malformed
/// repository list fails the whole command.
pub fn batch_sync(engine: &SyncEngine, credential: String, repos_json: &str, strategy: &str) -> Value {
    let repos = match parse_repo_list(repos_json) {
        Ok(repos) => repos,
        Err(e) => return ApiResponse::<()>::err(e.to_string()).into_json(),
    };

    log::info!(
        "Batch sync of {} repositories into {}",
        repos.len(),
        engine.workspace_root().display()
    );

    let credential = SecretString::from(credential);
    let batch = engine.batch_sync(&credential, &repos, Strategy::from_token(strategy));
    ApiResponse::ok(batch).into_json()
}
