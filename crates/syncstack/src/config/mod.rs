pub mod loader;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::credentials::CredentialHostRule;

pub use loader::{default_config_path, load_config, load_config_from_str, resolve_config};

/// Engine settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Root under which batch clones land as `<root>/<owner>/<repo>`.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Backup branches are named `<prefix>-backup-<timestamp>`.
    #[serde(default = "default_snapshot_prefix")]
    pub snapshot_prefix: String,

    /// Commits included in the detailed status.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default = "default_git_binary")]
    pub git_binary: String,

    /// Concurrent syncs in a batch. `1` syncs sequentially.
    #[serde(default = "default_batch_parallelism")]
    pub batch_parallelism: usize,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Timeout applied to every remote API call.
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,

    #[serde(default)]
    pub credential_hosts: Vec<CredentialHostRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            snapshot_prefix: default_snapshot_prefix(),
            history_limit: default_history_limit(),
            git_binary: default_git_binary(),
            batch_parallelism: default_batch_parallelism(),
            api_base_url: default_api_base_url(),
            api_timeout_secs: default_api_timeout_secs(),
            credential_hosts: Vec::new(),
        }
    }
}

fn default_workspace_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".gh-sync-data")
}

fn default_snapshot_prefix() -> String {
    "gh-sync".to_string()
}

fn default_history_limit() -> usize {
    10
}

fn default_git_binary() -> String {
    "git".to_string()
}

fn default_batch_parallelism() -> usize {
    1
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_api_timeout_secs() -> u64 {
    10
}
