//! Engine error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while inspecting or mutating a working copy.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Git could not be started: {0}")]
    GitUnavailable(String),

    #[error("Git operation failed: {0}")]
    GitOperation(String),

    #[error("Git network error: {0}")]
    GitNetworkError(String),

    #[error("Git authentication failed: {0}")]
    GitAuthFailed(String),

    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("Path traversal detected: {0}")]
    PathTraversal(String),

    #[error("Invalid repository list: {0}")]
    InvalidRepoList(String),

    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Errors from the remote hosting API.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected API response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Rejected(String),
}

/// Classifies a git stderr string into a more specific error variant.
pub fn classify_git_error(stderr: &str) -> SyncError {
    let lower = stderr.to_lowercase();

    if lower.contains("could not resolve host")
        || lower.contains("connection refused")
        || lower.contains("connection timed out")
        || lower.contains("network is unreachable")
        || lower.contains("unable to access")
        || lower.contains("failed to connect")
        || lower.contains("couldn't connect to server")
        || lower.contains("the remote end hung up unexpectedly")
    {
        return SyncError::GitNetworkError(stderr.trim().to_string());
    }

    if lower.contains("authentication failed")
        || lower.contains("permission denied")
        || lower.contains("invalid credentials")
        || lower.contains("could not read username")
    {
        return SyncError::GitAuthFailed(stderr.trim().to_string());
    }

    SyncError::GitOperation(stderr.trim().to_string())
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Result type for remote API calls.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
