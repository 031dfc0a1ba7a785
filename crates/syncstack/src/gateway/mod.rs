//! Remote hosting API collaborator.
//!
//! The engine never calls the hosting API itself; these calls back the
//! account, repository listing and workflow commands of the CLI.

mod github;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;

use crate::error::GatewayResult;

pub use github::GitHubGateway;

/// Operations against a repository hosting service.
///
/// Listing and lookup calls return the service's JSON objects unchanged.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Returns the authenticated user when the token belongs to `username`
    /// (compared case-insensitively).
    async fn validate(&self, username: &str, token: &SecretString) -> GatewayResult<Value>;

    /// Repositories of the authenticated user, most recently updated first.
    async fn list_repos(&self, token: &SecretString) -> GatewayResult<Vec<Value>>;

    async fn search_repos(&self, token: &SecretString, query: &str) -> GatewayResult<Vec<Value>>;

    async fn create_repo(
        &self,
        token: &SecretString,
        name: &str,
        description: Option<&str>,
        private: bool,
    ) -> GatewayResult<Value>;

    /// Workflows of `repo` (`owner/name`).
    async fn list_workflows(&self, token: &SecretString, repo: &str) -> GatewayResult<Vec<Value>>;

    async fn list_workflow_runs(&self, token: &SecretString, repo: &str)
        -> GatewayResult<Vec<Value>>;

    /// Dispatches `workflow` (id or file name) on `git_ref`.
    async fn trigger_workflow(
        &self,
        token: &SecretString,
        repo: &str,
        workflow: &str,
        git_ref: &str,
    ) -> GatewayResult<()>;
}
