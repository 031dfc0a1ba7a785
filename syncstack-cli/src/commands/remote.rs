//! Hosting API pass-throughs.

use std::future::Future;

use secrecy::SecretString;
use serde::Serialize;
use serde_json::Value;

use syncstack::{EngineConfig, GatewayError, GitHubGateway, RemoteGateway};

use super::ApiResponse;

#[derive(Debug, Serialize)]
pub struct User {
    pub user: Value,
}

#[derive(Debug, Serialize)]
pub struct Repos {
    pub repos: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct CreatedRepo {
    pub repo: Value,
}

#[derive(Debug, Serialize)]
pub struct Workflows {
    pub workflows: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct WorkflowRuns {
    pub workflow_runs: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct Dispatched {
    pub workflow: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
}

/// Runs one gateway call on a current-thread runtime.
fn call<T, F, Fut>(config: &EngineConfig, f: F) -> ApiResponse<T>
where
    T: Serialize,
    F: FnOnce(GitHubGateway) -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let gateway = match GitHubGateway::from_config(config) {
        Ok(gateway) => gateway,
        Err(e) => return ApiResponse::err(e.to_string()),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => return ApiResponse::err(format!("Failed to start runtime: {}", e)),
    };

    runtime.block_on(f(gateway)).into()
}

pub fn validate(config: &EngineConfig, username: &str, token: String) -> Value {
    let token = SecretString::from(token);
    call(config, |gw| async move {
        gw.validate(username, &token).await.map(|user| User { user })
    })
    .into_json()
}

pub fn get_repos(config: &EngineConfig, token: String) -> Value {
    let token = SecretString::from(token);
    call(config, |gw| async move {
        gw.list_repos(&token).await.map(|repos| Repos { repos })
    })
    .into_json()
}

pub fn search_repos(config: &EngineConfig, token: String, query: &str) -> Value {
    let token = SecretString::from(token);
    call(config, |gw| async move {
        gw.search_repos(&token, query).await.map(|repos| Repos { repos })
    })
    .into_json()
}

pub fn create_repo(
    config: &EngineConfig,
    token: String,
    name: &str,
    description: Option<&str>,
    private: bool,
) -> Value {
    let token = SecretString::from(token);
    call(config, |gw| async move {
        gw.create_repo(&token, name, description, private)
            .await
            .map(|repo| CreatedRepo { repo })
    })
    .into_json()
}

pub fn list_workflows(config: &EngineConfig, token: String, repo: &str) -> Value {
    let token = SecretString::from(token);
    call(config, |gw| async move {
        gw.list_workflows(&token, repo)
            .await
            .map(|workflows| Workflows { workflows })
    })
    .into_json()
}

pub fn list_workflow_runs(config: &EngineConfig, token: String, repo: &str) -> Value {
    let token = SecretString::from(token);
    call(config, |gw| async move {
        gw.list_workflow_runs(&token, repo)
            .await
            .map(|workflow_runs| WorkflowRuns { workflow_runs })
    })
    .into_json()
}

pub fn trigger_workflow(
    config: &EngineConfig,
    token: String,
    repo: &str,
    workflow: &str,
    git_ref: &str,
) -> Value {
    let token = SecretString::from(token);
    call(config, |gw| async move {
        gw.trigger_workflow(&token, repo, workflow, git_ref)
            .await
            .map(|()| Dispatched {
                workflow: workflow.to_string(),
                git_ref: git_ref.to_string(),
            })
    })
    .into_json()
}
