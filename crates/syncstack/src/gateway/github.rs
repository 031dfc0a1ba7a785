use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use url::Url;

use super::RemoteGateway;
use crate::config::EngineConfig;
use crate::error::{GatewayError, GatewayResult};

const ACCEPT_JSON: &str = "application/vnd.github.v3+json";

const AGENT: &str = concat!("syncstack/", env!("CARGO_PKG_VERSION"));

/// Error bodies are cut to this many characters before they reach a message.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Runs listed in `list_workflow_runs`.
const WORKFLOW_RUNS_PAGE: &str = "20";

/// [`RemoteGateway`] backed by the GitHub REST API.
pub struct GitHubGateway {
    client: Client,
    base_url: Url,
}

impl GitHubGateway {
    pub fn new(base_url: &str, timeout: Duration) -> GatewayResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GatewayError::InvalidRequest(format!("invalid API base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidRequest(format!(
                "invalid API base URL: {}",
                base_url
            )));
        }

        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &EngineConfig) -> GatewayResult<Self> {
        Self::new(
            &config.api_base_url,
            Duration::from_secs(config.api_timeout_secs),
        )
    }

    /// API URL for the given path segments; segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url, token: &SecretString) -> RequestBuilder {
        debug!("{} {}", method, url);
        self.client
            .request(method, url)
            .header(AUTHORIZATION, format!("token {}", token.expose_secret()))
            .header(ACCEPT, ACCEPT_JSON)
            .header(USER_AGENT, AGENT)
    }

    async fn get_json(&self, url: Url, token: &SecretString) -> GatewayResult<Value> {
        let response = self.request(Method::GET, url, token).send().await?;
        read_json(response).await
    }
}

#[async_trait]
impl RemoteGateway for GitHubGateway {
    async fn validate(&self, username: &str, token: &SecretString) -> GatewayResult<Value> {
        let user = match self.get_json(self.endpoint(&["user"]), token).await {
            Ok(user) => user,
            Err(GatewayError::Status { status, .. }) => {
                debug!("Token validation rejected with status {}", status);
                return Err(mismatch());
            }
            Err(e) => return Err(e),
        };

        let login = user.get("login").and_then(Value::as_str).unwrap_or_default();
        if login.eq_ignore_ascii_case(username) {
            Ok(user)
        } else {
            Err(mismatch())
        }
    }

    async fn list_repos(&self, token: &SecretString) -> GatewayResult<Vec<Value>> {
        let mut url = self.endpoint(&["user", "repos"]);
        url.query_pairs_mut()
            .append_pair("per_page", "100")
            .append_pair("sort", "updated");
        let body = self.get_json(url, token).await?;
        into_array(body, None)
    }

    async fn search_repos(&self, token: &SecretString, query: &str) -> GatewayResult<Vec<Value>> {
        let mut url = self.endpoint(&["search", "repositories"]);
        url.query_pairs_mut().append_pair("q", query);
        let body = self.get_json(url, token).await?;
        into_array(body, Some("items"))
    }

    async fn create_repo(
        &self,
        token: &SecretString,
        name: &str,
        description: Option<&str>,
        private: bool,
    ) -> GatewayResult<Value> {
        if name.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "repository name must not be empty".to_string(),
            ));
        }

        let body = json!({
            "name": name,
            "description": description.unwrap_or_default(),
            "private": private,
        });
        let response = self
            .request(Method::POST, self.endpoint(&["user", "repos"]), token)
            .json(&body)
            .send()
            .await?;
        read_json(response).await
    }

    async fn list_workflows(&self, token: &SecretString, repo: &str) -> GatewayResult<Vec<Value>> {
        let (owner, name) = split_repo(repo)?;
        let url = self.endpoint(&["repos", owner, name, "actions", "workflows"]);
        let body = self.get_json(url, token).await?;
        into_array(body, Some("workflows"))
    }

    async fn list_workflow_runs(
        &self,
        token: &SecretString,
        repo: &str,
    ) -> GatewayResult<Vec<Value>> {
        let (owner, name) = split_repo(repo)?;
        let mut url = self.endpoint(&["repos", owner, name, "actions", "runs"]);
        url.query_pairs_mut()
            .append_pair("per_page", WORKFLOW_RUNS_PAGE);
        let body = self.get_json(url, token).await?;
        into_array(body, Some("workflow_runs"))
    }

    async fn trigger_workflow(
        &self,
        token: &SecretString,
        repo: &str,
        workflow: &str,
        git_ref: &str,
    ) -> GatewayResult<()> {
        let (owner, name) = split_repo(repo)?;
        if workflow.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "workflow must not be empty".to_string(),
            ));
        }

        let url = self.endpoint(&[
            "repos", owner, name, "actions", "workflows", workflow, "dispatches",
        ]);
        let response = self
            .request(Method::POST, url, token)
            .json(&json!({ "ref": git_ref }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(status.as_u16(), response).await)
        }
    }
}

fn mismatch() -> GatewayError {
    GatewayError::Rejected("Invalid token or username mismatch".to_string())
}

/// Splits `owner/name`, rejecting anything else.
fn split_repo(repo: &str) -> GatewayResult<(&str, &str)> {
    match repo.split_once('/') {
        Some((owner, name))
            if !owner.is_empty()
                && !name.is_empty()
                && !name.contains('/')
                && owner != ".."
                && name != ".." =>
        {
            Ok((owner, name))
        }
        _ => Err(GatewayError::InvalidRequest(format!(
            "expected 'owner/name', got '{}'",
            repo
        ))),
    }
}

async fn read_json(response: Response) -> GatewayResult<Value> {
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status.as_u16(), response).await);
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| GatewayError::Decode(e.to_string()))
}

async fn status_error(status: u16, response: Response) -> GatewayError {
    let body = response.text().await.unwrap_or_default();
    warn!("API request failed with status {}", status);
    GatewayError::Status {
        status,
        message: truncate_body(&body),
    }
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LENGTH {
        let cut: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated)", cut)
    } else {
        body.to_string()
    }
}

/// Takes the array at `field`, or the body itself when `field` is `None`.
fn into_array(body: Value, field: Option<&str>) -> GatewayResult<Vec<Value>> {
    let value = match field {
        Some(field) => body.get(field).cloned().unwrap_or(Value::Null),
        None => body,
    };

    match value {
        Value::Array(items) => Ok(items),
        other => Err(GatewayError::Decode(format!(
            "expected an array{}, got {}",
            field.map(|f| format!(" in '{}'", f)).unwrap_or_default(),
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
