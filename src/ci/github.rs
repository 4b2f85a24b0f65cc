//! ci::github
//!
//! GitHub implementation of the CI provider using the REST API.
//!
//! # Design
//!
//! Two endpoints are used:
//! - `GET /repos/{owner}/{repo}/actions/runs` filtered by head SHA and
//!   triggering event, for the workflow watcher
//! - `POST /repos/{owner}/{repo}/releases`, for the release step
//!
//! # Authentication
//!
//! A static bearer token, read from `CONVOY_TOKEN` (preferred) or
//! `GITHUB_TOKEN`. There is no refresh flow; publishes are short-lived
//! compared to token lifetimes.
//!
//! # Rate Limiting
//!
//! GitHub has rate limits. This implementation returns
//! `CiError::RateLimited` when limits are hit and does not retry; the
//! polling cadence in the watcher stays far below the documented limits.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use async_trait::async_trait;

use super::traits::{
    CiError, CiProvider, CreateReleaseRequest, Release, RunStatus, WorkflowEvent, WorkflowRun,
};

/// Default GitHub API base URL.
const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "convoy-cli";

/// Environment variables consulted for the bearer token, in order.
const TOKEN_VARS: [&str; 2] = ["CONVOY_TOKEN", "GITHUB_TOKEN"];

/// GitHub CI provider.
pub struct GitHubCi {
    /// HTTP client for making requests
    client: Client,
    /// Static bearer token
    token: String,
    /// Repository owner (the configured organization)
    owner: String,
    /// API base URL (configurable for GitHub Enterprise and for tests)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubCi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubCi")
            .field("owner", &self.owner)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubCi {
    /// Create a provider with an explicit token.
    pub fn new(token: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            owner: owner.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Create a provider with a custom API base URL.
    ///
    /// Use this for GitHub Enterprise installations; tests use it to point
    /// the client at a local mock server.
    pub fn with_api_base(
        token: impl Into<String>,
        owner: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            owner: owner.into(),
            api_base: api_base.into(),
        }
    }

    /// Create a provider with the token from the environment.
    ///
    /// # Errors
    ///
    /// `CiError::AuthRequired` if neither `CONVOY_TOKEN` nor `GITHUB_TOKEN`
    /// is set to a non-empty value.
    pub fn from_env(owner: impl Into<String>) -> Result<Self, CiError> {
        let token = env_token().ok_or(CiError::AuthRequired)?;
        Ok(Self::new(token, owner))
    }

    /// Get the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, CiError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| CiError::AuthFailed("token contains invalid header characters".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, repo: &str, path: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.api_base, self.owner, repo, path)
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, CiError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| CiError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            self.handle_error_response(response, status).await
        }
    }

    /// Handle an error response from the API.
    async fn handle_error_response<T>(
        &self,
        response: Response,
        status: StatusCode,
    ) -> Result<T, CiError> {
        let (message, codes) = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => {
                let codes: Vec<String> = err.errors.into_iter().map(|e| e.code).collect();
                (err.message, codes)
            }
            Err(_) => ("Unknown error".to_string(), Vec::new()),
        };

        Err(match status {
            StatusCode::UNAUTHORIZED => CiError::AuthFailed("invalid or expired token".into()),
            StatusCode::FORBIDDEN => CiError::AuthFailed(format!("permission denied: {message}")),
            StatusCode::NOT_FOUND => CiError::NotFound(message),
            StatusCode::UNPROCESSABLE_ENTITY if codes.iter().any(|c| c == "already_exists") => {
                CiError::AlreadyExists(message)
            }
            StatusCode::UNPROCESSABLE_ENTITY => CiError::ApiError {
                status: status.as_u16(),
                message,
            },
            StatusCode::TOO_MANY_REQUESTS => CiError::RateLimited,
            _ if status.is_server_error() => CiError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => CiError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl CiProvider for GitHubCi {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn runs_for_commit(
        &self,
        repo: &str,
        sha: &str,
        event: WorkflowEvent,
    ) -> Result<Vec<WorkflowRun>, CiError> {
        let url = self.repo_url(repo, "actions/runs");

        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .query(&[("head_sha", sha), ("event", event.api_name())])
            .send()
            .await
            .map_err(|e| CiError::NetworkError(e.to_string()))?;

        let runs: RunsResponse = self.handle_response(response).await?;
        Ok(runs.workflow_runs.into_iter().map(Into::into).collect())
    }

    async fn create_release(
        &self,
        repo: &str,
        request: CreateReleaseRequest,
    ) -> Result<Release, CiError> {
        let url = self.repo_url(repo, "releases");

        let body = CreateReleaseBody {
            tag_name: &request.tag,
            name: &request.name,
            prerelease: request.prerelease,
        };

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| CiError::NetworkError(e.to_string()))?;

        let release: GitHubRelease = self.handle_response(response).await?;
        Ok(Release {
            id: release.id,
            url: release.html_url,
        })
    }
}

/// The first non-empty token among the supported environment variables.
fn env_token() -> Option<String> {
    TOKEN_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|token| !token.is_empty())
}

// ===== wire types =====

#[derive(Serialize)]
struct CreateReleaseBody<'a> {
    tag_name: &'a str,
    name: &'a str,
    prerelease: bool,
}

#[derive(Deserialize)]
struct GitHubRelease {
    id: u64,
    html_url: String,
}

#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
    #[serde(default)]
    errors: Vec<GitHubErrorDetail>,
}

#[derive(Deserialize)]
struct GitHubErrorDetail {
    #[serde(default)]
    code: String,
}

#[derive(Deserialize)]
struct RunsResponse {
    workflow_runs: Vec<GitHubRun>,
}

#[derive(Deserialize)]
struct GitHubRun {
    id: u64,
    status: String,
    conclusion: Option<String>,
}

impl From<GitHubRun> for WorkflowRun {
    fn from(run: GitHubRun) -> Self {
        WorkflowRun {
            id: run.id,
            status: parse_run_status(&run.status),
            conclusion: run.conclusion,
        }
    }
}

/// Map GitHub's run status strings onto the lifecycle states the watcher
/// cares about. Anything that is neither waiting nor completed counts as
/// in progress.
fn parse_run_status(status: &str) -> RunStatus {
    match status {
        "completed" => RunStatus::Completed,
        "queued" | "waiting" | "requested" | "pending" => RunStatus::Queued,
        _ => RunStatus::InProgress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_url_includes_owner_and_repo() {
        let ci = GitHubCi::new("token", "acme");
        assert_eq!(
            ci.repo_url("core", "actions/runs"),
            "https://api.github.com/repos/acme/core/actions/runs"
        );
    }

    #[test]
    fn custom_api_base_is_used() {
        let ci = GitHubCi::with_api_base("token", "acme", "http://localhost:9999");
        assert_eq!(
            ci.repo_url("core", "releases"),
            "http://localhost:9999/repos/acme/core/releases"
        );
    }

    #[test]
    fn debug_does_not_expose_the_token() {
        let ci = GitHubCi::new("ghp_secret", "acme");
        let formatted = format!("{:?}", ci);
        assert!(!formatted.contains("ghp_secret"));
        assert!(formatted.contains("acme"));
    }

    #[test]
    fn run_status_strings_map_to_lifecycle_states() {
        assert_eq!(parse_run_status("completed"), RunStatus::Completed);
        assert_eq!(parse_run_status("queued"), RunStatus::Queued);
        assert_eq!(parse_run_status("waiting"), RunStatus::Queued);
        assert_eq!(parse_run_status("in_progress"), RunStatus::InProgress);
        assert_eq!(parse_run_status("anything_else"), RunStatus::InProgress);
    }

    #[test]
    fn run_payload_deserializes() {
        let json = r#"{
            "total_count": 1,
            "workflow_runs": [
                {"id": 42, "status": "completed", "conclusion": "success", "head_sha": "abc"}
            ]
        }"#;
        let parsed: RunsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.workflow_runs.len(), 1);
        let run: WorkflowRun = parsed.workflow_runs.into_iter().next().unwrap().into();
        assert_eq!(run, WorkflowRun::completed(42, "success"));
    }
}
