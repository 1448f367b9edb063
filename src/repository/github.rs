//! GitHub REST API implementation of [`GitHost`].

use super::{
    Artifact, CommitObject, GitHost, Job, NewTreeEntry, PutContents, RemoteFile,
    RepositoryCredentials, TreeObject, WorkflowRun,
};
use crate::error::ApiError;
use crate::generator::Encoding;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::StreamExt;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const API_VERSION: &str = "2022-11-28";

/// HTTP client settings. Every request carries both deadlines.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub api_base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            user_agent: format!("apkforge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// GitHub REST v3 client bound to one repository.
pub struct GitHubApi {
    client: Client,
    credentials: RepositoryCredentials,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    documentation_url: Option<String>,
}

#[derive(Deserialize)]
struct ShaOnly {
    sha: String,
}

#[derive(Deserialize)]
struct RefResponse {
    object: ShaOnly,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
    tree: ShaOnly,
}

#[derive(Deserialize)]
struct TreeResponse {
    sha: String,
    #[serde(default)]
    tree: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct RunsResponse {
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Deserialize)]
struct JobsResponse {
    jobs: Vec<Job>,
}

#[derive(Deserialize)]
struct ArtifactsResponse {
    artifacts: Vec<Artifact>,
}

fn map_http_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Transport(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ApiError::Transport(format!("Connection error: {}", error))
    } else if error.is_decode() {
        ApiError::Decode(error.to_string())
    } else {
        ApiError::Transport(format!("HTTP error: {}", error))
    }
}

/// Normalize a non-2xx response into an [`ApiError`].
async fn error_from_response(response: Response, what: &str) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed: Option<ErrorBody> = serde_json::from_str(&body).ok();
    let message = parsed
        .as_ref()
        .and_then(|b| b.message.clone())
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body.clone()
            }
        });
    match status {
        StatusCode::NOT_FOUND => ApiError::NotFound(what.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized {
            status: status.as_u16(),
            message,
        },
        _ => ApiError::Status {
            status: status.as_u16(),
            message,
            url: parsed.and_then(|b| b.documentation_url),
        },
    }
}

fn decode_base64_lenient(content: &str) -> Result<Vec<u8>, ApiError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| ApiError::Decode(format!("Invalid base64 content: {}", e)))
}

impl GitHubApi {
    pub fn new(credentials: RepositoryCredentials, settings: &HttpSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            credentials,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.base_url, self.credentials.owner, self.credentials.repo, path
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.repo_url(path))
            .bearer_auth(&self.credentials.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(map_http_error)?;
        debug!(status = response.status().as_u16(), url = %response.url(), "GitHub response");
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response, what).await)
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<T, ApiError> {
        self.send(builder, what)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(format!("{}: {}", what, e)))
    }
}

#[async_trait]
impl GitHost for GitHubApi {
    async fn verify_access(&self) -> Result<(), ApiError> {
        let what = format!("repository {}", self.credentials.slug());
        self.send(self.request(Method::GET, ""), &what).await?;
        Ok(())
    }

    async fn get_ref(&self, branch: &str) -> Result<String, ApiError> {
        let what = format!("branch {}", branch);
        let response: RefResponse = self
            .send_json(
                self.request(Method::GET, &format!("/git/ref/heads/{}", branch)),
                &what,
            )
            .await?;
        Ok(response.object.sha)
    }

    async fn get_commit(&self, sha: &str) -> Result<CommitObject, ApiError> {
        let response: CommitResponse = self
            .send_json(
                self.request(Method::GET, &format!("/git/commits/{}", sha)),
                &format!("commit {}", sha),
            )
            .await?;
        Ok(CommitObject {
            sha: response.sha,
            tree_sha: response.tree.sha,
        })
    }

    async fn get_tree(&self, sha: &str) -> Result<TreeObject, ApiError> {
        let response: TreeResponse = self
            .send_json(
                self.request(Method::GET, &format!("/git/trees/{}", sha)),
                &format!("tree {}", sha),
            )
            .await?;
        Ok(TreeObject {
            sha: response.sha,
            entry_count: response.tree.len(),
        })
    }

    async fn create_blob(&self, content: &str, encoding: Encoding) -> Result<String, ApiError> {
        let encoding = match encoding {
            Encoding::Plain => "utf-8",
            Encoding::Base64 => "base64",
        };
        let response: ShaOnly = self
            .send_json(
                self.request(Method::POST, "/git/blobs")
                    .json(&json!({ "content": content, "encoding": encoding })),
                "blob",
            )
            .await?;
        Ok(response.sha)
    }

    async fn create_tree(
        &self,
        base_tree: &str,
        entries: &[NewTreeEntry],
    ) -> Result<String, ApiError> {
        let response: ShaOnly = self
            .send_json(
                self.request(Method::POST, "/git/trees")
                    .json(&json!({ "base_tree": base_tree, "tree": entries })),
                "tree",
            )
            .await?;
        Ok(response.sha)
    }

    async fn create_commit(
        &self,
        message: &str,
        tree: &str,
        parents: &[String],
    ) -> Result<String, ApiError> {
        let response: ShaOnly = self
            .send_json(
                self.request(Method::POST, "/git/commits").json(&json!({
                    "message": message,
                    "tree": tree,
                    "parents": parents,
                })),
                "commit",
            )
            .await?;
        Ok(response.sha)
    }

    async fn update_ref(&self, branch: &str, sha: &str, force: bool) -> Result<(), ApiError> {
        self.send(
            self.request(Method::PATCH, &format!("/git/refs/heads/{}", branch))
                .json(&json!({ "sha": sha, "force": force })),
            &format!("branch {}", branch),
        )
        .await?;
        Ok(())
    }

    async fn get_contents(
        &self,
        path: &str,
        branch: &str,
    ) -> Result<Option<RemoteFile>, ApiError> {
        let result: Result<ContentsResponse, ApiError> = self
            .send_json(
                self.request(Method::GET, &format!("/contents/{}", path))
                    .query(&[("ref", branch)]),
                path,
            )
            .await;
        match result {
            Ok(response) => Ok(Some(RemoteFile {
                sha: response.sha,
                content: decode_base64_lenient(&response.content)?,
            })),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put_contents(&self, request: &PutContents<'_>) -> Result<(), ApiError> {
        let mut body = json!({
            "message": request.message,
            "content": STANDARD.encode(request.content),
            "branch": request.branch,
        });
        if let Some(sha) = request.sha {
            body["sha"] = json!(sha);
        }
        self.send(
            self.request(Method::PUT, &format!("/contents/{}", request.path))
                .json(&body),
            request.path,
        )
        .await?;
        Ok(())
    }

    async fn dispatch_workflow(&self, workflow: &str, branch: &str) -> Result<(), ApiError> {
        self.send(
            self.request(
                Method::POST,
                &format!("/actions/workflows/{}/dispatches", workflow),
            )
            .json(&json!({ "ref": branch })),
            &format!("workflow {}", workflow),
        )
        .await?;
        Ok(())
    }

    async fn latest_runs(
        &self,
        workflow: &str,
        branch: &str,
    ) -> Result<Vec<WorkflowRun>, ApiError> {
        let response: RunsResponse = self
            .send_json(
                self.request(Method::GET, &format!("/actions/workflows/{}/runs", workflow))
                    .query(&[
                        ("branch", branch),
                        ("event", "workflow_dispatch"),
                        ("per_page", "1"),
                    ]),
                &format!("runs of {}", workflow),
            )
            .await?;
        Ok(response.workflow_runs)
    }

    async fn get_run(&self, run_id: u64) -> Result<WorkflowRun, ApiError> {
        self.send_json(
            self.request(Method::GET, &format!("/actions/runs/{}", run_id)),
            &format!("run {}", run_id),
        )
        .await
    }

    async fn list_jobs(&self, run_id: u64) -> Result<Vec<Job>, ApiError> {
        let response: JobsResponse = self
            .send_json(
                self.request(Method::GET, &format!("/actions/runs/{}/jobs", run_id)),
                &format!("jobs of run {}", run_id),
            )
            .await?;
        Ok(response.jobs)
    }

    async fn cancel_run(&self, run_id: u64) -> Result<(), ApiError> {
        self.send(
            self.request(Method::POST, &format!("/actions/runs/{}/cancel", run_id)),
            &format!("run {}", run_id),
        )
        .await?;
        Ok(())
    }

    async fn rerun(&self, run_id: u64) -> Result<(), ApiError> {
        self.send(
            self.request(Method::POST, &format!("/actions/runs/{}/rerun", run_id)),
            &format!("run {}", run_id),
        )
        .await?;
        Ok(())
    }

    async fn list_artifacts(&self, run_id: u64) -> Result<Vec<Artifact>, ApiError> {
        let response: ArtifactsResponse = self
            .send_json(
                self.request(Method::GET, &format!("/actions/runs/{}/artifacts", run_id)),
                &format!("artifacts of run {}", run_id),
            )
            .await?;
        Ok(response.artifacts)
    }

    async fn download_artifact(&self, artifact_id: u64) -> Result<Vec<u8>, ApiError> {
        let response = self
            .send(
                self.request(
                    Method::GET,
                    &format!("/actions/artifacts/{}/zip", artifact_id),
                ),
                &format!("artifact {}", artifact_id),
            )
            .await?;
        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            bytes.extend_from_slice(&chunk.map_err(map_http_error)?);
        }
        debug!(artifact_id, size = bytes.len(), "Artifact downloaded");
        Ok(bytes)
    }
}
