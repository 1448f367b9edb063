//! Repository Client
//!
//! Git hosting and CI access. [`GitHost`] is the seam: one primitive REST call per method,
//! implemented against the GitHub REST API by [`GitHubApi`]. [`RepositoryClient`] composes the
//! primitives into the higher-level operations the build pipeline needs (tree-based commit,
//! idempotent workflow push, bounded run discovery).

use crate::error::ApiError;
use crate::generator::Encoding;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod client;
pub mod github;

pub use client::{CommitOutcome, RepositoryClient, RunDiscovery, WorkflowPush};
pub use github::{GitHubApi, HttpSettings};

/// Immutable access credentials for one repository.
///
/// Supplied by the caller; never persisted by this crate.
#[derive(Clone, PartialEq, Eq)]
pub struct RepositoryCredentials {
    pub owner: String,
    pub repo: String,
    pub token: String,
    pub branch: String,
}

impl RepositoryCredentials {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            token: token.into(),
            branch: branch.into(),
        }
    }

    /// Local shape check; says nothing about whether the host accepts the token.
    pub fn validate(&self) -> Result<(), String> {
        if self.token.trim().is_empty() {
            return Err("token is empty".to_string());
        }
        if self.owner.trim().is_empty() || self.repo.trim().is_empty() {
            return Err("repository owner and name are required".to_string());
        }
        if self.branch.trim().is_empty() {
            return Err("branch is empty".to_string());
        }
        if self.token.chars().any(char::is_whitespace) {
            return Err("token contains whitespace".to_string());
        }
        Ok(())
    }

    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Debug for RepositoryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryCredentials")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("token", &"<redacted>")
            .field("branch", &self.branch)
            .finish()
    }
}

/// Run lifecycle as reported by the host. Transitional states (`waiting`, `requested`,
/// `pending`) collapse into `Queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    Completed,
    #[serde(other)]
    Queued,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Queued => "queued",
        }
    }
}

/// Terminal verdict of a run. Anything other than success or cancellation counts as failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunConclusion {
    Success,
    Cancelled,
    #[serde(other)]
    Failure,
}

impl RunConclusion {
    pub fn as_str(self) -> &'static str {
        match self {
            RunConclusion::Success => "success",
            RunConclusion::Cancelled => "cancelled",
            RunConclusion::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub status: RunStatus,
    #[serde(default)]
    pub conclusion: Option<RunConclusion>,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub jobs_url: Option<String>,
    #[serde(default)]
    pub run_attempt: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub name: String,
    pub status: RunStatus,
    #[serde(default)]
    pub conclusion: Option<RunConclusion>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub status: RunStatus,
    #[serde(default)]
    pub conclusion: Option<RunConclusion>,
    #[serde(default)]
    pub number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub size_in_bytes: u64,
    #[serde(default)]
    pub expired: bool,
}

/// A downloaded artifact archive and the file name suggested for saving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDownload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitObject {
    pub sha: String,
    pub tree_sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeObject {
    pub sha: String,
    pub entry_count: usize,
}

/// Blob entry for a new tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTreeEntry {
    pub path: String,
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub sha: String,
}

impl NewTreeEntry {
    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: "100644",
            kind: "blob",
            sha: sha.into(),
        }
    }
}

/// File fetched through the contents endpoint, content already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub sha: String,
    pub content: Vec<u8>,
}

/// Create-or-update request for the contents endpoint.
#[derive(Debug, Clone)]
pub struct PutContents<'a> {
    pub path: &'a str,
    pub content: &'a [u8],
    pub message: &'a str,
    pub branch: &'a str,
    /// Revision being replaced; `None` creates the file
    pub sha: Option<&'a str>,
}

/// Primitive git hosting and CI calls, one REST request each.
#[async_trait]
pub trait GitHost: Send + Sync {
    /// Read-only check confirming the credentials can see the repository.
    async fn verify_access(&self) -> Result<(), ApiError>;

    /// Commit sha the branch points at.
    async fn get_ref(&self, branch: &str) -> Result<String, ApiError>;
    async fn get_commit(&self, sha: &str) -> Result<CommitObject, ApiError>;
    async fn get_tree(&self, sha: &str) -> Result<TreeObject, ApiError>;
    async fn create_blob(&self, content: &str, encoding: Encoding) -> Result<String, ApiError>;
    async fn create_tree(
        &self,
        base_tree: &str,
        entries: &[NewTreeEntry],
    ) -> Result<String, ApiError>;
    async fn create_commit(
        &self,
        message: &str,
        tree: &str,
        parents: &[String],
    ) -> Result<String, ApiError>;
    async fn update_ref(&self, branch: &str, sha: &str, force: bool) -> Result<(), ApiError>;

    /// `Ok(None)` when the path does not exist on the branch.
    async fn get_contents(&self, path: &str, branch: &str)
        -> Result<Option<RemoteFile>, ApiError>;
    async fn put_contents(&self, request: &PutContents<'_>) -> Result<(), ApiError>;

    /// Whether a directory must exist before a file can be created inside it.
    fn requires_directory_placeholder(&self) -> bool {
        false
    }

    async fn dispatch_workflow(&self, workflow: &str, branch: &str) -> Result<(), ApiError>;
    /// Most recent dispatch runs of `workflow` on `branch`, newest first.
    async fn latest_runs(&self, workflow: &str, branch: &str)
        -> Result<Vec<WorkflowRun>, ApiError>;
    async fn get_run(&self, run_id: u64) -> Result<WorkflowRun, ApiError>;
    async fn list_jobs(&self, run_id: u64) -> Result<Vec<Job>, ApiError>;
    async fn cancel_run(&self, run_id: u64) -> Result<(), ApiError>;
    async fn rerun(&self, run_id: u64) -> Result<(), ApiError>;
    async fn list_artifacts(&self, run_id: u64) -> Result<Vec<Artifact>, ApiError>;
    async fn download_artifact(&self, artifact_id: u64) -> Result<Vec<u8>, ApiError>;
}
