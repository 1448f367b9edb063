//! Higher-level repository operations composed from [`GitHost`] primitives.

use super::{
    Artifact, ArtifactDownload, GitHost, Job, NewTreeEntry, PutContents, WorkflowRun,
};
use crate::error::{ApiError, BuildError};
use crate::generator::{ProjectFile, ProjectTree};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Blob uploads in flight at once during a commit.
const BLOB_CONCURRENCY: usize = 4;

/// Tolerated difference between the local clock and the host's run timestamps.
const DISPATCH_CLOCK_SKEW_SECS: i64 = 30;

/// Bounded retry policy for locating a freshly dispatched run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDiscovery {
    pub attempts: u32,
    /// Wait before every attempt, including the first
    pub delay: Duration,
}

impl Default for RunDiscovery {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Branch moved to a new commit.
    Committed { sha: String },
    /// Tree identical to the branch head; nothing was written to the ref.
    Unchanged { sha: String },
}

impl CommitOutcome {
    pub fn sha(&self) -> &str {
        match self {
            CommitOutcome::Committed { sha } | CommitOutcome::Unchanged { sha } => sha,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPush {
    Unchanged,
    Updated,
    Created,
}

/// Repository operations against one branch.
#[derive(Clone)]
pub struct RepositoryClient {
    host: Arc<dyn GitHost>,
    branch: String,
    discovery: RunDiscovery,
}

impl RepositoryClient {
    pub fn new(host: Arc<dyn GitHost>, branch: impl Into<String>) -> Self {
        Self {
            host,
            branch: branch.into(),
            discovery: RunDiscovery::default(),
        }
    }

    pub fn with_discovery(mut self, discovery: RunDiscovery) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub async fn verify_access(&self) -> Result<(), ApiError> {
        self.host.verify_access().await
    }

    /// Commit the whole tree on top of the branch head.
    ///
    /// Unchanged entries are carried over through the base tree. The ref update is the only
    /// visible mutation and is skipped when the resulting tree matches the head's.
    pub async fn commit_files(
        &self,
        tree: &ProjectTree,
        message: &str,
    ) -> Result<CommitOutcome, ApiError> {
        let head_sha = self.host.get_ref(&self.branch).await?;
        let head = self.host.get_commit(&head_sha).await?;
        let base = self.host.get_tree(&head.tree_sha).await?;
        debug!(
            branch = %self.branch,
            head = %head_sha,
            base_entries = base.entry_count,
            "Resolved branch head"
        );

        let uploads: Vec<_> = tree.files().iter().map(|file| self.upload_blob(file)).collect();
        let entries: Vec<NewTreeEntry> = stream::iter(uploads)
            .buffered(BLOB_CONCURRENCY)
            .try_collect()
            .await?;

        let new_tree = self.host.create_tree(&base.sha, &entries).await?;
        if new_tree == head.tree_sha {
            info!(branch = %self.branch, sha = %head_sha, "Project unchanged, skipping commit");
            return Ok(CommitOutcome::Unchanged { sha: head_sha });
        }

        let commit = self
            .host
            .create_commit(message, &new_tree, std::slice::from_ref(&head_sha))
            .await?;
        self.host.update_ref(&self.branch, &commit, false).await?;
        info!(
            branch = %self.branch,
            sha = %commit,
            files = entries.len(),
            "Committed project"
        );
        Ok(CommitOutcome::Committed { sha: commit })
    }

    /// Owned upload future for one file, independent of `self` and `file` borrows.
    fn upload_blob(
        &self,
        file: &ProjectFile,
    ) -> impl std::future::Future<Output = Result<NewTreeEntry, ApiError>> + Send + 'static {
        let host = Arc::clone(&self.host);
        let path = file.path.clone();
        let content = file.encoded();
        let encoding = file.encoding();
        async move {
            let sha = host.create_blob(&content, encoding).await?;
            Ok(NewTreeEntry::blob(path, sha))
        }
    }

    /// Write the workflow definition unless the remote copy is byte-identical.
    pub async fn check_and_push_workflow_file(
        &self,
        path: &str,
        content: &str,
    ) -> Result<WorkflowPush, ApiError> {
        let existing = self.host.get_contents(path, &self.branch).await?;
        if let Some(remote) = &existing {
            if remote.content == content.as_bytes() {
                debug!(path, "Workflow file up to date");
                return Ok(WorkflowPush::Unchanged);
            }
        }

        if existing.is_none() && self.host.requires_directory_placeholder() {
            self.ensure_directory(path).await?;
        }

        let message = match existing {
            Some(_) => format!("Update {}", path),
            None => format!("Add {}", path),
        };
        self.host
            .put_contents(&PutContents {
                path,
                content: content.as_bytes(),
                message: &message,
                branch: &self.branch,
                sha: existing.as_ref().map(|f| f.sha.as_str()),
            })
            .await?;

        let outcome = if existing.is_some() {
            WorkflowPush::Updated
        } else {
            WorkflowPush::Created
        };
        info!(path, outcome = ?outcome, "Workflow file written");
        Ok(outcome)
    }

    async fn ensure_directory(&self, path: &str) -> Result<(), ApiError> {
        let Some(dir) = parent_directory(path) else {
            return Ok(());
        };
        let keep = format!("{}/.gitkeep", dir);
        if self.host.get_contents(&keep, &self.branch).await?.is_some() {
            return Ok(());
        }
        debug!(directory = dir, "Creating directory placeholder");
        self.host
            .put_contents(&PutContents {
                path: &keep,
                content: b"",
                message: &format!("Create {}", dir),
                branch: &self.branch,
                sha: None,
            })
            .await
    }

    /// Dispatch the workflow on the configured branch. The host returns no run id,
    /// so the dispatch instant is handed back for [`Self::find_latest_run`].
    pub async fn trigger_workflow(&self, workflow: &str) -> Result<DateTime<Utc>, ApiError> {
        let dispatched_at = Utc::now();
        self.host.dispatch_workflow(workflow, &self.branch).await?;
        info!(workflow, branch = %self.branch, "Workflow dispatched");
        Ok(dispatched_at)
    }

    /// Poll for the run created by a dispatch at `dispatched_at`, waiting before each
    /// attempt. Runs created before the dispatch (less clock skew) are ignored.
    pub async fn find_latest_run(
        &self,
        workflow: &str,
        dispatched_at: DateTime<Utc>,
    ) -> Result<WorkflowRun, BuildError> {
        let not_before = dispatched_at - chrono::Duration::seconds(DISPATCH_CLOCK_SKEW_SECS);
        for attempt in 1..=self.discovery.attempts {
            if !self.discovery.delay.is_zero() {
                tokio::time::sleep(self.discovery.delay).await;
            }
            let runs = self.host.latest_runs(workflow, &self.branch).await?;
            match runs.into_iter().next() {
                Some(run) if run.created_at >= not_before => {
                    info!(workflow, run_id = run.id, attempt, "Located workflow run");
                    return Ok(run);
                }
                Some(stale) => debug!(
                    workflow,
                    attempt,
                    run_id = stale.id,
                    created_at = %stale.created_at,
                    "Latest run predates dispatch"
                ),
                None => debug!(workflow, attempt, "No run yet"),
            }
        }
        warn!(
            workflow,
            attempts = self.discovery.attempts,
            "Workflow run never appeared"
        );
        Err(BuildError::RunNotFound {
            workflow: workflow.to_string(),
            attempts: self.discovery.attempts,
        })
    }

    pub async fn get_run_status(&self, run_id: u64) -> Result<WorkflowRun, ApiError> {
        self.host.get_run(run_id).await
    }

    pub async fn get_jobs(&self, run_id: u64) -> Result<Vec<Job>, ApiError> {
        self.host.list_jobs(run_id).await
    }

    pub async fn cancel_run(&self, run_id: u64) -> Result<(), ApiError> {
        self.host.cancel_run(run_id).await
    }

    pub async fn rerun_workflow(&self, run_id: u64) -> Result<(), ApiError> {
        self.host.rerun(run_id).await
    }

    pub async fn list_artifacts(&self, run_id: u64) -> Result<Vec<Artifact>, ApiError> {
        self.host.list_artifacts(run_id).await
    }

    pub async fn download_artifact(&self, artifact: &Artifact) -> Result<ArtifactDownload, ApiError> {
        if artifact.expired {
            return Err(ApiError::NotFound(format!(
                "artifact {} has expired",
                artifact.name
            )));
        }
        let bytes = self.host.download_artifact(artifact.id).await?;
        Ok(ArtifactDownload {
            file_name: format!("{}.zip", artifact.name),
            bytes,
        })
    }
}

fn parent_directory(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(dir, _)| dir).filter(|d| !d.is_empty())
}
