//! Completed session results and their follow-up handles.

use super::state::Outcome;
use crate::error::{ApiError, BuildError};
use crate::generator::WorkflowVariant;
use crate::model::AppModel;
use crate::repository::{ArtifactDownload, RepositoryClient, RepositoryCredentials};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildResult {
    pub variant: WorkflowVariant,
    pub outcome: Outcome,
    pub artifact_name: String,
    pub run_url: Option<String>,
    pub run_id: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

/// Inputs of a session, kept so the pipeline can be restarted.
#[derive(Debug, Clone)]
pub(crate) struct SessionSpec {
    pub(crate) model: Arc<AppModel>,
    pub(crate) variant: WorkflowVariant,
    pub(crate) credentials: RepositoryCredentials,
}

/// Fetches the run's artifact on demand. Nothing is listed until [`fetch`](Self::fetch).
#[derive(Clone)]
pub struct DownloadHandle {
    client: RepositoryClient,
    run_id: u64,
    artifact_name: String,
}

impl DownloadHandle {
    pub(crate) fn new(client: RepositoryClient, run_id: u64, artifact_name: String) -> Self {
        Self {
            client,
            run_id,
            artifact_name,
        }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub async fn fetch(&self) -> Result<ArtifactDownload, BuildError> {
        let artifacts = self.client.list_artifacts(self.run_id).await?;
        let Some(artifact) = artifacts
            .iter()
            .find(|a| a.name == self.artifact_name && !a.expired)
        else {
            let available: Vec<&str> = artifacts.iter().map(|a| a.name.as_str()).collect();
            warn!(
                run_id = self.run_id,
                expected = %self.artifact_name,
                ?available,
                "Expected artifact not found"
            );
            return Err(ApiError::NotFound(format!(
                "artifact {} for run {}",
                self.artifact_name, self.run_id
            ))
            .into());
        };
        let download = self.client.download_artifact(artifact).await?;
        info!(
            run_id = self.run_id,
            file = %download.file_name,
            size = download.bytes.len(),
            "Artifact fetched"
        );
        Ok(download)
    }
}

/// Restarts a non-successful session.
#[derive(Clone)]
pub struct RetryHandle {
    pub(crate) spec: SessionSpec,
    /// Connected client when credentials were already accepted
    pub(crate) client: Option<RepositoryClient>,
}

impl RetryHandle {
    pub fn app_id(&self) -> &str {
        &self.spec.model.id
    }
}

/// What the collaborator can do next with a finished session.
#[derive(Clone)]
pub enum FollowUp {
    Download(DownloadHandle),
    Retry(RetryHandle),
}

/// Remote cancellation started by a cancelled session. Resolves to whether the host accepted it.
pub(crate) type RemoteCancel = Shared<BoxFuture<'static, bool>>;

/// Final state of a session, returned by [`BuildHandle::wait`](super::BuildHandle::wait).
#[derive(Clone)]
pub struct CompletedBuild {
    pub result: BuildResult,
    /// Error behind a non-successful outcome
    pub error: Option<BuildError>,
    pub(crate) follow_up: FollowUp,
    pub(crate) remote_cancel: Option<RemoteCancel>,
}

impl CompletedBuild {
    /// Wait for the session's remote cancel request, if it sent one.
    ///
    /// Returns `false` when no request was needed (the run had already finished or was
    /// never located) or the host rejected it.
    pub async fn remote_cancel_settled(&self) -> bool {
        match &self.remote_cancel {
            Some(request) => request.clone().await,
            None => false,
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.result.outcome
    }

    pub fn download_handle(&self) -> Option<&DownloadHandle> {
        match &self.follow_up {
            FollowUp::Download(handle) => Some(handle),
            FollowUp::Retry(_) => None,
        }
    }

    pub fn retry_handle(&self) -> Option<&RetryHandle> {
        match &self.follow_up {
            FollowUp::Retry(handle) => Some(handle),
            FollowUp::Download(_) => None,
        }
    }
}
