//! Session pipeline: credentials, generation, push, dispatch, locate, monitor.

use super::monitor::{monitor_run, MonitorOutcome, PollPolicy};
use super::observer::BuildObserver;
use super::result::{
    BuildResult, CompletedBuild, DownloadHandle, FollowUp, RemoteCancel, RetryHandle, SessionSpec,
};
use super::session::{CancelToken, SessionGuard, SessionRegistry};
use super::state::{BuildState, Outcome};
use super::{BuildSettings, HostConnector};
use crate::error::BuildError;
use crate::generator::{self, WorkflowVariant};
use crate::model::AppModel;
use crate::repository::{
    ArtifactDownload, RepositoryClient, RepositoryCredentials, RunConclusion, RunStatus,
    WorkflowRun,
};
use chrono::Utc;
use futures::FutureExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Starts build sessions and tracks which apps have one running.
pub struct BuildOrchestrator {
    connector: Arc<dyn HostConnector>,
    settings: BuildSettings,
    observer: Arc<dyn BuildObserver>,
    sessions: SessionRegistry,
}

/// A running session. Dropping the handle does not stop the session.
pub struct BuildHandle {
    app_id: String,
    cancel: CancelToken,
    task: JoinHandle<CompletedBuild>,
}

impl BuildHandle {
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Request cancellation. A no-op once the session has completed.
    pub fn cancel(&self) {
        if !self.task.is_finished() {
            info!(app_id = %self.app_id, "Cancellation requested");
        }
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub async fn wait(self) -> Result<CompletedBuild, BuildError> {
        self.task
            .await
            .map_err(|e| BuildError::Io(format!("build session aborted: {}", e)))
    }
}

/// Everything a session task owns.
struct Session {
    spec: SessionSpec,
    client: Option<RepositoryClient>,
    connector: Arc<dyn HostConnector>,
    settings: BuildSettings,
    observer: Arc<dyn BuildObserver>,
    cancel: CancelToken,
    state: BuildState,
}

/// Why the pipeline stopped short of a finished run.
enum Interrupt {
    Cancelled,
    Failed(BuildError),
}

impl From<BuildError> for Interrupt {
    fn from(err: BuildError) -> Self {
        Interrupt::Failed(err)
    }
}

impl From<crate::error::ApiError> for Interrupt {
    fn from(err: crate::error::ApiError) -> Self {
        Interrupt::Failed(err.into())
    }
}

impl BuildOrchestrator {
    pub fn new(
        connector: Arc<dyn HostConnector>,
        settings: BuildSettings,
        observer: Arc<dyn BuildObserver>,
    ) -> Self {
        Self {
            connector,
            settings,
            observer,
            sessions: SessionRegistry::default(),
        }
    }

    pub fn is_active(&self, app_id: &str) -> bool {
        self.sessions.is_active(app_id)
    }

    /// Start a session for `model`. Must be called within a tokio runtime.
    ///
    /// Fails with [`BuildError::SessionActive`] while another session for the same app id runs.
    pub fn start(
        &self,
        model: AppModel,
        variant: WorkflowVariant,
        credentials: RepositoryCredentials,
    ) -> Result<BuildHandle, BuildError> {
        let spec = SessionSpec {
            model: Arc::new(model),
            variant,
            credentials,
        };
        self.spawn(spec, None)
    }

    /// Restart a non-successful session from `Preparing`, reusing its accepted credentials.
    pub fn retry(&self, handle: &RetryHandle) -> Result<BuildHandle, BuildError> {
        info!(app_id = %handle.app_id(), "Retrying build");
        self.spawn(handle.spec.clone(), handle.client.clone())
    }

    pub async fn download_artifact(
        &self,
        handle: &DownloadHandle,
    ) -> Result<ArtifactDownload, BuildError> {
        handle.fetch().await
    }

    fn spawn(
        &self,
        spec: SessionSpec,
        client: Option<RepositoryClient>,
    ) -> Result<BuildHandle, BuildError> {
        let app_id = spec.model.id.clone();
        let guard = self
            .sessions
            .acquire(&app_id)
            .ok_or_else(|| BuildError::SessionActive(app_id.clone()))?;

        let cancel = CancelToken::new();
        let session = Session {
            spec,
            client,
            connector: Arc::clone(&self.connector),
            settings: self.settings.clone(),
            observer: Arc::clone(&self.observer),
            cancel: cancel.clone(),
            state: BuildState::Idle,
        };
        let task = tokio::spawn(session.run(guard));
        info!(app_id = %app_id, "Build session started");

        Ok(BuildHandle {
            app_id,
            cancel,
            task,
        })
    }
}

impl Session {
    fn transition(&mut self, state: BuildState) {
        debug!(from = %self.state, to = %state, app_id = %self.spec.model.id, "State transition");
        self.state = state;
        self.observer.on_state_change(state);
    }

    /// Move to the next step, honouring a pending cancellation first.
    fn advance(&mut self, state: BuildState) -> Result<(), Interrupt> {
        if self.cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        self.transition(state);
        Ok(())
    }

    async fn run(mut self, guard: SessionGuard) -> CompletedBuild {
        let mut run: Option<WorkflowRun> = None;
        let pipeline = self.pipeline(&mut run).await;

        let variant = self.spec.variant;
        let (outcome, error) = match pipeline {
            Ok(MonitorOutcome::Finished(finished)) => match finished.conclusion {
                Some(RunConclusion::Success) => (Outcome::Success, None),
                Some(RunConclusion::Cancelled) => (Outcome::Cancelled, Some(BuildError::Cancelled)),
                conclusion => (
                    Outcome::Failure,
                    Some(BuildError::RunFailed {
                        run_id: finished.id,
                        conclusion: conclusion
                            .map(RunConclusion::as_str)
                            .unwrap_or("none")
                            .to_string(),
                        run_url: finished.html_url,
                    }),
                ),
            },
            Ok(MonitorOutcome::TimedOut { attempts }) => (
                Outcome::Timeout,
                Some(BuildError::Timeout {
                    attempts,
                    run_url: run.as_ref().map(|r| r.html_url.clone()),
                }),
            ),
            Ok(MonitorOutcome::Cancelled) | Err(Interrupt::Cancelled) => {
                (Outcome::Cancelled, Some(BuildError::Cancelled))
            }
            Err(Interrupt::Failed(err)) => (Outcome::Failure, Some(err)),
        };

        let remote_cancel = match (outcome, &self.client, run.as_ref()) {
            (Outcome::Cancelled, Some(client), Some(r)) if r.status != RunStatus::Completed => {
                Some(spawn_remote_cancel(client.clone(), r.id))
            }
            _ => None,
        };

        let result = BuildResult {
            variant,
            outcome,
            artifact_name: variant.artifact_name().to_string(),
            run_url: run.as_ref().map(|r| r.html_url.clone()),
            run_id: run.as_ref().map(|r| r.id),
            timestamp: Utc::now(),
        };
        let follow_up = match (outcome, &self.client, run.as_ref()) {
            (Outcome::Success, Some(client), Some(r)) => FollowUp::Download(DownloadHandle::new(
                client.clone(),
                r.id,
                result.artifact_name.clone(),
            )),
            _ => FollowUp::Retry(RetryHandle {
                spec: self.spec.clone(),
                client: self.client.clone(),
            }),
        };

        self.transition(BuildState::Completed(outcome));
        drop(guard);
        if outcome == Outcome::Failure {
            if let Some(err) = &error {
                self.observer.on_error(err);
            }
        }
        self.observer.on_complete(&result);
        info!(
            app_id = %self.spec.model.id,
            outcome = %outcome,
            run_id = ?result.run_id,
            "Build session finished"
        );

        CompletedBuild {
            result,
            error,
            follow_up,
            remote_cancel,
        }
    }

    async fn pipeline(
        &mut self,
        run: &mut Option<WorkflowRun>,
    ) -> Result<MonitorOutcome, Interrupt> {
        let client = match self.client.clone() {
            Some(client) => client,
            None => {
                self.advance(BuildState::ConfiguringCredentials)?;
                let client = self.connect().await?;
                self.client = Some(client.clone());
                client
            }
        };

        self.advance(BuildState::Preparing)?;
        let tree = generator::generate(&self.spec.model).map_err(BuildError::from)?;
        info!(files = tree.len(), app_id = %self.spec.model.id, "Project generated");

        let variant = self.spec.variant;
        self.advance(BuildState::PushingWorkflow)?;
        client
            .check_and_push_workflow_file(&variant.path(), &variant.render())
            .await?;

        self.advance(BuildState::PushingProject)?;
        let message = format!("{} ({})", self.settings.commit_message, self.spec.model.name);
        client.commit_files(&tree, &message).await?;

        self.advance(BuildState::Dispatching)?;
        let workflow = variant.file_name();
        let dispatched_at = client.trigger_workflow(&workflow).await?;

        self.advance(BuildState::LocatingRun)?;
        let located = client.find_latest_run(&workflow, dispatched_at).await?;
        let run_id = located.id;
        *run = Some(located);

        self.advance(BuildState::Monitoring)?;
        let policy = PollPolicy {
            interval: self.settings.poll_interval,
            max_attempts: self.settings.max_poll_attempts,
        };
        let outcome =
            monitor_run(&client, run_id, policy, self.observer.as_ref(), &self.cancel).await?;
        if let MonitorOutcome::Finished(finished) = &outcome {
            *run = Some(finished.clone());
        }
        Ok(outcome)
    }

    async fn connect(&self) -> Result<RepositoryClient, Interrupt> {
        let credentials = &self.spec.credentials;
        credentials.validate().map_err(BuildError::Auth)?;
        let host = self.connector.connect(credentials)?;
        let client = RepositoryClient::new(host, credentials.branch.clone())
            .with_discovery(self.settings.discovery);
        client.verify_access().await?;
        info!(repository = %credentials.slug(), "Credentials accepted");
        Ok(client)
    }
}

/// Cancel the run without holding up session completion.
fn spawn_remote_cancel(client: RepositoryClient, run_id: u64) -> RemoteCancel {
    let task = tokio::spawn(async move {
        match client.cancel_run(run_id).await {
            Ok(()) => {
                debug!(run_id, "Remote run cancelled");
                true
            }
            Err(e) => {
                warn!(run_id, error = %e, "Remote cancel failed");
                false
            }
        }
    });
    task.map(|joined| joined.unwrap_or(false)).boxed().shared()
}
