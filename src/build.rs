//! Build Orchestrator
//!
//! Drives one build session per app from credentials to a finished remote run:
//! `Idle → ConfiguringCredentials → Preparing → PushingWorkflow → PushingProject → Dispatching →
//! LocatingRun → Monitoring → Completed`. Each session runs as one tokio task and reports
//! through a [`BuildObserver`].

mod monitor;
pub mod observer;
mod orchestrator;
pub mod result;
mod session;
pub mod state;

pub use observer::{BuildObserver, NoopObserver, TracingObserver};
pub use orchestrator::{BuildHandle, BuildOrchestrator};
pub use result::{BuildResult, CompletedBuild, DownloadHandle, RetryHandle};
pub use session::CancelToken;
pub use state::{BuildState, Outcome};

use crate::error::ApiError;
use crate::repository::{GitHost, GitHubApi, HttpSettings, RepositoryCredentials, RunDiscovery};
use std::sync::Arc;
use std::time::Duration;

/// Produces a host connection for a set of credentials.
pub trait HostConnector: Send + Sync {
    fn connect(&self, credentials: &RepositoryCredentials) -> Result<Arc<dyn GitHost>, ApiError>;
}

/// Connects to the GitHub REST API.
#[derive(Debug, Clone, Default)]
pub struct GitHubConnector {
    settings: HttpSettings,
}

impl GitHubConnector {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }
}

impl HostConnector for GitHubConnector {
    fn connect(&self, credentials: &RepositoryCredentials) -> Result<Arc<dyn GitHost>, ApiError> {
        Ok(Arc::new(GitHubApi::new(credentials.clone(), &self.settings)?))
    }
}

/// Session timing and commit policy.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub discovery: RunDiscovery,
    pub commit_message: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            max_poll_attempts: 180,
            discovery: RunDiscovery::default(),
            commit_message: "Update generated project".to_string(),
        }
    }
}
