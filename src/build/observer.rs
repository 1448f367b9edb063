//! Callbacks through which a session reports to its collaborator.

use super::result::BuildResult;
use super::state::BuildState;
use crate::error::BuildError;
use tracing::{error, info};

/// Receives session events. Called from the session task; implementations must not block.
pub trait BuildObserver: Send + Sync {
    fn on_state_change(&self, _state: BuildState) {}

    /// `percent` is within `0..=100`.
    fn on_progress(&self, _percent: u8, _message: &str) {}

    fn on_log_line(&self, _step: &str, _status: &str) {}

    /// Delivered exactly once per session.
    fn on_complete(&self, _result: &BuildResult) {}

    fn on_error(&self, _error: &BuildError) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BuildObserver for NoopObserver {}

/// Forwards events into the structured log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl BuildObserver for TracingObserver {
    fn on_state_change(&self, state: BuildState) {
        info!(state = %state, "Build state changed");
    }

    fn on_progress(&self, percent: u8, message: &str) {
        info!(percent, message, "Build progress");
    }

    fn on_log_line(&self, step: &str, status: &str) {
        info!(step, status, "Build step");
    }

    fn on_complete(&self, result: &BuildResult) {
        info!(
            outcome = %result.outcome,
            variant = %result.variant,
            run_id = ?result.run_id,
            run_url = ?result.run_url,
            "Build completed"
        );
    }

    fn on_error(&self, err: &BuildError) {
        error!(kind = ?err.kind(), error = %err, "Build failed");
    }
}
