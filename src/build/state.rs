//! Build session states.

use serde::Serialize;
use std::fmt;

/// Terminal verdict of a build session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
    Timeout,
    Cancelled,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        self == Outcome::Success
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Timeout => "timeout",
            Outcome::Cancelled => "cancelled",
        })
    }
}

/// Pipeline position of a session.
///
/// `Idle` is the state before the first step and is never reported. `Completed` is final for
/// the session: its app id is released and a new session (or a retry) starts from `Idle` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "state", content = "outcome", rename_all = "snake_case")]
pub enum BuildState {
    Idle,
    ConfiguringCredentials,
    Preparing,
    PushingWorkflow,
    PushingProject,
    Dispatching,
    LocatingRun,
    Monitoring,
    Completed(Outcome),
}

impl BuildState {
    pub fn is_terminal(self) -> bool {
        matches!(self, BuildState::Completed(_))
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildState::Idle => f.write_str("idle"),
            BuildState::ConfiguringCredentials => f.write_str("configuring credentials"),
            BuildState::Preparing => f.write_str("preparing project"),
            BuildState::PushingWorkflow => f.write_str("pushing workflow"),
            BuildState::PushingProject => f.write_str("pushing project"),
            BuildState::Dispatching => f.write_str("dispatching build"),
            BuildState::LocatingRun => f.write_str("locating run"),
            BuildState::Monitoring => f.write_str("monitoring"),
            BuildState::Completed(outcome) => write!(f, "completed ({})", outcome),
        }
    }
}
