//! Error types for project generation, the git hosting API, and build orchestration.

use serde::Serialize;
use thiserror::Error;

/// Invalid application model. Raised before any file is emitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Invalid package identifier '{0}': expected a dotted identifier such as com.example.app")]
    InvalidPackage(String),

    #[error("Application model has no screens")]
    NoScreens,

    #[error("Screen '{0}' has an empty name")]
    EmptyScreenName(String),

    #[error("Screens '{first}' and '{second}' both map to class {class_name}")]
    DuplicateScreen {
        first: String,
        second: String,
        class_name: String,
    },

    #[error("Duplicate component id '{id}' on screen '{screen}'")]
    DuplicateComponentId { screen: String, id: String },

    #[error("Invalid component id '{id}' on screen '{screen}': must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidComponentId { screen: String, id: String },

    #[error("Component id '{id}' on screen '{screen}' is reserved in generated activity code")]
    ReservedComponentId { screen: String, id: String },

    #[error("Component '{id}' on screen '{screen}' is a {kind} and cannot hold children")]
    ChildrenOnLeaf {
        screen: String,
        id: String,
        kind: String,
    },

    #[error("Scroll view '{id}' on screen '{screen}' has {count} children; at most one is allowed")]
    ScrollViewChildren {
        screen: String,
        id: String,
        count: usize,
    },

    #[error("Invalid color '{value}' for {field}: expected #RRGGBB or #AARRGGBB")]
    InvalidColor { field: String, value: String },

    #[error("Component '{id}' on screen '{screen}' navigates to unknown screen '{target}'")]
    UnknownNavigationTarget {
        screen: String,
        id: String,
        target: String,
    },

    #[error("Duplicate project file path: {0}")]
    DuplicatePath(String),

    #[error("Project file path must be relative and normalized: '{0}'")]
    InvalidPath(String),
}

/// Remote API errors. Every non-2xx response is normalized into one of these.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Remote API returned HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        url: Option<String>,
    },

    #[error("Remote resource not found: {0}")]
    NotFound(String),

    #[error("Authentication failed (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } | ApiError::Unauthorized { status, .. } => {
                Some(*status)
            }
            ApiError::NotFound(_) => Some(404),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// Coarse error category exposed to the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Generation,
    Auth,
    NotFound,
    Api,
    RunNotFound,
    RunFailed,
    Timeout,
    Cancelled,
    SessionActive,
    Config,
    Io,
}

/// Orchestrator-level errors.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    #[error("Project generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Credentials rejected: {0}")]
    Auth(String),

    #[error(transparent)]
    Api(ApiError),

    #[error("Workflow '{workflow}' was dispatched but no run appeared after {attempts} attempts")]
    RunNotFound { workflow: String, attempts: u32 },

    #[error("Run {run_id} finished with conclusion '{conclusion}'")]
    RunFailed {
        run_id: u64,
        conclusion: String,
        run_url: String,
    },

    #[error("Build did not finish after {attempts} status checks")]
    Timeout {
        attempts: u32,
        run_url: Option<String>,
    },

    #[error("Build cancelled")]
    Cancelled,

    #[error("A build is already running for app '{0}'; cancel it first")]
    SessionActive(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::Generation(_) => ErrorKind::Generation,
            BuildError::Auth(_) => ErrorKind::Auth,
            BuildError::Api(ApiError::NotFound(_)) => ErrorKind::NotFound,
            BuildError::Api(_) => ErrorKind::Api,
            BuildError::RunNotFound { .. } => ErrorKind::RunNotFound,
            BuildError::RunFailed { .. } => ErrorKind::RunFailed,
            BuildError::Timeout { .. } => ErrorKind::Timeout,
            BuildError::Cancelled => ErrorKind::Cancelled,
            BuildError::SessionActive(_) => ErrorKind::SessionActive,
            BuildError::Config(_) => ErrorKind::Config,
            BuildError::Io(_) => ErrorKind::Io,
        }
    }

    /// Remote page the user can open to investigate, when one is known.
    pub fn remote_url(&self) -> Option<&str> {
        match self {
            BuildError::Api(ApiError::Status { url, .. }) => url.as_deref(),
            BuildError::RunFailed { run_url, .. } => Some(run_url),
            BuildError::Timeout { run_url, .. } => run_url.as_deref(),
            _ => None,
        }
    }
}

impl From<ApiError> for BuildError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized { status, message } => {
                BuildError::Auth(format!("HTTP {}: {}", status, message))
            }
            other => BuildError::Api(other),
        }
    }
}

impl From<config::ConfigError> for BuildError {
    fn from(err: config::ConfigError) -> Self {
        BuildError::Config(err.to_string())
    }
}

impl From<std::io::Error> for BuildError {
    fn from(err: std::io::Error) -> Self {
        BuildError::Io(err.to_string())
    }
}
