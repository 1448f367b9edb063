//! Configuration System
//!
//! Layered configuration for the repository connection, build policy and logging. Files and
//! `APKFORGE__SECTION__KEY` variables are merged by [`ConfigLoader`]. The access token is never
//! part of configuration.

use crate::build::BuildSettings;
use crate::generator::WorkflowVariant;
use crate::logging::LoggingConfig;
use crate::repository::{HttpSettings, RunDiscovery};
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForgeConfig {
    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Target repository and HTTP client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Repository owner (user or organisation)
    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub repo: Option<String>,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Overrides the default `apkforge/<version>` agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            owner: None,
            repo: None,
            branch: default_branch(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: None,
        }
    }
}

impl RepositoryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.api_base_url.starts_with("https://") || self.api_base_url.starts_with("http://"))
        {
            return Err(format!("api_base_url '{}' is not an http(s) URL", self.api_base_url));
        }
        if self.branch.trim().is_empty() {
            return Err("branch cannot be empty".to_string());
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err("timeouts must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn http_settings(&self) -> HttpSettings {
        let defaults = HttpSettings::default();
        HttpSettings {
            api_base_url: self.api_base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }
}

/// Build pipeline policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub default_variant: WorkflowVariant,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    #[serde(default = "default_run_discovery_attempts")]
    pub run_discovery_attempts: u32,

    #[serde(default = "default_run_discovery_delay_ms")]
    pub run_discovery_delay_ms: u64,

    #[serde(default = "default_commit_message")]
    pub commit_message: String,
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_max_poll_attempts() -> u32 {
    180
}

fn default_run_discovery_attempts() -> u32 {
    10
}

fn default_run_discovery_delay_ms() -> u64 {
    3000
}

fn default_commit_message() -> String {
    "Update generated project".to_string()
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            default_variant: WorkflowVariant::default(),
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: default_max_poll_attempts(),
            run_discovery_attempts: default_run_discovery_attempts(),
            run_discovery_delay_ms: default_run_discovery_delay_ms(),
            commit_message: default_commit_message(),
        }
    }
}

impl BuildConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_poll_attempts == 0 {
            return Err("max_poll_attempts must be at least 1".to_string());
        }
        if self.run_discovery_attempts == 0 {
            return Err("run_discovery_attempts must be at least 1".to_string());
        }
        if self.commit_message.trim().is_empty() {
            return Err("commit_message cannot be empty".to_string());
        }
        Ok(())
    }

    pub fn settings(&self) -> BuildSettings {
        BuildSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            max_poll_attempts: self.max_poll_attempts,
            discovery: RunDiscovery {
                attempts: self.run_discovery_attempts,
                delay: Duration::from_millis(self.run_discovery_delay_ms),
            },
            commit_message: self.commit_message.clone(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Repository(String),
    Build(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Repository(msg) => write!(f, "repository: {}", msg),
            ValidationError::Build(msg) => write!(f, "build: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ForgeConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.repository.validate() {
            errors.push(ValidationError::Repository(e));
        }
        if let Err(e) = self.build.validate() {
            errors.push(ValidationError::Build(e));
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            errors.push(ValidationError::Logging(format!(
                "unknown format '{}'",
                self.logging.format
            )));
        }
        if !matches!(self.logging.output.as_str(), "stdout" | "stderr" | "file") {
            errors.push(ValidationError::Logging(format!(
                "unknown output '{}'",
                self.logging.output
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
