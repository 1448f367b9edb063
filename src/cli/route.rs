//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::build::{BuildOrchestrator, GitHubConnector, HostConnector, Outcome};
use crate::cli::parse::{Commands, RepositoryArgs};
use crate::cli::presentation::{
    format_build_result, format_download_summary, format_generate_summary,
    format_run_status_json, format_run_status_text, ConsoleObserver,
};
use crate::cli::command_name;
use crate::config::{ConfigLoader, ForgeConfig};
use crate::error::BuildError;
use crate::generator::{self, ProjectTree, WorkflowVariant};
use crate::model::AppModel;
use crate::repository::{ArtifactDownload, RepositoryClient, RepositoryCredentials};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Runtime;
use tracing::{info, warn};

const TOKEN_ENV_VARS: [&str; 2] = ["APKFORGE_TOKEN", "GITHUB_TOKEN"];

/// Runtime context for CLI execution: workspace and loaded configuration.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    workspace_root: PathBuf,
    config: ForgeConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, BuildError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };

        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            BuildError::Config(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;

        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, BuildError> {
        let started = Instant::now();
        let result = self.execute_inner(command);
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, BuildError> {
        match command {
            Commands::Generate { model, out } => self.handle_generate(model, out),
            Commands::Build {
                model,
                variant,
                repository,
                download,
            } => self.handle_build(model, variant.as_deref(), repository, download.as_deref()),
            Commands::Status {
                run_id,
                format,
                repository,
            } => {
                let client = self.client(repository)?;
                runtime()?.block_on(async {
                    let run = client.get_run_status(*run_id).await?;
                    let jobs = client.get_jobs(*run_id).await.unwrap_or_else(|e| {
                        warn!(run_id, error = %e, "Job detail unavailable");
                        Vec::new()
                    });
                    match format.as_str() {
                        "json" => format_run_status_json(&run, &jobs),
                        _ => Ok(format_run_status_text(&run, &jobs)),
                    }
                })
            }
            Commands::Cancel { run_id, repository } => {
                let client = self.client(repository)?;
                runtime()?.block_on(client.cancel_run(*run_id))?;
                Ok(format!("Cancellation requested for run {}", run_id))
            }
            Commands::Rerun { run_id, repository } => {
                let client = self.client(repository)?;
                runtime()?.block_on(client.rerun_workflow(*run_id))?;
                Ok(format!("Re-run requested for run {}", run_id))
            }
            Commands::Download {
                run_id,
                out,
                repository,
            } => {
                let client = self.client(repository)?;
                let saved = runtime()?.block_on(async {
                    let mut saved = Vec::new();
                    for artifact in client.list_artifacts(*run_id).await? {
                        if artifact.expired {
                            warn!(artifact = %artifact.name, "Skipping expired artifact");
                            continue;
                        }
                        let download = client.download_artifact(&artifact).await?;
                        let path = save_download(&download, out)?;
                        saved.push((download, path));
                    }
                    Ok::<_, BuildError>(saved)
                })?;
                Ok(format_download_summary(&saved))
            }
        }
    }

    fn handle_generate(&self, model_path: &Path, out: &Path) -> Result<String, BuildError> {
        let model = self.read_model(model_path)?;
        let tree = generator::generate(&model)?;
        let out = self.resolve(out);
        write_tree(&tree, &out)?;
        info!(files = tree.len(), out = %out.display(), "Project written");
        Ok(format_generate_summary(&tree, &out))
    }

    fn handle_build(
        &self,
        model_path: &Path,
        variant: Option<&str>,
        repository: &RepositoryArgs,
        download: Option<&Path>,
    ) -> Result<String, BuildError> {
        let model = self.read_model(model_path)?;
        let variant = match variant {
            Some(v) => v.parse::<WorkflowVariant>().map_err(BuildError::Config)?,
            None => self.config.build.default_variant,
        };
        let credentials = self.credentials(repository)?;
        let orchestrator = BuildOrchestrator::new(
            Arc::new(GitHubConnector::new(self.config.repository.http_settings())),
            self.config.build.settings(),
            Arc::new(ConsoleObserver),
        );
        let download_dir = download.map(|d| self.resolve(d));

        runtime()?.block_on(async {
            let handle = orchestrator.start(model, variant, credentials)?;
            let cancel = handle.cancel_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("Cancelling build...");
                    cancel.cancel();
                }
            });

            let completed = handle.wait().await?;
            let result = &completed.result;

            if result.outcome == Outcome::Cancelled && completed.remote_cancel_settled().await {
                info!(run_id = ?result.run_id, "Remote run cancelled");
            }

            if let Some(err) = completed.error.clone() {
                if !result.outcome.is_success() {
                    eprint!("{}", format_build_result(result, None));
                    return Err(err);
                }
            }

            let saved = match (completed.download_handle(), download_dir) {
                (Some(handle), Some(dir)) => {
                    let download = orchestrator.download_artifact(handle).await?;
                    Some(save_download(&download, &dir)?)
                }
                _ => None,
            };
            Ok(format_build_result(result, saved.as_deref()))
        })
    }

    fn read_model(&self, path: &Path) -> Result<AppModel, BuildError> {
        let path = self.resolve(path);
        let json = std::fs::read_to_string(&path)
            .map_err(|e| BuildError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        AppModel::from_json(&json).map_err(|e| {
            BuildError::Config(format!("Invalid app model {}: {}", path.display(), e))
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }

    fn credentials(&self, args: &RepositoryArgs) -> Result<RepositoryCredentials, BuildError> {
        let repo_config = &self.config.repository;
        let owner = args
            .owner
            .clone()
            .or_else(|| repo_config.owner.clone())
            .ok_or_else(|| BuildError::Config("repository owner not set (--owner)".to_string()))?;
        let repo = args
            .repo
            .clone()
            .or_else(|| repo_config.repo.clone())
            .ok_or_else(|| BuildError::Config("repository name not set (--repo)".to_string()))?;
        let branch = args
            .branch
            .clone()
            .unwrap_or_else(|| repo_config.branch.clone());
        let token = args
            .token
            .clone()
            .or_else(|| {
                TOKEN_ENV_VARS
                    .iter()
                    .find_map(|var| std::env::var(var).ok().filter(|t| !t.is_empty()))
            })
            .ok_or_else(|| {
                BuildError::Auth("no access token (--token, APKFORGE_TOKEN or GITHUB_TOKEN)".to_string())
            })?;
        Ok(RepositoryCredentials::new(owner, repo, token, branch))
    }

    fn client(&self, args: &RepositoryArgs) -> Result<RepositoryClient, BuildError> {
        let credentials = self.credentials(args)?;
        credentials.validate().map_err(BuildError::Auth)?;
        let connector = GitHubConnector::new(self.config.repository.http_settings());
        Ok(RepositoryClient::new(
            connector.connect(&credentials)?,
            credentials.branch,
        ))
    }
}

fn runtime() -> Result<Runtime, BuildError> {
    Runtime::new().map_err(|e| BuildError::Io(format!("Failed to create runtime: {}", e)))
}

/// Write every file of the tree below `out`, decoding binary content.
pub fn write_tree(tree: &ProjectTree, out: &Path) -> Result<(), BuildError> {
    for file in tree.files() {
        let path = out.join(&file.path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, file.as_bytes())?;
    }
    Ok(())
}

fn save_download(download: &ArtifactDownload, dir: &Path) -> Result<PathBuf, BuildError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&download.file_name);
    std::fs::write(&path, &download.bytes)?;
    Ok(path)
}
