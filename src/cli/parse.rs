//! CLI parse: clap types for apkforge. No behavior; definitions only.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// apkforge - generate Android projects and build them on GitHub Actions
#[derive(Parser)]
#[command(name = "apkforge")]
#[command(about = "Generate Android projects from an app model and build them on GitHub Actions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Target repository. Unset fields fall back to configuration; the token to
/// APKFORGE_TOKEN, then GITHUB_TOKEN.
#[derive(Args, Clone, Debug, Default)]
pub struct RepositoryArgs {
    /// Repository owner
    #[arg(long)]
    pub owner: Option<String>,

    /// Repository name
    #[arg(long)]
    pub repo: Option<String>,

    /// Branch to push to and build from
    #[arg(long)]
    pub branch: Option<String>,

    /// Access token
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate the Android project locally
    Generate {
        /// App model JSON file
        #[arg(long)]
        model: PathBuf,
        /// Output directory
        #[arg(long)]
        out: PathBuf,
    },
    /// Push the project, run the remote build and wait for it
    Build {
        /// App model JSON file
        #[arg(long)]
        model: PathBuf,
        /// Build variant (debug, release, bundle)
        #[arg(long)]
        variant: Option<String>,
        #[command(flatten)]
        repository: RepositoryArgs,
        /// Download the artifact into this directory on success
        #[arg(long)]
        download: Option<PathBuf>,
    },
    /// Show a workflow run and its jobs
    Status {
        run_id: u64,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        #[command(flatten)]
        repository: RepositoryArgs,
    },
    /// Cancel a workflow run
    Cancel {
        run_id: u64,
        #[command(flatten)]
        repository: RepositoryArgs,
    },
    /// Re-run a workflow run
    Rerun {
        run_id: u64,
        #[command(flatten)]
        repository: RepositoryArgs,
    },
    /// Download the artifacts of a workflow run
    Download {
        run_id: u64,
        /// Output directory
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        repository: RepositoryArgs,
    },
}
