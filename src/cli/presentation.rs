//! CLI presentation: result formatters and the console build observer.

use crate::build::{BuildObserver, BuildResult, BuildState, Outcome};
use crate::error::BuildError;
use crate::generator::ProjectTree;
use crate::repository::{ArtifactDownload, Job, RunConclusion, RunStatus, WorkflowRun};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn status_cell(status: RunStatus, conclusion: Option<RunConclusion>) -> String {
    match (status, conclusion) {
        (RunStatus::Completed, Some(RunConclusion::Success)) => {
            format!("{}", "success".green())
        }
        (RunStatus::Completed, Some(RunConclusion::Cancelled)) => {
            format!("{}", "cancelled".yellow())
        }
        (RunStatus::Completed, _) => format!("{}", "failure".red()),
        (status, _) => status.as_str().to_string(),
    }
}

pub fn format_generate_summary(tree: &ProjectTree, out: &Path) -> String {
    format!("Generated {} files in {}", tree.len(), out.display())
}

pub fn format_build_result(result: &BuildResult, saved: Option<&Path>) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", format_section_heading("Build")));
    let outcome = match result.outcome {
        Outcome::Success => format!("{}", "success".green()),
        Outcome::Failure => format!("{}", "failure".red()),
        Outcome::Timeout => format!("{}", "timeout".yellow()),
        Outcome::Cancelled => format!("{}", "cancelled".yellow()),
    };
    out.push_str(&format!("  Outcome: {}\n", outcome));
    out.push_str(&format!("  Variant: {}\n", result.variant));
    out.push_str(&format!("  Artifact: {}\n", result.artifact_name));
    if let Some(run_id) = result.run_id {
        out.push_str(&format!("  Run: {}\n", run_id));
    }
    if let Some(url) = &result.run_url {
        out.push_str(&format!("  URL: {}\n", url));
    }
    if let Some(path) = saved {
        out.push_str(&format!("  Saved: {}\n", path.display()));
    }
    out
}

pub fn format_run_status_text(run: &WorkflowRun, jobs: &[Job]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n",
        format_section_heading(&format!("Run {}", run.id))
    ));
    if let Some(name) = &run.name {
        out.push_str(&format!("  Workflow: {}\n", name));
    }
    out.push_str(&format!(
        "  Status: {}\n",
        status_cell(run.status, run.conclusion)
    ));
    out.push_str(&format!("  Created: {}\n", run.created_at.to_rfc3339()));
    out.push_str(&format!("  URL: {}\n", run.html_url));

    for job in jobs {
        out.push_str(&format!("\n{}\n", format_section_heading(&job.name)));
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["#", "Step", "Status"]);
        for step in &job.steps {
            table.add_row(vec![
                step.number.to_string(),
                step.name.clone(),
                status_cell(step.status, step.conclusion),
            ]);
        }
        out.push_str(&format!("{}\n", table));
    }
    out
}

#[derive(Serialize)]
struct RunStatusOutput<'a> {
    run: &'a WorkflowRun,
    jobs: &'a [Job],
}

pub fn format_run_status_json(run: &WorkflowRun, jobs: &[Job]) -> Result<String, BuildError> {
    serde_json::to_string_pretty(&RunStatusOutput { run, jobs })
        .map_err(|e| BuildError::Io(format!("Failed to serialize run status: {}", e)))
}

pub fn format_download_summary(saved: &[(ArtifactDownload, std::path::PathBuf)]) -> String {
    if saved.is_empty() {
        return "No artifacts available.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["File", "Bytes"]);
    for (download, path) in saved {
        table.add_row(vec![
            path.display().to_string(),
            download.bytes.len().to_string(),
        ]);
    }
    format!("{}", table)
}

/// Prints session progress to stderr while a build runs.
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl BuildObserver for ConsoleObserver {
    fn on_state_change(&self, state: BuildState) {
        if !state.is_terminal() && state != BuildState::Idle {
            eprintln!("{} {}", "==>".cyan().bold(), state);
        }
    }

    fn on_progress(&self, percent: u8, message: &str) {
        eprintln!("    [{:>3}%] {}", percent, message);
    }

    fn on_log_line(&self, step: &str, status: &str) {
        let status = match status {
            "success" => format!("{}", status.green()),
            "failure" => format!("{}", status.red()),
            other => other.dimmed().to_string(),
        };
        eprintln!("    {} {}", step, status);
    }

    fn on_error(&self, error: &BuildError) {
        eprintln!("{} {}", "error:".red().bold(), error);
    }
}
