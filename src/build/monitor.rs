//! Run monitoring: fixed-interval status polling with a hard attempt cap.

use super::observer::BuildObserver;
use super::session::CancelToken;
use crate::error::ApiError;
use crate::repository::{Job, RepositoryClient, RunConclusion, RunStatus, Step, WorkflowRun};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Progress reported while a run is in progress but step detail is unavailable.
pub(crate) const FALLBACK_PROGRESS: u8 = 50;

#[derive(Debug, Clone, Copy)]
pub(crate) struct PollPolicy {
    pub(crate) interval: Duration,
    pub(crate) max_attempts: u32,
}

#[derive(Debug)]
pub(crate) enum MonitorOutcome {
    Finished(WorkflowRun),
    TimedOut { attempts: u32 },
    Cancelled,
}

/// Completed steps over total steps, as a percentage. `None` without step detail.
pub(crate) fn step_progress(jobs: &[Job]) -> Option<u8> {
    let total: usize = jobs.iter().map(|j| j.steps.len()).sum();
    if total == 0 {
        return None;
    }
    let done = jobs
        .iter()
        .flat_map(|j| j.steps.iter())
        .filter(|s| s.status == RunStatus::Completed)
        .count();
    Some(((done * 100) / total).min(100) as u8)
}

pub(crate) fn step_label(step: &Step) -> &'static str {
    match (step.status, step.conclusion) {
        (RunStatus::Queued, _) => "queued",
        (RunStatus::InProgress, _) => "in_progress",
        (RunStatus::Completed, Some(RunConclusion::Success)) => "success",
        (RunStatus::Completed, Some(RunConclusion::Cancelled)) => "cancelled",
        (RunStatus::Completed, _) => "failure",
    }
}

/// Step status changes since the previous tick.
#[derive(Debug, Default)]
struct StepLog {
    seen: HashMap<(u64, u32, String), &'static str>,
}

impl StepLog {
    fn report(&mut self, jobs: &[Job], observer: &dyn BuildObserver) {
        for job in jobs {
            for step in &job.steps {
                let label = step_label(step);
                let key = (job.id, step.number, step.name.clone());
                if self.seen.insert(key, label) != Some(label) {
                    observer.on_log_line(&step.name, label);
                }
            }
        }
    }
}

fn progress_message(jobs: &[Job]) -> String {
    jobs.iter()
        .flat_map(|j| j.steps.iter())
        .find(|s| s.status == RunStatus::InProgress)
        .map(|s| format!("Running: {}", s.name))
        .unwrap_or_else(|| "Building".to_string())
}

/// One status check per tick; jobs are fetched only while the run is in progress.
async fn tick(
    client: &RepositoryClient,
    run_id: u64,
    observer: &dyn BuildObserver,
    steps: &mut StepLog,
) -> Result<Option<WorkflowRun>, ApiError> {
    let run = client.get_run_status(run_id).await?;
    match run.status {
        RunStatus::Completed => return Ok(Some(run)),
        RunStatus::Queued => observer.on_progress(0, "Queued"),
        RunStatus::InProgress => match client.get_jobs(run_id).await {
            Ok(jobs) => {
                steps.report(&jobs, observer);
                let percent = step_progress(&jobs).unwrap_or(FALLBACK_PROGRESS);
                observer.on_progress(percent, &progress_message(&jobs));
            }
            Err(e) => {
                debug!(run_id, error = %e, "Job detail unavailable");
                observer.on_progress(FALLBACK_PROGRESS, "Building");
            }
        },
    }
    Ok(None)
}

pub(crate) async fn monitor_run(
    client: &RepositoryClient,
    run_id: u64,
    policy: PollPolicy,
    observer: &dyn BuildObserver,
    cancel: &CancelToken,
) -> Result<MonitorOutcome, ApiError> {
    let mut steps = StepLog::default();
    for attempt in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            return Ok(MonitorOutcome::Cancelled);
        }
        debug!(run_id, attempt, "Polling run status");

        // A check in flight runs to completion; cancellation is honoured between checks.
        if let Some(run) = tick(client, run_id, observer, &mut steps).await? {
            return Ok(MonitorOutcome::Finished(run));
        }
        if cancel.is_cancelled() {
            return Ok(MonitorOutcome::Cancelled);
        }

        if attempt < policy.max_attempts {
            tokio::select! {
                _ = tokio::time::sleep(policy.interval) => {}
                _ = cancel.cancelled() => return Ok(MonitorOutcome::Cancelled),
            }
        }
    }
    warn!(run_id, attempts = policy.max_attempts, "Run did not complete in time");
    Ok(MonitorOutcome::TimedOut {
        attempts: policy.max_attempts,
    })
}
