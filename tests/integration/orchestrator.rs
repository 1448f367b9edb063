//! Build orchestrator sessions driven against the in-memory host

use super::support::{build_job, credentials, run, FakeConnector, FakeHost};
use apkforge::build::{
    BuildObserver, BuildOrchestrator, BuildResult, BuildSettings, BuildState, Outcome,
};
use apkforge::error::{ApiError, BuildError, ErrorKind};
use apkforge::generator::WorkflowVariant;
use apkforge::model::AppModel;
use apkforge::repository::{RunConclusion, RunDiscovery, RunStatus};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const MODEL: &str = r#"{
    "id": "app-1",
    "name": "Demo",
    "package": "com.example.demo",
    "screens": [
        { "id": "s1", "name": "Main", "components": [
            { "id": "title", "type": "text_view", "properties": { "text": "Hello" } },
            { "id": "go", "type": "button", "properties": { "text": "Go", "navigate_to": "Settings" } }
        ] },
        { "id": "s2", "name": "Settings", "components": [] }
    ]
}"#;

fn model() -> AppModel {
    AppModel::from_json(MODEL).unwrap()
}

#[derive(Default)]
struct Recorder {
    states: Mutex<Vec<BuildState>>,
    progress: Mutex<Vec<u8>>,
    lines: Mutex<Vec<(String, String)>>,
    completed: Mutex<Vec<BuildResult>>,
    errors: Mutex<Vec<ErrorKind>>,
}

impl BuildObserver for Recorder {
    fn on_state_change(&self, state: BuildState) {
        self.states.lock().push(state);
    }

    fn on_progress(&self, percent: u8, _message: &str) {
        self.progress.lock().push(percent);
    }

    fn on_log_line(&self, step: &str, status: &str) {
        self.lines.lock().push((step.to_string(), status.to_string()));
    }

    fn on_complete(&self, result: &BuildResult) {
        self.completed.lock().push(result.clone());
    }

    fn on_error(&self, error: &BuildError) {
        self.errors.lock().push(error.kind());
    }
}

fn settings(poll_interval: Duration, max_poll_attempts: u32) -> BuildSettings {
    BuildSettings {
        poll_interval,
        max_poll_attempts,
        discovery: RunDiscovery {
            attempts: 3,
            delay: Duration::ZERO,
        },
        ..BuildSettings::default()
    }
}

fn orchestrator(
    host: &Arc<FakeHost>,
    settings: BuildSettings,
) -> (BuildOrchestrator, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let orchestrator = BuildOrchestrator::new(
        Arc::new(FakeConnector { host: host.clone() }),
        settings,
        recorder.clone(),
    );
    (orchestrator, recorder)
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn test_successful_session_reports_once_and_stops_polling() {
    let host = Arc::new(FakeHost::new());
    host.script_run_lists(vec![vec![run(7, RunStatus::Queued, None)]]);
    host.script_run_states(vec![
        run(7, RunStatus::Queued, None),
        run(7, RunStatus::InProgress, None),
        run(7, RunStatus::Completed, Some(RunConclusion::Success)),
    ]);
    host.set_jobs(vec![build_job(2, 4)]);
    let (orchestrator, recorder) = orchestrator(&host, settings(Duration::ZERO, 10));

    let completed = orchestrator
        .start(model(), WorkflowVariant::Debug, credentials())
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(completed.outcome(), Outcome::Success);
    assert!(completed.error.is_none());
    assert_eq!(completed.result.run_id, Some(7));
    assert_eq!(completed.result.artifact_name, "app-debug");
    assert_eq!(
        *recorder.states.lock(),
        vec![
            BuildState::ConfiguringCredentials,
            BuildState::Preparing,
            BuildState::PushingWorkflow,
            BuildState::PushingProject,
            BuildState::Dispatching,
            BuildState::LocatingRun,
            BuildState::Monitoring,
            BuildState::Completed(Outcome::Success),
        ]
    );
    assert_eq!(*recorder.progress.lock(), vec![0, 50]);
    assert_eq!(recorder.lines.lock().len(), 4);
    assert_eq!(recorder.completed.lock().len(), 1);
    assert!(recorder.errors.lock().is_empty());
    assert!(!orchestrator.is_active("app-1"));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!recorder.states.lock().contains(&BuildState::Idle));
    assert_eq!(host.calls("get_run"), 3);
    assert_eq!(host.calls("list_jobs"), 1);
    assert_eq!(host.calls("dispatch_workflow"), 1);
    assert!(host.file(".github/workflows/apkforge-debug.yml").is_some());
    assert!(host
        .file("app/src/main/java/com/example/demo/SettingsActivity.java")
        .is_some());
}

#[tokio::test]
async fn test_artifact_is_fetched_only_on_demand() {
    let host = Arc::new(FakeHost::new());
    host.script_run_lists(vec![vec![run(8, RunStatus::Queued, None)]]);
    host.script_run_states(vec![run(8, RunStatus::Completed, Some(RunConclusion::Success))]);
    host.add_artifact("app-debug", b"PK\x03\x04apk");
    let (orchestrator, _) = orchestrator(&host, settings(Duration::ZERO, 5));

    let completed = orchestrator
        .start(model(), WorkflowVariant::Debug, credentials())
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(host.calls("list_artifacts"), 0);
    assert!(completed.retry_handle().is_none());

    let handle = completed.download_handle().unwrap();
    assert_eq!(handle.run_id(), 8);
    let download = orchestrator.download_artifact(handle).await.unwrap();

    assert_eq!(download.file_name, "app-debug.zip");
    assert_eq!(download.bytes, b"PK\x03\x04apk");
    assert_eq!(host.calls("list_artifacts"), 1);
    assert_eq!(host.calls("download_artifact"), 1);
}

#[tokio::test]
async fn test_artifact_with_unexpected_name_is_not_downloaded() {
    let host = Arc::new(FakeHost::new());
    host.script_run_lists(vec![vec![run(18, RunStatus::Queued, None)]]);
    host.script_run_states(vec![run(18, RunStatus::Completed, Some(RunConclusion::Success))]);
    host.add_artifact("lint-report", b"<html/>");
    let (orchestrator, _) = orchestrator(&host, settings(Duration::ZERO, 5));

    let completed = orchestrator
        .start(model(), WorkflowVariant::Debug, credentials())
        .unwrap()
        .wait()
        .await
        .unwrap();
    let err = orchestrator
        .download_artifact(completed.download_handle().unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(host.calls("list_artifacts"), 1);
    assert_eq!(host.calls("download_artifact"), 0);
}

#[tokio::test]
async fn test_timeout_is_reported_once_within_cap() {
    let host = Arc::new(FakeHost::new());
    host.script_run_lists(vec![vec![run(9, RunStatus::Queued, None)]]);
    host.script_run_states(vec![run(9, RunStatus::InProgress, None)]);
    let (orchestrator, recorder) = orchestrator(&host, settings(Duration::ZERO, 3));

    let completed = orchestrator
        .start(model(), WorkflowVariant::Debug, credentials())
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(completed.outcome(), Outcome::Timeout);
    let err = completed.error.clone().unwrap();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(
        err.remote_url(),
        Some("https://github.com/acme/app/actions/runs/9")
    );
    assert_eq!(recorder.completed.lock().len(), 1);
    assert!(completed.retry_handle().is_some());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(host.calls("get_run"), 3);
    assert_eq!(host.calls("cancel_run"), 0);
}

#[tokio::test]
async fn test_cancel_during_monitoring_does_not_wait_for_remote() {
    let host = Arc::new(FakeHost::new().with_hanging_cancel());
    host.script_run_lists(vec![vec![run(10, RunStatus::Queued, None)]]);
    host.script_run_states(vec![run(10, RunStatus::InProgress, None)]);
    let (orchestrator, recorder) = orchestrator(&host, settings(Duration::from_secs(10), 100));

    let handle = orchestrator
        .start(model(), WorkflowVariant::Debug, credentials())
        .unwrap();
    wait_for(|| host.calls("get_run") >= 1).await;
    handle.cancel();

    let completed = tokio::time::timeout(Duration::from_secs(2), handle.wait())
        .await
        .expect("session should stop promptly")
        .unwrap();

    assert_eq!(completed.outcome(), Outcome::Cancelled);
    assert_eq!(completed.error.as_ref().map(BuildError::kind), Some(ErrorKind::Cancelled));
    assert_eq!(recorder.completed.lock().len(), 1);
    assert!(recorder.errors.lock().is_empty());
    assert!(!orchestrator.is_active("app-1"));

    wait_for(|| host.calls("cancel_run") == 1).await;
    let polls = host.calls("get_run");
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(host.calls("get_run"), polls);
}

#[tokio::test]
async fn test_cancel_lets_in_flight_status_check_finish() {
    let host = Arc::new(FakeHost::new().with_slow_status(Duration::from_millis(100)));
    host.script_run_lists(vec![vec![run(17, RunStatus::Queued, None)]]);
    host.script_run_states(vec![run(17, RunStatus::InProgress, None)]);
    let (orchestrator, _) = orchestrator(&host, settings(Duration::from_secs(10), 100));

    let handle = orchestrator
        .start(model(), WorkflowVariant::Debug, credentials())
        .unwrap();
    wait_for(|| host.calls("get_run") == 1).await;
    handle.cancel();
    let completed = tokio::time::timeout(Duration::from_secs(2), handle.wait())
        .await
        .expect("session should stop after the current check")
        .unwrap();

    assert_eq!(completed.outcome(), Outcome::Cancelled);
    assert_eq!(host.calls("get_run"), 1);
    assert_eq!(host.calls("get_run_finished"), 1);
    assert!(completed.remote_cancel_settled().await);
    assert_eq!(host.calls("cancel_run"), 1);
}

#[tokio::test]
async fn test_cancel_after_completion_is_noop() {
    let host = Arc::new(FakeHost::new());
    host.script_run_lists(vec![vec![run(11, RunStatus::Queued, None)]]);
    host.script_run_states(vec![run(11, RunStatus::Completed, Some(RunConclusion::Success))]);
    let (orchestrator, recorder) = orchestrator(&host, settings(Duration::ZERO, 5));

    let handle = orchestrator
        .start(model(), WorkflowVariant::Debug, credentials())
        .unwrap();
    let token = handle.cancel_token();
    let completed = handle.wait().await.unwrap();
    token.cancel();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(completed.outcome(), Outcome::Success);
    assert_eq!(recorder.completed.lock().len(), 1);
    assert_eq!(host.calls("cancel_run"), 0);
}

#[tokio::test]
async fn test_second_session_for_same_app_is_rejected() {
    let host = Arc::new(FakeHost::new());
    host.script_run_lists(vec![
        vec![run(12, RunStatus::Queued, None)],
        vec![run(13, RunStatus::Queued, None)],
    ]);
    host.script_run_states(vec![run(12, RunStatus::InProgress, None)]);
    let (orchestrator, _) = orchestrator(&host, settings(Duration::from_secs(10), 100));

    let first = orchestrator
        .start(model(), WorkflowVariant::Debug, credentials())
        .unwrap();
    assert!(orchestrator.is_active("app-1"));

    let err = orchestrator
        .start(model(), WorkflowVariant::Release, credentials())
        .err()
        .unwrap();
    assert!(matches!(err, BuildError::SessionActive(ref id) if id == "app-1"));

    first.cancel();
    first.wait().await.unwrap();
    assert!(!orchestrator.is_active("app-1"));

    let again = orchestrator
        .start(model(), WorkflowVariant::Debug, credentials())
        .unwrap();
    again.cancel();
    assert_eq!(again.wait().await.unwrap().outcome(), Outcome::Cancelled);
}

#[tokio::test]
async fn test_rejected_credentials_fail_before_any_mutation() {
    let host = Arc::new(FakeHost::new());
    host.fail_verify(ApiError::Unauthorized {
        status: 401,
        message: "Bad credentials".to_string(),
    });
    let (orchestrator, recorder) = orchestrator(&host, settings(Duration::ZERO, 5));

    let completed = orchestrator
        .start(model(), WorkflowVariant::Debug, credentials())
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(completed.outcome(), Outcome::Failure);
    assert_eq!(completed.error.as_ref().map(BuildError::kind), Some(ErrorKind::Auth));
    assert_eq!(*recorder.errors.lock(), vec![ErrorKind::Auth]);
    assert_eq!(recorder.completed.lock().len(), 1);
    assert_eq!(host.mutations(), 0);
    assert!(completed.retry_handle().is_some());
}

#[tokio::test]
async fn test_invalid_model_fails_before_any_mutation() {
    let host = Arc::new(FakeHost::new());
    let (orchestrator, recorder) = orchestrator(&host, settings(Duration::ZERO, 5));
    let mut model = model();
    model.screens.clear();

    let completed = orchestrator
        .start(model, WorkflowVariant::Debug, credentials())
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(completed.outcome(), Outcome::Failure);
    assert_eq!(
        completed.error.as_ref().map(BuildError::kind),
        Some(ErrorKind::Generation)
    );
    assert_eq!(host.mutations(), 0);
    assert_eq!(
        recorder.states.lock().last(),
        Some(&BuildState::Completed(Outcome::Failure))
    );
}

#[tokio::test]
async fn test_missing_run_fails_with_run_not_found() {
    let host = Arc::new(FakeHost::new());
    let (orchestrator, _) = orchestrator(&host, settings(Duration::ZERO, 5));

    let completed = orchestrator
        .start(model(), WorkflowVariant::Debug, credentials())
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(completed.outcome(), Outcome::Failure);
    assert_eq!(
        completed.error.as_ref().map(BuildError::kind),
        Some(ErrorKind::RunNotFound)
    );
    assert_eq!(host.calls("latest_runs"), 3);
    assert_eq!(host.calls("get_run"), 0);
}

#[tokio::test]
async fn test_failed_run_can_be_retried_with_same_credentials() {
    let host = Arc::new(FakeHost::new());
    host.script_run_lists(vec![vec![run(14, RunStatus::Queued, None)]]);
    host.script_run_states(vec![run(14, RunStatus::Completed, Some(RunConclusion::Failure))]);
    let (orchestrator, recorder) = orchestrator(&host, settings(Duration::ZERO, 5));

    let failed = orchestrator
        .start(model(), WorkflowVariant::Debug, credentials())
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(failed.outcome(), Outcome::Failure);
    let err = failed.error.clone().unwrap();
    assert_eq!(err.kind(), ErrorKind::RunFailed);
    assert_eq!(
        err.remote_url(),
        Some("https://github.com/acme/app/actions/runs/14")
    );
    let head_after_first = host.head();

    host.script_run_lists(vec![vec![run(15, RunStatus::Queued, None)]]);
    host.script_run_states(vec![run(15, RunStatus::Completed, Some(RunConclusion::Success))]);
    let retry = failed.retry_handle().unwrap();
    assert_eq!(retry.app_id(), "app-1");

    let completed = orchestrator.retry(retry).unwrap().wait().await.unwrap();

    assert_eq!(completed.outcome(), Outcome::Success);
    assert_eq!(completed.result.run_id, Some(15));
    assert_eq!(host.calls("verify_access"), 1);
    assert_eq!(host.calls("dispatch_workflow"), 2);
    assert_eq!(host.head(), head_after_first);
    assert_eq!(recorder.completed.lock().len(), 2);

    let states = recorder.states.lock();
    let retried = &states[states.len() - 7..];
    assert_eq!(retried[0], BuildState::Preparing);
    assert_eq!(retried[6], BuildState::Completed(Outcome::Success));
}

#[tokio::test]
async fn test_remotely_cancelled_run_is_not_cancelled_again() {
    let host = Arc::new(FakeHost::new());
    host.script_run_lists(vec![vec![run(16, RunStatus::Queued, None)]]);
    host.script_run_states(vec![run(16, RunStatus::Completed, Some(RunConclusion::Cancelled))]);
    let (orchestrator, _) = orchestrator(&host, settings(Duration::ZERO, 5));

    let completed = orchestrator
        .start(model(), WorkflowVariant::Debug, credentials())
        .unwrap()
        .wait()
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(completed.outcome(), Outcome::Cancelled);
    assert!(!completed.remote_cancel_settled().await);
    assert_eq!(host.calls("cancel_run"), 0);
}
