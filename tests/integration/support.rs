//! In-memory git host used by the repository and orchestrator tests.
//!
//! Objects are content-addressed with blake3 so identical trees get identical ids, which is
//! what makes commit idempotency observable. Every trait call is counted.

use apkforge::build::HostConnector;
use apkforge::error::ApiError;
use apkforge::generator::Encoding;
use apkforge::repository::{
    Artifact, CommitObject, GitHost, Job, NewTreeEntry, PutContents, RemoteFile,
    RepositoryCredentials, RunConclusion, RunStatus, Step, TreeObject, WorkflowRun,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

pub const BRANCH: &str = "main";

fn object_id(kind: &str, parts: &[&[u8]]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(kind.as_bytes());
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hex::encode(&hasher.finalize().as_bytes()[..20])
}

#[derive(Default)]
struct State {
    blobs: HashMap<String, Vec<u8>>,
    trees: HashMap<String, BTreeMap<String, String>>,
    commits: HashMap<String, (String, Vec<String>)>,
    refs: HashMap<String, String>,
    calls: HashMap<&'static str, usize>,
    run_lists: VecDeque<Vec<WorkflowRun>>,
    run_states: VecDeque<WorkflowRun>,
    jobs: Vec<Job>,
    artifacts: Vec<Artifact>,
    artifact_bytes: HashMap<u64, Vec<u8>>,
    verify_error: Option<ApiError>,
}

/// Scriptable in-memory [`GitHost`].
pub struct FakeHost {
    state: Mutex<State>,
    placeholder_dirs: bool,
    cancel_hangs: bool,
    status_delay: Option<Duration>,
}

impl FakeHost {
    /// Host with `main` pointing at an empty root commit.
    pub fn new() -> Self {
        let host = Self {
            state: Mutex::new(State::default()),
            placeholder_dirs: false,
            cancel_hangs: false,
            status_delay: None,
        };
        {
            let mut state = host.state.lock();
            let tree = Self::store_tree(&mut state, BTreeMap::new());
            let commit = Self::store_commit(&mut state, &tree, Vec::new(), "root");
            state.refs.insert(BRANCH.to_string(), commit);
        }
        host
    }

    pub fn with_placeholder_dirs(mut self) -> Self {
        self.placeholder_dirs = true;
        self
    }

    /// `cancel_run` never returns once called.
    pub fn with_hanging_cancel(mut self) -> Self {
        self.cancel_hangs = true;
        self
    }

    /// Every `get_run` takes `delay`; completed calls are counted as `get_run_finished`.
    pub fn with_slow_status(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub fn calls(&self, method: &str) -> usize {
        self.state.lock().calls.get(method).copied().unwrap_or(0)
    }

    /// Calls that change remote state.
    pub fn mutations(&self) -> usize {
        [
            "create_blob",
            "create_tree",
            "create_commit",
            "update_ref",
            "put_contents",
            "dispatch_workflow",
        ]
        .iter()
        .map(|m| self.calls(m))
        .sum()
    }

    pub fn head(&self) -> String {
        self.state.lock().refs.get(BRANCH).cloned().unwrap_or_default()
    }

    /// File content at the branch head.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        let state = self.state.lock();
        Self::read_file(&state, BRANCH, path)
    }

    /// Responses for successive `latest_runs` calls; an exhausted script returns no runs.
    pub fn script_run_lists(&self, lists: Vec<Vec<WorkflowRun>>) {
        self.state.lock().run_lists = lists.into();
    }

    /// Responses for successive `get_run` calls; the last one repeats.
    pub fn script_run_states(&self, states: Vec<WorkflowRun>) {
        self.state.lock().run_states = states.into();
    }

    pub fn set_jobs(&self, jobs: Vec<Job>) {
        self.state.lock().jobs = jobs;
    }

    pub fn add_artifact(&self, name: &str, bytes: &[u8]) -> Artifact {
        let mut state = self.state.lock();
        let artifact = Artifact {
            id: 500 + state.artifacts.len() as u64,
            name: name.to_string(),
            size_in_bytes: bytes.len() as u64,
            expired: false,
        };
        state.artifact_bytes.insert(artifact.id, bytes.to_vec());
        state.artifacts.push(artifact.clone());
        artifact
    }

    pub fn fail_verify(&self, error: ApiError) {
        self.state.lock().verify_error = Some(error);
    }

    fn count(&self, method: &'static str) {
        *self.state.lock().calls.entry(method).or_insert(0) += 1;
    }

    fn store_tree(state: &mut State, entries: BTreeMap<String, String>) -> String {
        let flat: Vec<u8> = entries
            .iter()
            .flat_map(|(path, sha)| [path.as_bytes(), &b"\0"[..], sha.as_bytes(), &b"\n"[..]].concat())
            .collect();
        let sha = object_id("tree", &[&flat]);
        state.trees.insert(sha.clone(), entries);
        sha
    }

    fn store_commit(state: &mut State, tree: &str, parents: Vec<String>, message: &str) -> String {
        let joined = parents.join(",");
        let sha = object_id(
            "commit",
            &[tree.as_bytes(), joined.as_bytes(), message.as_bytes()],
        );
        state.commits.insert(sha.clone(), (tree.to_string(), parents));
        sha
    }

    fn head_tree(state: &State, branch: &str) -> Option<BTreeMap<String, String>> {
        let head = state.refs.get(branch)?;
        let (tree, _) = state.commits.get(head)?;
        state.trees.get(tree).cloned()
    }

    fn read_file(state: &State, branch: &str, path: &str) -> Option<Vec<u8>> {
        let tree = Self::head_tree(state, branch)?;
        let blob = tree.get(path)?;
        state.blobs.get(blob).cloned()
    }
}

pub fn run(id: u64, status: RunStatus, conclusion: Option<RunConclusion>) -> WorkflowRun {
    WorkflowRun {
        id,
        name: Some("apkforge debug build".to_string()),
        status,
        conclusion,
        html_url: format!("https://github.com/acme/app/actions/runs/{}", id),
        created_at: Utc::now(),
        updated_at: None,
        jobs_url: None,
        run_attempt: Some(1),
    }
}

pub fn build_job(done: usize, total: usize) -> Job {
    Job {
        id: 1,
        name: "build".to_string(),
        status: RunStatus::InProgress,
        conclusion: None,
        steps: (0..total)
            .map(|i| Step {
                name: format!("step {}", i + 1),
                status: if i < done {
                    RunStatus::Completed
                } else {
                    RunStatus::Queued
                },
                conclusion: (i < done).then_some(RunConclusion::Success),
                number: i as u32 + 1,
            })
            .collect(),
    }
}

#[async_trait]
impl GitHost for FakeHost {
    async fn verify_access(&self) -> Result<(), ApiError> {
        self.count("verify_access");
        match self.state.lock().verify_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn get_ref(&self, branch: &str) -> Result<String, ApiError> {
        self.count("get_ref");
        self.state
            .lock()
            .refs
            .get(branch)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("branch {}", branch)))
    }

    async fn get_commit(&self, sha: &str) -> Result<CommitObject, ApiError> {
        self.count("get_commit");
        let state = self.state.lock();
        let (tree, _) = state
            .commits
            .get(sha)
            .ok_or_else(|| ApiError::NotFound(format!("commit {}", sha)))?;
        Ok(CommitObject {
            sha: sha.to_string(),
            tree_sha: tree.clone(),
        })
    }

    async fn get_tree(&self, sha: &str) -> Result<TreeObject, ApiError> {
        self.count("get_tree");
        let state = self.state.lock();
        let tree = state
            .trees
            .get(sha)
            .ok_or_else(|| ApiError::NotFound(format!("tree {}", sha)))?;
        Ok(TreeObject {
            sha: sha.to_string(),
            entry_count: tree.len(),
        })
    }

    async fn create_blob(&self, content: &str, encoding: Encoding) -> Result<String, ApiError> {
        self.count("create_blob");
        let bytes = match encoding {
            Encoding::Plain => content.as_bytes().to_vec(),
            Encoding::Base64 => STANDARD
                .decode(content)
                .map_err(|e| ApiError::Decode(e.to_string()))?,
        };
        let sha = object_id("blob", &[&bytes]);
        self.state.lock().blobs.insert(sha.clone(), bytes);
        Ok(sha)
    }

    async fn create_tree(
        &self,
        base_tree: &str,
        entries: &[NewTreeEntry],
    ) -> Result<String, ApiError> {
        self.count("create_tree");
        let mut state = self.state.lock();
        let mut tree = state
            .trees
            .get(base_tree)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("tree {}", base_tree)))?;
        for entry in entries {
            tree.insert(entry.path.clone(), entry.sha.clone());
        }
        Ok(Self::store_tree(&mut state, tree))
    }

    async fn create_commit(
        &self,
        message: &str,
        tree: &str,
        parents: &[String],
    ) -> Result<String, ApiError> {
        self.count("create_commit");
        let mut state = self.state.lock();
        Ok(Self::store_commit(&mut state, tree, parents.to_vec(), message))
    }

    async fn update_ref(&self, branch: &str, sha: &str, force: bool) -> Result<(), ApiError> {
        self.count("update_ref");
        let mut state = self.state.lock();
        let current = state
            .refs
            .get(branch)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("branch {}", branch)))?;
        let fast_forward = state
            .commits
            .get(sha)
            .map(|(_, parents)| parents.contains(&current))
            .unwrap_or(false);
        if !force && !fast_forward {
            return Err(ApiError::Status {
                status: 422,
                message: "Update is not a fast forward".to_string(),
                url: None,
            });
        }
        state.refs.insert(branch.to_string(), sha.to_string());
        Ok(())
    }

    async fn get_contents(
        &self,
        path: &str,
        branch: &str,
    ) -> Result<Option<RemoteFile>, ApiError> {
        self.count("get_contents");
        let state = self.state.lock();
        let Some(tree) = Self::head_tree(&state, branch) else {
            return Ok(None);
        };
        Ok(tree.get(path).and_then(|blob| {
            state.blobs.get(blob).map(|content| RemoteFile {
                sha: blob.clone(),
                content: content.clone(),
            })
        }))
    }

    async fn put_contents(&self, request: &PutContents<'_>) -> Result<(), ApiError> {
        self.count("put_contents");
        let mut state = self.state.lock();
        let mut tree = Self::head_tree(&state, request.branch)
            .ok_or_else(|| ApiError::NotFound(format!("branch {}", request.branch)))?;

        let dir = request.path.rsplit_once('/').map(|(d, _)| d);
        if self.placeholder_dirs && request.sha.is_none() {
            if let Some(dir) = dir {
                let dir_exists = tree.keys().any(|p| p.starts_with(&format!("{}/", dir)));
                let is_placeholder = request.path.ends_with("/.gitkeep");
                if !dir_exists && !is_placeholder {
                    return Err(ApiError::Status {
                        status: 422,
                        message: format!("directory {} does not exist", dir),
                        url: None,
                    });
                }
            }
        }
        if tree.get(request.path).map(String::as_str) != request.sha {
            return Err(ApiError::Status {
                status: 409,
                message: format!("{} does not match", request.path),
                url: None,
            });
        }

        let blob = object_id("blob", &[request.content]);
        state.blobs.insert(blob.clone(), request.content.to_vec());
        tree.insert(request.path.to_string(), blob);
        let tree_sha = Self::store_tree(&mut state, tree);
        let parent = state.refs.get(request.branch).cloned().unwrap_or_default();
        let commit = Self::store_commit(&mut state, &tree_sha, vec![parent], request.message);
        state.refs.insert(request.branch.to_string(), commit);
        Ok(())
    }

    fn requires_directory_placeholder(&self) -> bool {
        self.placeholder_dirs
    }

    async fn dispatch_workflow(&self, workflow: &str, branch: &str) -> Result<(), ApiError> {
        self.count("dispatch_workflow");
        let state = self.state.lock();
        if !state.refs.contains_key(branch) {
            return Err(ApiError::NotFound(format!("branch {}", branch)));
        }
        match Self::read_file(&state, branch, &format!(".github/workflows/{}", workflow)) {
            Some(_) => Ok(()),
            None => Err(ApiError::NotFound(format!("workflow {}", workflow))),
        }
    }

    async fn latest_runs(
        &self,
        _workflow: &str,
        _branch: &str,
    ) -> Result<Vec<WorkflowRun>, ApiError> {
        self.count("latest_runs");
        Ok(self.state.lock().run_lists.pop_front().unwrap_or_default())
    }

    async fn get_run(&self, run_id: u64) -> Result<WorkflowRun, ApiError> {
        self.count("get_run");
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }
        let next = {
            let mut state = self.state.lock();
            if state.run_states.len() > 1 {
                state.run_states.pop_front()
            } else {
                state.run_states.front().cloned()
            }
        };
        self.count("get_run_finished");
        next.ok_or_else(|| ApiError::NotFound(format!("run {}", run_id)))
    }

    async fn list_jobs(&self, _run_id: u64) -> Result<Vec<Job>, ApiError> {
        self.count("list_jobs");
        Ok(self.state.lock().jobs.clone())
    }

    async fn cancel_run(&self, _run_id: u64) -> Result<(), ApiError> {
        self.count("cancel_run");
        if self.cancel_hangs {
            futures::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn rerun(&self, _run_id: u64) -> Result<(), ApiError> {
        self.count("rerun");
        Ok(())
    }

    async fn list_artifacts(&self, _run_id: u64) -> Result<Vec<Artifact>, ApiError> {
        self.count("list_artifacts");
        Ok(self.state.lock().artifacts.clone())
    }

    async fn download_artifact(&self, artifact_id: u64) -> Result<Vec<u8>, ApiError> {
        self.count("download_artifact");
        self.state
            .lock()
            .artifact_bytes
            .get(&artifact_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("artifact {}", artifact_id)))
    }
}

/// Hands out the same [`FakeHost`] for any credentials.
pub struct FakeConnector {
    pub host: Arc<FakeHost>,
}

impl HostConnector for FakeConnector {
    fn connect(&self, _credentials: &RepositoryCredentials) -> Result<Arc<dyn GitHost>, ApiError> {
        let host: Arc<dyn GitHost> = self.host.clone();
        Ok(host)
    }
}

pub fn credentials() -> RepositoryCredentials {
    RepositoryCredentials::new("acme", "app", "test-token", BRANCH)
}
