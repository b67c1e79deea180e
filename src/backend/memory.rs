// ABOUTME: In-memory backends for the registry, pipeline and stores.
// ABOUTME: Record every call so tests can assert which mutations happened.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::error::{BackendError, BackendResult};
use super::pipeline::{PipelineOps, PipelineRun, RunStatus};
use super::registry::{Manifest, RegistryOps};
use super::store::{MarkerStore, RecordStore, SuppressionMarker};
use crate::types::{AuditRecord, RepositoryName, RunId};

// ---------------------------------------------------------------------------
// MemoryRegistry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryCall {
    ListTags,
    GetManifest,
    DeleteTag,
    PutTag,
}

impl RegistryCall {
    pub fn is_mutating(&self) -> bool {
        matches!(self, RegistryCall::DeleteTag | RegistryCall::PutTag)
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    // Insertion order is the listing order.
    repositories: HashMap<String, Vec<(String, Manifest)>>,
    calls: Vec<RegistryCall>,
    failing: HashSet<RegistryCall>,
}

/// Registry holding `tag -> manifest` bindings per repository.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    state: Mutex<RegistryState>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a binding; builder style for test setup.
    pub fn with_tag(self, repository: &str, tag: &str, manifest: &str) -> Self {
        self.bind(repository, tag, Manifest::new(manifest));
        self
    }

    /// Make every subsequent call of the given kind fail.
    pub fn fail_on(&self, call: RegistryCall) {
        self.state.lock().failing.insert(call);
    }

    /// Current bindings for a repository, in listing order.
    pub fn bindings(&self, repository: &str) -> Vec<(String, Manifest)> {
        self.state
            .lock()
            .repositories
            .get(repository)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.state.lock().calls.clone()
    }

    pub fn mutating_calls(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.is_mutating())
            .count()
    }

    fn bind(&self, repository: &str, tag: &str, manifest: Manifest) {
        let mut state = self.state.lock();
        let tags = state.repositories.entry(repository.to_string()).or_default();
        match tags.iter_mut().find(|(t, _)| t == tag) {
            Some(entry) => entry.1 = manifest,
            None => tags.push((tag.to_string(), manifest)),
        }
    }

    fn record(&self, call: RegistryCall) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if state.failing.contains(&call) {
            return Err(BackendError::Unavailable(format!(
                "injected failure on {:?}",
                call
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RegistryOps for MemoryRegistry {
    async fn list_tags(&self, repository: &RepositoryName) -> BackendResult<Vec<String>> {
        self.record(RegistryCall::ListTags)?;
        let state = self.state.lock();
        let tags = state
            .repositories
            .get(repository.as_str())
            .ok_or_else(|| BackendError::not_found("repository", repository.as_str()))?;
        Ok(tags.iter().map(|(t, _)| t.clone()).collect())
    }

    async fn get_manifest(
        &self,
        repository: &RepositoryName,
        tag: &str,
    ) -> BackendResult<Manifest> {
        self.record(RegistryCall::GetManifest)?;
        self.bindings(repository.as_str())
            .into_iter()
            .find(|(t, _)| t == tag)
            .map(|(_, m)| m)
            .ok_or_else(|| BackendError::not_found("tag", format!("{}:{}", repository, tag)))
    }

    async fn delete_tag(&self, repository: &RepositoryName, tag: &str) -> BackendResult<()> {
        self.record(RegistryCall::DeleteTag)?;
        let mut state = self.state.lock();
        let tags = state
            .repositories
            .get_mut(repository.as_str())
            .ok_or_else(|| BackendError::not_found("repository", repository.as_str()))?;
        let before = tags.len();
        tags.retain(|(t, _)| t != tag);
        if tags.len() == before {
            return Err(BackendError::not_found(
                "tag",
                format!("{}:{}", repository, tag),
            ));
        }
        Ok(())
    }

    async fn put_tag(
        &self,
        repository: &RepositoryName,
        tag: &str,
        manifest: &Manifest,
    ) -> BackendResult<()> {
        self.record(RegistryCall::PutTag)?;
        self.bind(repository.as_str(), tag, manifest.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryPipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct PipelineState {
    // Oldest first.
    runs: Vec<PipelineRun>,
    started: Vec<(RunId, RepositoryName)>,
    list_calls: usize,
    fail_list: bool,
    fail_start: bool,
    next_id: u64,
}

/// Pipeline whose runs stay `InProgress` until completed by the test.
#[derive(Debug, Default)]
pub struct MemoryPipeline {
    state: Mutex<PipelineState>,
}

impl MemoryPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run(self, id: &str, status: RunStatus) -> Self {
        self.state.lock().runs.push(PipelineRun {
            id: RunId::new(id),
            status,
            started_at: Some(Utc::now()),
        });
        self
    }

    pub fn fail_listing(&self) {
        self.state.lock().fail_list = true;
    }

    pub fn fail_starting(&self) {
        self.state.lock().fail_start = true;
    }

    /// Move every in-progress run to `status`.
    pub fn complete_all(&self, status: RunStatus) {
        for run in self.state.lock().runs.iter_mut() {
            if run.status.is_in_progress() {
                run.status = status;
            }
        }
    }

    /// Runs started through `start_run`, in order.
    pub fn started(&self) -> Vec<(RunId, RepositoryName)> {
        self.state.lock().started.clone()
    }

    /// Times `list_recent_runs` was called.
    pub fn list_calls(&self) -> usize {
        self.state.lock().list_calls
    }
}

#[async_trait]
impl PipelineOps for MemoryPipeline {
    async fn list_recent_runs(
        &self,
        pipeline: &str,
        limit: usize,
    ) -> BackendResult<Vec<PipelineRun>> {
        let mut state = self.state.lock();
        state.list_calls += 1;
        if state.fail_list {
            return Err(BackendError::Unavailable(format!(
                "cannot list runs of {}",
                pipeline
            )));
        }
        Ok(state.runs.iter().rev().take(limit).cloned().collect())
    }

    async fn start_run(&self, pipeline: &str, repository: &RepositoryName) -> BackendResult<RunId> {
        let mut state = self.state.lock();
        if state.fail_start {
            return Err(BackendError::Rejected(format!(
                "cannot start {}",
                pipeline
            )));
        }
        state.next_id += 1;
        let id = RunId::new(format!("{}-run-{}", pipeline, state.next_id));
        state.runs.push(PipelineRun {
            id: id.clone(),
            status: RunStatus::InProgress,
            started_at: Some(Utc::now()),
        });
        state.started.push((id.clone(), repository.clone()));
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// MemoryRecordStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RecordState {
    records: Vec<AuditRecord>,
    fail_put: bool,
    fail_scan: bool,
}

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    state: Mutex<RecordState>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: AuditRecord) -> Self {
        self.state.lock().records.push(record);
        self
    }

    pub fn fail_puts(&self) {
        self.state.lock().fail_put = true;
    }

    pub fn fail_scans(&self) {
        self.state.lock().fail_scan = true;
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.state.lock().records.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put(&self, record: &AuditRecord) -> BackendResult<()> {
        let mut state = self.state.lock();
        if state.fail_put {
            return Err(BackendError::Unavailable("record store is read-only".into()));
        }
        state.records.push(record.clone());
        Ok(())
    }

    async fn scan_all(&self) -> BackendResult<Vec<AuditRecord>> {
        let state = self.state.lock();
        if state.fail_scan {
            return Err(BackendError::Unavailable("record store scan failed".into()));
        }
        Ok(state.records.clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryMarkerStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryMarkerStore {
    markers: Mutex<HashMap<RepositoryName, SuppressionMarker>>,
}

impl MemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.lock().is_empty()
    }
}

#[async_trait]
impl MarkerStore for MemoryMarkerStore {
    async fn set_marker(&self, marker: &SuppressionMarker) -> BackendResult<()> {
        self.markers
            .lock()
            .insert(marker.repository.clone(), marker.clone());
        Ok(())
    }

    async fn get_marker(
        &self,
        repository: &RepositoryName,
    ) -> BackendResult<Option<SuppressionMarker>> {
        Ok(self.markers.lock().get(repository).cloned())
    }

    async fn clear_marker(&self, repository: &RepositoryName) -> BackendResult<()> {
        self.markers.lock().remove(repository);
        Ok(())
    }
}
