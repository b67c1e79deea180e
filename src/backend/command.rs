// ABOUTME: Pipeline backend that runs a local command per pipeline run.
// ABOUTME: Run state lives in files under the state directory: run info, exit code, log.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use super::error::{BackendError, BackendResult};
use super::pipeline::{PipelineOps, PipelineRun, RunStatus};
use crate::types::{RepositoryName, RunId};

// Runs the pipeline argv, then records its exit code. The rename keeps
// readers from seeing a half-written exit file.
const WRAPPER: &str = r#""$@"; code=$?; echo "$code" > "$TAGFLIP_EXIT_FILE.tmp" && mv "$TAGFLIP_EXIT_FILE.tmp" "$TAGFLIP_EXIT_FILE""#;

/// Persisted description of a started run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub id: RunId,
    pub pipeline: String,
    pub repository: RepositoryName,
    pub started_at: DateTime<Utc>,
    pub pid: Option<u32>,
}

impl RunInfo {
    /// A run without an exit file this old is assumed dead.
    fn is_stale(&self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        let age = now - self.started_at;
        age.to_std().map(|age| age >= stale_after).unwrap_or(false)
    }
}

/// Starts pipeline runs as detached local processes.
#[derive(Debug, Clone)]
pub struct CommandPipeline {
    command: NonEmpty<String>,
    runs_dir: PathBuf,
    stale_after: Duration,
}

impl CommandPipeline {
    pub fn new(command: NonEmpty<String>, state_dir: &Path, stale_after: Duration) -> Self {
        Self {
            command,
            runs_dir: state_dir.join("pipelines"),
            stale_after,
        }
    }

    fn pipeline_dir(&self, pipeline: &str) -> PathBuf {
        self.runs_dir.join(pipeline)
    }

    fn info_path(dir: &Path, id: &RunId) -> PathBuf {
        dir.join(format!("{}.json", id))
    }

    fn exit_path(dir: &Path, id: &RunId) -> PathBuf {
        dir.join(format!("{}.exit", id))
    }

    fn log_path(dir: &Path, id: &RunId) -> PathBuf {
        dir.join(format!("{}.log", id))
    }

    async fn status_of(&self, dir: &Path, info: &RunInfo, now: DateTime<Utc>) -> RunStatus {
        match tokio::fs::read_to_string(Self::exit_path(dir, &info.id)).await {
            Ok(code) if code.trim() == "0" => RunStatus::Succeeded,
            Ok(_) => RunStatus::Failed,
            Err(_) if info.is_stale(now, self.stale_after) => {
                tracing::warn!(
                    "Run {} of {} never reported an exit code, treating as stopped",
                    info.id,
                    info.pipeline
                );
                RunStatus::Stopped
            }
            Err(_) => RunStatus::InProgress,
        }
    }
}

#[async_trait]
impl PipelineOps for CommandPipeline {
    async fn list_recent_runs(
        &self,
        pipeline: &str,
        limit: usize,
    ) -> BackendResult<Vec<PipelineRun>> {
        let dir = self.pipeline_dir(pipeline);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut infos = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<RunInfo>(&content) {
                Ok(info) => infos.push(info),
                Err(e) => tracing::warn!("Skipping unreadable run file {}: {}", path.display(), e),
            }
        }

        infos.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        infos.truncate(limit);

        let now = Utc::now();
        let mut runs = Vec::with_capacity(infos.len());
        for info in infos {
            let status = self.status_of(&dir, &info, now).await;
            runs.push(PipelineRun {
                id: info.id,
                status,
                started_at: Some(info.started_at),
            });
        }
        Ok(runs)
    }

    async fn start_run(&self, pipeline: &str, repository: &RepositoryName) -> BackendResult<RunId> {
        let dir = self.pipeline_dir(pipeline);
        tokio::fs::create_dir_all(&dir).await?;

        let id = RunId::new(uuid::Uuid::new_v4().to_string());
        let log = std::fs::File::create(Self::log_path(&dir, &id))?;
        let log_err = log.try_clone()?;

        tracing::info!("Starting {} run {} for {}", pipeline, id, repository);

        let child = Command::new("sh")
            .arg("-c")
            .arg(WRAPPER)
            .arg("tagflip-pipeline")
            .arg(self.command.first())
            .args(self.command.tail())
            .env("TAGFLIP_PIPELINE", pipeline)
            .env("TAGFLIP_RUN_ID", id.as_str())
            .env("TAGFLIP_REPOSITORY", repository.as_str())
            .env("TAGFLIP_EXIT_FILE", Self::exit_path(&dir, &id))
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .spawn()
            .map_err(|e| BackendError::Rejected(format!("failed to start {}: {}", pipeline, e)))?;

        let info = RunInfo {
            id: id.clone(),
            pipeline: pipeline.to_string(),
            repository: repository.clone(),
            started_at: Utc::now(),
            pid: child.id(),
        };
        tokio::fs::write(Self::info_path(&dir, &id), serde_json::to_vec(&info)?).await?;

        Ok(id)
    }
}
