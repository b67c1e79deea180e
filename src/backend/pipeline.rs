// ABOUTME: Deployment pipeline operations: list recent runs and start a new one.
// ABOUTME: The control loop only reads run status; it never owns a run's lifecycle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::BackendResult;
use crate::types::{RepositoryName, RunId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStatus {
    InProgress,
    Stopping,
    Stopped,
    Succeeded,
    Superseded,
    Failed,
}

impl RunStatus {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, RunStatus::InProgress)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::InProgress => "InProgress",
            RunStatus::Stopping => "Stopping",
            RunStatus::Stopped => "Stopped",
            RunStatus::Succeeded => "Succeeded",
            RunStatus::Superseded => "Superseded",
            RunStatus::Failed => "Failed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: RunId,
    pub status: RunStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait PipelineOps: Send + Sync {
    /// Up to `limit` most recent runs of `pipeline`, newest first.
    async fn list_recent_runs(&self, pipeline: &str, limit: usize)
    -> BackendResult<Vec<PipelineRun>>;

    /// Start a run of `pipeline` for `repository` without waiting for it.
    async fn start_run(&self, pipeline: &str, repository: &RepositoryName) -> BackendResult<RunId>;
}
