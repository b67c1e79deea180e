// ABOUTME: Orchestration error type with SNAFU context selectors.
// ABOUTME: Every failure maps to one ErrorKind so callers can match exhaustively.

use snafu::Snafu;

use crate::backend::BackendError;
use crate::types::{ExecutionId, RepositoryName, RunId, VersionFormatError};

/// How far a rollback got before a registry call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackStep {
    /// Removing the mutable tag from the current image.
    DeleteMutableTag,
    /// Pointing the mutable tag at the rollback target.
    PutMutableTag,
    /// Removing the numeric tag that was rolled back to.
    DeleteVersionTag,
}

impl RollbackStep {
    /// Registry state left behind when this step fails.
    pub fn leaves(&self, mutable_tag: &str, target: &str) -> String {
        match self {
            RollbackStep::DeleteMutableTag => "registry unchanged".to_string(),
            RollbackStep::PutMutableTag => format!(
                "`{mutable_tag}` is missing and `{target}` still points at the rollback target; \
                 re-tag `{target}` as `{mutable_tag}`"
            ),
            RollbackStep::DeleteVersionTag => format!(
                "`{mutable_tag}` and `{target}` both point at the rollback target; \
                 delete `{target}` to finish"
            ),
        }
    }
}

impl std::fmt::Display for RollbackStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollbackStep::DeleteMutableTag => write!(f, "delete mutable tag"),
            RollbackStep::PutMutableTag => write!(f, "re-tag mutable tag"),
            RollbackStep::DeleteVersionTag => write!(f, "delete version tag"),
        }
    }
}

fn join_runs(runs: &[RunId]) -> String {
    runs.iter()
        .map(RunId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ControlError {
    #[snafu(display("pipeline {pipeline} is still running ({})", join_runs(runs)))]
    Busy { pipeline: String, runs: Vec<RunId> },

    #[snafu(display("failed to list runs of pipeline {pipeline}: {source}"))]
    PipelineStatus {
        pipeline: String,
        source: BackendError,
    },

    #[snafu(display("failed to start pipeline {pipeline}: {source}"))]
    PipelineStart {
        pipeline: String,
        source: BackendError,
    },

    #[snafu(display("no version tag found in {repository}"))]
    NoVersionTag { repository: RepositoryName },

    #[snafu(display("{repository}: {source}"))]
    Format {
        repository: RepositoryName,
        source: VersionFormatError,
    },

    #[snafu(display("failed to {operation} in {repository}: {source}"))]
    Registry {
        operation: &'static str,
        repository: RepositoryName,
        source: BackendError,
    },

    #[snafu(display(
        "rollback of {repository} to {target} failed at {step}: {source} ({})",
        step.leaves(mutable_tag, target)
    ))]
    RollbackIncomplete {
        repository: RepositoryName,
        target: String,
        mutable_tag: String,
        step: RollbackStep,
        source: BackendError,
    },

    #[snafu(display("failed to read audit history: {source}"))]
    HistoryRead { source: BackendError },

    #[snafu(display("{action} applied but audit record {execution_id} was not written: {source}"))]
    HistoryWrite {
        action: crate::types::Action,
        execution_id: ExecutionId,
        source: BackendError,
    },
}

/// Error category for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The pipeline has a run in progress.
    Concurrency,
    /// A tag did not have the expected version shape.
    Format,
    /// An external call failed.
    Infrastructure,
}

impl ControlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ControlError::Busy { .. } => ErrorKind::Concurrency,
            ControlError::NoVersionTag { .. } | ControlError::Format { .. } => ErrorKind::Format,
            ControlError::PipelineStatus { .. }
            | ControlError::PipelineStart { .. }
            | ControlError::Registry { .. }
            | ControlError::RollbackIncomplete { .. }
            | ControlError::HistoryRead { .. }
            | ControlError::HistoryWrite { .. } => ErrorKind::Infrastructure,
        }
    }

    /// Step reached by a rollback that stopped partway.
    pub fn rollback_step(&self) -> Option<RollbackStep> {
        match self {
            ControlError::RollbackIncomplete { step, .. } => Some(*step),
            _ => None,
        }
    }
}
