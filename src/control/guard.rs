// ABOUTME: Execution guard: refuse new work while the pipeline has a run in progress.
// ABOUTME: A read-then-act check; runs started after the read are not seen.

use snafu::ResultExt;

use super::error::{BusySnafu, ControlError, PipelineStatusSnafu};
use crate::backend::PipelineOps;

/// Fewest recent runs inspected, whatever the configuration says.
pub const MIN_HISTORY_DEPTH: usize = 10;

/// Fail with [`ControlError::Busy`] if any recent run of `pipeline` is in progress.
///
/// This narrows, but does not close, the window in which two invocations
/// can act on the same repository.
pub async fn ensure_idle<P>(runs: &P, pipeline: &str, depth: usize) -> Result<(), ControlError>
where
    P: PipelineOps + ?Sized,
{
    let recent = runs
        .list_recent_runs(pipeline, depth.max(MIN_HISTORY_DEPTH))
        .await
        .context(PipelineStatusSnafu { pipeline })?;

    let in_progress: Vec<_> = recent
        .into_iter()
        .filter(|run| run.status.is_in_progress())
        .map(|run| run.id)
        .collect();

    if !in_progress.is_empty() {
        tracing::warn!(
            "Pipeline {} has {} run(s) in progress",
            pipeline,
            in_progress.len()
        );
        return BusySnafu {
            pipeline,
            runs: in_progress,
        }
        .fail();
    }

    tracing::debug!("Pipeline {} is idle", pipeline);
    Ok(())
}
