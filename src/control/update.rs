// ABOUTME: Update: start the deployment pipeline and record the version it will produce.
// ABOUTME: Never touches registry tags; the pipeline does the push.

use snafu::ResultExt;

use super::controller::Controller;
use super::error::{ControlError, PipelineStartSnafu};
use super::guard::ensure_idle;
use super::outcome::Completion;
use crate::types::{AuditRecord, RepositoryName};

/// Start a deployment for `repository` unless it is busy or self-triggered.
///
/// The recorded versions come from the tags seen before the pipeline runs:
/// `before` is the newest numeric tag, `after` is its minor bump.
pub async fn update(
    ctl: &Controller,
    repository: &RepositoryName,
) -> Result<Completion, ControlError> {
    let settings = &ctl.settings;

    ensure_idle(ctl.pipeline.as_ref(), &settings.pipeline, settings.history_depth).await?;

    let now = ctl.clock.now();
    if ctl.filter.was_just_rolled_back(repository, now).await? {
        let reason = format!(
            "{} was rolled back less than {}s ago; treating the event as self-triggered",
            repository,
            settings.window.as_secs_f64()
        );
        tracing::warn!("Skipping update: {}", reason);
        return Ok(Completion::Skipped { reason });
    }

    let resolved = ctl.resolve_version_tag(repository).await?;
    tracing::info!(
        "Updating {}: {} -> {}",
        repository,
        resolved.bump.before(),
        resolved.bump.after()
    );

    let run = ctl
        .pipeline
        .start_run(&settings.pipeline, repository)
        .await
        .context(PipelineStartSnafu {
            pipeline: settings.pipeline.as_str(),
        })?;
    tracing::info!("Started {} run {}", settings.pipeline, run);

    let record = AuditRecord::update(
        &run,
        repository,
        &resolved.bump,
        &settings.mutable_tag,
        ctl.clock.now(),
    );
    ctl.history.append(&record).await?;

    Ok(Completion::Applied {
        record,
        warnings: Vec::new(),
    })
}
