// ABOUTME: Rollback: point the mutable tag back at the newest numeric tag, then drop that tag.
// ABOUTME: Linear, no retries; a failure partway reports the registry state it left.

use snafu::ResultExt;

use super::controller::Controller;
use super::error::{ControlError, RegistrySnafu, RollbackIncompleteSnafu, RollbackStep};
use super::filter::window_delta;
use super::guard::ensure_idle;
use super::outcome::Completion;
use crate::backend::SuppressionMarker;
use crate::diagnostics::{Diagnostics, Warning};
use crate::types::{AuditRecord, RepositoryName};

/// Roll `repository` back to its newest numeric tag.
///
/// 1. Refuse if the pipeline has a run in progress
/// 2. Pick the newest non-mutable tag T and check it is `<major>.<minor>`
/// 3. Fetch the manifest T points at
/// 4. Remove the mutable tag from the current image
/// 5. Bind the mutable tag to T's manifest
/// 6. Delete T, leaving only the mutable tag
/// 7. Append a rollback record
///
/// Nothing is mutated before step 4, so a bad tag shape fails with the
/// registry untouched. When steps 4-6 fail the error names the step and the
/// state it left; no record is written. A suppression marker is set once
/// step 4 has gone through and refreshed after step 7 when a marker store is
/// configured, so a rollback that changed nothing never suppresses updates.
pub async fn rollback(
    ctl: &Controller,
    repository: &RepositoryName,
) -> Result<Completion, ControlError> {
    let settings = &ctl.settings;
    let mutable = settings.mutable_tag.as_str();
    let mut diag = Diagnostics::default();

    ensure_idle(ctl.pipeline.as_ref(), &settings.pipeline, settings.history_depth).await?;

    let resolved = ctl.resolve_version_tag(repository).await?;
    let target = resolved.tag.as_str();
    tracing::info!("Rolling {} back to {}", repository, target);

    let manifest = ctl
        .registry
        .get_manifest(repository, target)
        .await
        .context(RegistrySnafu {
            operation: "fetch manifest",
            repository: repository.clone(),
        })?;

    let incomplete = |step| RollbackIncompleteSnafu {
        repository: repository.clone(),
        target,
        mutable_tag: mutable,
        step,
    };

    match ctl.registry.delete_tag(repository, mutable).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => diag.warn(Warning::mutable_tag_missing(format!(
            "{} had no `{}` tag to remove",
            repository, mutable
        ))),
        Err(e) => return Err(e).context(incomplete(RollbackStep::DeleteMutableTag)),
    }

    set_marker(ctl, repository, &mut diag).await;

    ctl.registry
        .put_tag(repository, mutable, &manifest)
        .await
        .context(incomplete(RollbackStep::PutMutableTag))?;

    ctl.registry
        .delete_tag(repository, target)
        .await
        .context(incomplete(RollbackStep::DeleteVersionTag))?;

    if !resolved.others.is_empty() {
        diag.warn(Warning::older_version_tags(format!(
            "{} still has version tag(s) {}",
            repository,
            resolved.others.join(", ")
        )));
    }

    let record = AuditRecord::rollback(
        repository,
        target,
        &resolved.bump,
        mutable,
        ctl.clock.now(),
    );
    ctl.history.append(&record).await?;

    set_marker(ctl, repository, &mut diag).await;

    tracing::info!(
        "Rolled {} back from {} to {}",
        repository,
        record.version_before,
        target
    );

    Ok(Completion::Applied {
        record,
        warnings: diag.into_warnings(),
    })
}

async fn set_marker(ctl: &Controller, repository: &RepositoryName, diag: &mut Diagnostics) {
    let Some(markers) = &ctl.markers else {
        return;
    };

    let marker = SuppressionMarker::new(
        repository,
        ctl.clock.now(),
        window_delta(ctl.settings.window),
    );
    if let Err(e) = markers.set_marker(&marker).await {
        diag.warn(Warning::marker_write(format!(
            "suppression marker for {} not written: {}",
            repository, e
        )));
    }
}
