// ABOUTME: Builds the controller and its collaborators from configuration.
// ABOUTME: Docker registry, command pipeline and file-backed records and markers.

use std::path::Path;
use std::sync::Arc;

use tagflip::backend::command::CommandPipeline;
use tagflip::backend::docker::DockerRegistry;
use tagflip::backend::file::{FileMarkerStore, JsonlRecordStore};
use tagflip::config::Config;
use tagflip::control::{Controller, HistoryRecorder};
use tagflip::error::Result;

/// Wire a controller for `config`, resolving the state directory against `base`.
pub fn controller(config: &Config, base: &Path) -> Result<Controller> {
    let settings = config.control_settings()?;
    let state_dir = config.state_dir(base);
    let endpoint = config.registry_endpoint()?;

    let registry = Arc::new(DockerRegistry::connect(endpoint.as_deref())?);
    let pipeline = Arc::new(CommandPipeline::new(
        config.pipeline.command.clone(),
        &state_dir,
        config.pipeline.stale_after,
    ));
    let records = Arc::new(JsonlRecordStore::new(&state_dir, &config.records_name()?));
    let markers = Arc::new(FileMarkerStore::new(&state_dir));

    tracing::debug!(
        "Controller for pipeline {} with state in {}",
        settings.pipeline,
        state_dir.display()
    );

    Ok(Controller::new(registry, pipeline, records, settings).with_markers(markers))
}

/// History access only; needs no registry connection.
pub fn history(config: &Config, base: &Path) -> Result<HistoryRecorder> {
    let state_dir = config.state_dir(base);
    let records = Arc::new(JsonlRecordStore::new(&state_dir, &config.records_name()?));
    Ok(HistoryRecorder::new(records))
}
