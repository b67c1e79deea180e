// ABOUTME: Shared fixtures for controller integration tests.
// ABOUTME: Wires a controller over in-memory backends with a fixed clock.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tagflip::backend::memory::{
    MemoryMarkerStore, MemoryPipeline, MemoryRecordStore, MemoryRegistry,
};
use tagflip::control::{ControlSettings, Controller, DebounceMode, FixedClock};
use tagflip::types::RepositoryName;

pub const PIPELINE: &str = "web-deploy";

pub struct Harness {
    pub registry: Arc<MemoryRegistry>,
    pub pipeline: Arc<MemoryPipeline>,
    pub records: Arc<MemoryRecordStore>,
    pub markers: Arc<MemoryMarkerStore>,
    pub clock: Arc<FixedClock>,
    pub controller: Controller,
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap()
}

pub fn repo(name: &str) -> RepositoryName {
    RepositoryName::new(name).unwrap()
}

pub fn harness(registry: MemoryRegistry, pipeline: MemoryPipeline) -> Harness {
    harness_with(registry, pipeline, DebounceMode::AuditLog)
}

pub fn harness_with(
    registry: MemoryRegistry,
    pipeline: MemoryPipeline,
    debounce: DebounceMode,
) -> Harness {
    let registry = Arc::new(registry);
    let pipeline = Arc::new(pipeline);
    let records = Arc::new(MemoryRecordStore::new());
    let markers = Arc::new(MemoryMarkerStore::new());
    let clock = Arc::new(FixedClock::new(t0()));

    let mut settings = ControlSettings::new(PIPELINE);
    settings.debounce = debounce;

    let controller = Controller::new(
        registry.clone(),
        pipeline.clone(),
        records.clone(),
        settings,
    )
    .with_markers(markers.clone())
    .with_clock(clock.clone());

    Harness {
        registry,
        pipeline,
        records,
        markers,
        clock,
        controller,
    }
}

/// Tag names bound in `repository`, in listing order.
pub fn tags(registry: &MemoryRegistry, repository: &str) -> Vec<String> {
    registry
        .bindings(repository)
        .into_iter()
        .map(|(tag, _)| tag)
        .collect()
}

/// Manifest the tag points at, if bound.
pub fn manifest_of(registry: &MemoryRegistry, repository: &str, tag: &str) -> Option<String> {
    registry
        .bindings(repository)
        .into_iter()
        .find(|(t, _)| t == tag)
        .map(|(_, m)| m.as_str().to_string())
}
