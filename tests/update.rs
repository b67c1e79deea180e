// ABOUTME: Integration tests for the update flow over in-memory backends.
// ABOUTME: Covers pipeline start, audit rows, the busy guard and self-trigger debounce.

mod support;

use chrono::Duration;
use support::{harness, harness_with, repo, t0, tags};
use tagflip::backend::memory::{MemoryPipeline, MemoryRegistry, RegistryCall};
use tagflip::backend::{Manifest, RecordStore, RegistryOps, RunStatus};
use tagflip::control::{Completion, DebounceMode, ErrorKind, Status};
use tagflip::types::{Action, AuditRecord, ExecutionId, next_minor};

fn pushed() -> MemoryRegistry {
    MemoryRegistry::new()
        .with_tag("web", "latest", "M1")
        .with_tag("web", "3.7", "M1")
}

#[tokio::test]
async fn update_starts_pipeline_and_records_bump() {
    let h = harness(pushed(), MemoryPipeline::new());

    let completion = h.controller.update(&repo("web")).await.unwrap();

    let started = h.pipeline.started();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].1, repo("web"));

    let record = completion.record().cloned().expect("update should apply");
    assert_eq!(record.action, Action::Update);
    assert_eq!(record.version_before, "3.7");
    assert_eq!(record.version_after, "3.8 (latest)");
    assert_eq!(record.execution_id, ExecutionId::from_run(&started[0].0));
    assert_eq!(h.records.records(), vec![record]);
}

#[tokio::test]
async fn update_never_touches_registry_tags() {
    let h = harness(pushed(), MemoryPipeline::new());

    h.controller.update(&repo("web")).await.unwrap();

    assert_eq!(h.registry.mutating_calls(), 0);
    assert_eq!(tags(&h.registry, "web"), vec!["latest", "3.7"]);
}

#[tokio::test]
async fn busy_pipeline_blocks_update() {
    let pipeline = MemoryPipeline::new().with_run("r1", RunStatus::InProgress);
    let h = harness(pushed(), pipeline);

    let err = h.controller.update(&repo("web")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Concurrency);
    assert_eq!(h.pipeline.list_calls(), 1);
    assert!(h.pipeline.started().is_empty());
    assert!(h.registry.calls().is_empty());
    assert!(h.records.records().is_empty());
}

#[tokio::test]
async fn second_update_is_blocked_while_first_runs() {
    let h = harness(pushed(), MemoryPipeline::new());

    h.controller.update(&repo("web")).await.unwrap();
    let err = h.controller.update(&repo("web")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Concurrency);

    h.pipeline.complete_all(RunStatus::Succeeded);
    h.controller.update(&repo("web")).await.unwrap();
    assert_eq!(h.pipeline.started().len(), 2);
}

#[tokio::test]
async fn in_progress_run_beyond_history_depth_is_ignored() {
    let mut pipeline = MemoryPipeline::new().with_run("old", RunStatus::InProgress);
    for n in 0..10 {
        pipeline = pipeline.with_run(&format!("r{n}"), RunStatus::Succeeded);
    }
    let h = harness(pushed(), pipeline);

    let completion = h.controller.update(&repo("web")).await.unwrap();
    assert!(completion.record().is_some());
}

#[tokio::test]
async fn pipeline_status_failure_is_infrastructure() {
    let pipeline = MemoryPipeline::new();
    pipeline.fail_listing();
    let h = harness(pushed(), pipeline);

    let err = h.controller.update(&repo("web")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Infrastructure);
    assert!(h.records.records().is_empty());
}

#[tokio::test]
async fn pipeline_start_failure_writes_no_record() {
    let pipeline = MemoryPipeline::new();
    pipeline.fail_starting();
    let h = harness(pushed(), pipeline);

    let err = h.controller.update(&repo("web")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Infrastructure);
    assert!(h.records.records().is_empty());
}

#[tokio::test]
async fn malformed_tag_fails_before_pipeline_start() {
    let registry = MemoryRegistry::new()
        .with_tag("web", "latest", "M1")
        .with_tag("web", "release-3", "M1");
    let h = harness(registry, MemoryPipeline::new());

    let err = h.controller.update(&repo("web")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert!(h.pipeline.started().is_empty());
}

/// Roll back at t0, then restore a version tag the way the pipeline would.
async fn rolled_back(debounce: DebounceMode) -> support::Harness {
    let registry = MemoryRegistry::new()
        .with_tag("web", "latest", "M2")
        .with_tag("web", "3.7", "M1");
    let h = harness_with(registry, MemoryPipeline::new(), debounce);

    h.controller.rollback(&repo("web")).await.unwrap();
    h.registry
        .put_tag(&repo("web"), "3.7", &Manifest::new("M1"))
        .await
        .unwrap();
    h
}

#[tokio::test]
async fn update_right_after_rollback_is_skipped() {
    let h = rolled_back(DebounceMode::AuditLog).await;
    h.clock.advance(Duration::seconds(2));

    let outcome = h.controller.handle(Action::Update, &repo("web")).await;

    assert_eq!(outcome.status, Status::Skipped);
    assert!(outcome.error.is_none());
    assert!(outcome.reason.is_some());
    assert!(h.pipeline.started().is_empty());
    assert_eq!(h.records.records().len(), 1);
}

#[tokio::test]
async fn update_after_window_proceeds() {
    let h = rolled_back(DebounceMode::AuditLog).await;
    h.clock.set(t0() + Duration::seconds(10));

    let completion = h.controller.update(&repo("web")).await.unwrap();

    assert!(matches!(completion, Completion::Applied { .. }));
    assert_eq!(h.pipeline.started().len(), 1);
    assert_eq!(h.records.records().len(), 2);
}

#[tokio::test]
async fn rollback_of_other_repository_does_not_suppress() {
    let registry = pushed()
        .with_tag("api", "latest", "A2")
        .with_tag("api", "1.4", "A1");
    let h = harness(registry, MemoryPipeline::new());

    h.controller.rollback(&repo("api")).await.unwrap();
    h.clock.advance(Duration::seconds(1));

    let outcome = h.controller.handle(Action::Update, &repo("web")).await;
    assert_eq!(outcome.status, Status::Ok);
}

#[tokio::test]
async fn marker_mode_suppresses_inside_window() {
    let h = rolled_back(DebounceMode::Marker).await;
    assert_eq!(h.markers.len(), 1);

    h.clock.advance(Duration::seconds(2));
    let outcome = h.controller.handle(Action::Update, &repo("web")).await;
    assert_eq!(outcome.status, Status::Skipped);

    h.clock.set(t0() + Duration::seconds(10));
    let outcome = h.controller.handle(Action::Update, &repo("web")).await;
    assert_eq!(outcome.status, Status::Ok);
    assert!(h.markers.is_empty());
}

#[tokio::test]
async fn marker_mode_ignores_audit_rows() {
    let h = harness_with(pushed(), MemoryPipeline::new(), DebounceMode::Marker);
    let bump = next_minor("3.7").unwrap();
    let rollback = AuditRecord::rollback(&repo("web"), "3.7", &bump, "latest", t0());
    h.records.put(&rollback).await.unwrap();

    let outcome = h.controller.handle(Action::Update, &repo("web")).await;
    assert_eq!(outcome.status, Status::Ok);
}

#[tokio::test]
async fn marker_mode_rollback_that_changed_nothing_does_not_suppress() {
    let registry = MemoryRegistry::new()
        .with_tag("web", "latest", "M2")
        .with_tag("web", "3.7", "M1");
    let h = harness_with(registry, MemoryPipeline::new(), DebounceMode::Marker);
    h.registry.fail_on(RegistryCall::DeleteTag);

    let err = h.controller.rollback(&repo("web")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Infrastructure);
    assert!(h.markers.is_empty());

    h.clock.advance(Duration::seconds(2));
    let outcome = h.controller.handle(Action::Update, &repo("web")).await;

    assert_eq!(outcome.status, Status::Ok);
    assert_eq!(h.pipeline.started().len(), 1);
}

#[tokio::test]
async fn unreadable_history_fails_update() {
    let h = harness(pushed(), MemoryPipeline::new());
    h.records.fail_scans();

    let outcome = h.controller.handle(Action::Update, &repo("web")).await;

    assert_eq!(outcome.status, Status::Failed);
    assert_eq!(outcome.kind, Some(ErrorKind::Infrastructure));
    assert!(h.pipeline.started().is_empty());
}
