// ABOUTME: Integration tests for the file-backed stores and the command pipeline.
// ABOUTME: Uses temporary state directories and short-lived shell commands.

use std::path::Path;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use nonempty::NonEmpty;
use tagflip::backend::command::{CommandPipeline, RunInfo};
use tagflip::backend::file::{FileMarkerStore, JsonlRecordStore};
use tagflip::backend::{MarkerStore, PipelineOps, RecordStore, RunStatus, SuppressionMarker};
use tagflip::control::HistoryRecorder;
use tagflip::types::{AuditRecord, RepositoryName, RunId, next_minor};

fn repo(name: &str) -> RepositoryName {
    RepositoryName::new(name).unwrap()
}

fn command(argv: &[&str]) -> NonEmpty<String> {
    NonEmpty::from_vec(argv.iter().map(|a| a.to_string()).collect()).unwrap()
}

/// Poll until the run leaves `InProgress`, giving up after ten seconds.
async fn wait_for_completion(pipeline: &CommandPipeline, name: &str) -> RunStatus {
    for _ in 0..100 {
        let runs = pipeline.list_recent_runs(name, 10).await.unwrap();
        let status = runs[0].status;
        if !status.is_in_progress() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("pipeline run did not finish");
}

mod records {
    use super::*;

    #[tokio::test]
    async fn appended_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap();
        let bump = next_minor("3.7").unwrap();

        let store = JsonlRecordStore::new(dir.path(), "history");
        let update = AuditRecord::update(&RunId::new("r1"), &repo("web"), &bump, "latest", at);
        let rollback = AuditRecord::rollback(&repo("web"), "3.7", &bump, "latest", at);
        store.put(&update).await.unwrap();
        store.put(&rollback).await.unwrap();

        let reopened = JsonlRecordStore::new(dir.path(), "history");
        assert_eq!(reopened.scan_all().await.unwrap(), vec![update, rollback]);
    }

    #[tokio::test]
    async fn stored_rows_use_audit_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap();
        let bump = next_minor("3.7").unwrap();

        let store = JsonlRecordStore::new(dir.path(), "history");
        let record = AuditRecord::update(&RunId::new("r1"), &repo("web"), &bump, "latest", at);
        store.put(&record).await.unwrap();

        let line = std::fs::read_to_string(store.path()).unwrap();
        let row: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(row["date"], "2024-05-01T10:00:00+08:00");
        assert_eq!(row["action"], "update");
        assert_eq!(row["version_before"], "3.7");
        assert_eq!(row["version_after"], "3.8 (latest)");
    }

    #[tokio::test]
    async fn missing_table_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlRecordStore::new(dir.path(), "history");
        assert!(store.scan_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreadable_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlRecordStore::new(dir.path(), "history");
        std::fs::write(
            store.path(),
            concat!(
                "not json\n",
                r#"{"execution_id":"rollback_1","ecr_repo":"web","date":"2024-05-01T10:00:00+08:00","action":"rollback","version_before":"3.8","version_after":"3.7 (latest)"}"#,
                "\n",
            ),
        )
        .unwrap();

        let records = store.scan_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].repository, repo("web"));
    }

    #[tokio::test]
    async fn recorder_lists_by_repository_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(JsonlRecordStore::new(dir.path(), "history"));
        let recorder = HistoryRecorder::new(store);
        let bump = next_minor("3.7").unwrap();
        let early = Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap();

        let second = AuditRecord::rollback(&repo("web"), "3.7", &bump, "latest", late);
        let first = AuditRecord::update(&RunId::new("r1"), &repo("web"), &bump, "latest", early);
        let other = AuditRecord::rollback(&repo("api"), "3.7", &bump, "latest", early);
        for record in [&second, &first, &other] {
            recorder.append(record).await.unwrap();
        }

        let web = recorder.list(Some(&repo("web"))).await.unwrap();
        assert_eq!(web, vec![first, second]);
        assert_eq!(recorder.list(None).await.unwrap().len(), 3);
    }
}

mod markers {
    use super::*;

    #[tokio::test]
    async fn marker_set_get_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMarkerStore::new(dir.path());
        let now = Utc::now();
        let marker = SuppressionMarker::new(&repo("team/web"), now, chrono::Duration::seconds(5));

        store.set_marker(&marker).await.unwrap();
        let loaded = store.get_marker(&repo("team/web")).await.unwrap().unwrap();
        assert_eq!(loaded.repository, repo("team/web"));
        assert!(loaded.is_active(now));
        assert!(store.get_marker(&repo("web")).await.unwrap().is_none());

        store.clear_marker(&repo("team/web")).await.unwrap();
        assert!(store.get_marker(&repo("team/web")).await.unwrap().is_none());
        // Clearing twice is fine.
        store.clear_marker(&repo("team/web")).await.unwrap();
    }

    #[tokio::test]
    async fn look_alike_repositories_keep_separate_markers() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMarkerStore::new(dir.path());
        let now = Utc::now();
        let marker = SuppressionMarker::new(&repo("team/web"), now, chrono::Duration::seconds(5));

        store.set_marker(&marker).await.unwrap();

        assert!(store.get_marker(&repo("team__web")).await.unwrap().is_none());
        store.clear_marker(&repo("team__web")).await.unwrap();
        assert!(store.get_marker(&repo("team/web")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn corrupted_marker_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMarkerStore::new(dir.path());
        let path = store.marker_path(&repo("web"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{").unwrap();

        assert!(store.get_marker(&repo("web")).await.unwrap().is_none());
    }
}

mod pipeline {
    use super::*;

    #[tokio::test]
    async fn no_runs_yet_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = CommandPipeline::new(command(&["true"]), dir.path(), Duration::from_secs(60));
        assert!(pipeline.list_recent_runs("deploy", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn successful_command_reports_succeeded() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = CommandPipeline::new(command(&["true"]), dir.path(), Duration::from_secs(60));

        let id = pipeline.start_run("deploy", &repo("web")).await.unwrap();

        assert_eq!(wait_for_completion(&pipeline, "deploy").await, RunStatus::Succeeded);
        let runs = pipeline.list_recent_runs("deploy", 10).await.unwrap();
        assert_eq!(runs[0].id, id);
    }

    #[tokio::test]
    async fn failing_command_reports_failed() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = CommandPipeline::new(command(&["false"]), dir.path(), Duration::from_secs(60));

        let id = pipeline.start_run("deploy", &repo("web")).await.unwrap();

        assert_eq!(wait_for_completion(&pipeline, "deploy").await, RunStatus::Failed);
        let runs = pipeline.list_recent_runs("deploy", 10).await.unwrap();
        assert_eq!(runs[0].id, id);
    }

    #[tokio::test]
    async fn running_command_reports_in_progress() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline =
            CommandPipeline::new(command(&["sleep", "5"]), dir.path(), Duration::from_secs(60));

        let id = pipeline.start_run("deploy", &repo("web")).await.unwrap();

        let runs = pipeline.list_recent_runs("deploy", 10).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, id);
        assert_eq!(runs[0].status, RunStatus::InProgress);
    }

    #[tokio::test]
    async fn command_sees_run_environment() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = CommandPipeline::new(
            command(&["sh", "-c", "echo \"$TAGFLIP_PIPELINE $TAGFLIP_REPOSITORY\""]),
            dir.path(),
            Duration::from_secs(60),
        );

        let id = pipeline.start_run("deploy", &repo("team/web")).await.unwrap();
        wait_for_completion(&pipeline, "deploy").await;

        let log_path = dir.path().join("pipelines/deploy").join(format!("{id}.log"));
        let log = std::fs::read_to_string(log_path).unwrap();
        assert_eq!(log.trim(), "deploy team/web");
    }

    #[tokio::test]
    async fn silent_stale_run_is_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let runs_dir = dir.path().join("pipelines/deploy");
        write_run(&runs_dir, "ghost", Utc::now() - chrono::Duration::hours(2));

        let pipeline = CommandPipeline::new(command(&["true"]), dir.path(), Duration::from_secs(3600));
        let runs = pipeline.list_recent_runs("deploy", 10).await.unwrap();

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Stopped);
    }

    #[tokio::test]
    async fn runs_are_listed_newest_first_and_limited() {
        let dir = tempfile::tempdir().unwrap();
        let runs_dir = dir.path().join("pipelines/deploy");
        let now = Utc::now();
        for n in 0..12 {
            write_run(&runs_dir, &format!("r{n:02}"), now - chrono::Duration::minutes(60 - n));
        }

        let pipeline = CommandPipeline::new(command(&["true"]), dir.path(), Duration::from_secs(7200));
        let runs = pipeline.list_recent_runs("deploy", 10).await.unwrap();

        assert_eq!(runs.len(), 10);
        assert_eq!(runs[0].id, RunId::new("r11"));
        assert_eq!(runs[9].id, RunId::new("r02"));
        assert!(runs.iter().all(|r| r.status == RunStatus::InProgress));
    }

    fn write_run(dir: &Path, id: &str, started_at: chrono::DateTime<Utc>) {
        std::fs::create_dir_all(dir).unwrap();
        let info = RunInfo {
            id: RunId::new(id),
            pipeline: "deploy".to_string(),
            repository: repo("web"),
            started_at,
            pid: None,
        };
        std::fs::write(
            dir.join(format!("{id}.json")),
            serde_json::to_vec(&info).unwrap(),
        )
        .unwrap();
    }
}
