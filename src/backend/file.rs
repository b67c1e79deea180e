// ABOUTME: File-backed audit table (JSON lines) and suppression markers (one JSON per repo).
// ABOUTME: Both live under the configured state directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::error::BackendResult;
use super::store::{MarkerStore, RecordStore, SuppressionMarker};
use crate::types::{AuditRecord, RepositoryName};

/// Append-only audit table stored as `<state_dir>/<name>.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonlRecordStore {
    path: PathBuf,
}

impl JsonlRecordStore {
    pub fn new(state_dir: &Path, name: &str) -> Self {
        Self {
            path: state_dir.join(format!("{}.jsonl", name)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordStore for JsonlRecordStore {
    async fn put(&self, record: &AuditRecord) -> BackendResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        // One write per record keeps appends from interleaving.
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn scan_all(&self) -> BackendResult<Vec<AuditRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (n, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(
                    "Skipping unreadable record at {}:{}: {}",
                    self.path.display(),
                    n + 1,
                    e
                ),
            }
        }
        Ok(records)
    }
}

/// Suppression markers stored as `<state_dir>/markers/<repository>.json`.
#[derive(Debug, Clone)]
pub struct FileMarkerStore {
    dir: PathBuf,
}

impl FileMarkerStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            dir: state_dir.join("markers"),
        }
    }

    pub fn marker_path(&self, repository: &RepositoryName) -> PathBuf {
        self.dir.join(format!("{}.json", repository.file_stem()))
    }
}

#[async_trait]
impl MarkerStore for FileMarkerStore {
    async fn set_marker(&self, marker: &SuppressionMarker) -> BackendResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.marker_path(&marker.repository);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(marker)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn get_marker(
        &self,
        repository: &RepositoryName,
    ) -> BackendResult<Option<SuppressionMarker>> {
        let path = self.marker_path(repository);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content) {
            Ok(marker) => Ok(Some(marker)),
            Err(e) => {
                tracing::warn!("Marker {} corrupted, ignoring: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    async fn clear_marker(&self, repository: &RepositoryName) -> BackendResult<()> {
        match tokio::fs::remove_file(self.marker_path(repository)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
