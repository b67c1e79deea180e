// ABOUTME: History recorder: the only writer of audit records.
// ABOUTME: Appends unconditionally; duplicates are possible and accepted.

use std::sync::Arc;

use snafu::ResultExt;

use super::error::{ControlError, HistoryReadSnafu, HistoryWriteSnafu};
use crate::backend::RecordStore;
use crate::types::{AuditRecord, RepositoryName};

#[derive(Clone)]
pub struct HistoryRecorder {
    store: Arc<dyn RecordStore>,
}

impl HistoryRecorder {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Write `record`. A failure does not undo whatever the record describes.
    pub async fn append(&self, record: &AuditRecord) -> Result<(), ControlError> {
        self.store.put(record).await.context(HistoryWriteSnafu {
            action: record.action,
            execution_id: record.execution_id.clone(),
        })?;

        tracing::info!(
            "Recorded {} of {}: {} -> {}",
            record.action,
            record.repository,
            record.version_before,
            record.version_after
        );
        Ok(())
    }

    /// Records for `repository` (all when `None`), oldest first.
    pub async fn list(
        &self,
        repository: Option<&RepositoryName>,
    ) -> Result<Vec<AuditRecord>, ControlError> {
        let mut records = self.store.scan_all().await.context(HistoryReadSnafu)?;
        if let Some(repository) = repository {
            records.retain(|r| &r.repository == repository);
        }
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }
}
