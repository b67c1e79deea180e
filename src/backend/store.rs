// ABOUTME: Audit record store and suppression marker store traits.
// ABOUTME: Markers are short-lived per-repository flags written after a rollback.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::BackendResult;
use crate::types::{AuditRecord, RepositoryName};

/// Append-only audit table.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn put(&self, record: &AuditRecord) -> BackendResult<()>;

    /// Every record currently stored, in no particular order.
    async fn scan_all(&self) -> BackendResult<Vec<AuditRecord>>;
}

/// Marks a repository as recently rolled back, so the registry event the
/// rollback itself produces is not treated as a new image push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionMarker {
    pub repository: RepositoryName,
    /// Hostname of the machine that performed the rollback.
    pub holder: String,
    pub pid: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SuppressionMarker {
    pub fn new(repository: &RepositoryName, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            repository: repository.clone(),
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[async_trait]
pub trait MarkerStore: Send + Sync {
    async fn set_marker(&self, marker: &SuppressionMarker) -> BackendResult<()>;

    async fn get_marker(&self, repository: &RepositoryName)
    -> BackendResult<Option<SuppressionMarker>>;

    async fn clear_marker(&self, repository: &RepositoryName) -> BackendResult<()>;
}
