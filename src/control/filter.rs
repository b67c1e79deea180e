// ABOUTME: Self-trigger filter: suppress updates caused by a rollback that just ran.
// ABOUTME: A coarse time debounce over audit history or an explicit suppression marker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use snafu::ResultExt;

use super::error::{ControlError, HistoryReadSnafu};
use crate::backend::{MarkerStore, RecordStore};
use crate::types::{Action, AuditRecord, RepositoryName};

/// Most recent rollback of `repository` in `records`, by timestamp.
pub fn last_rollback<'a>(
    records: &'a [AuditRecord],
    repository: &RepositoryName,
) -> Option<&'a AuditRecord> {
    records
        .iter()
        .filter(|r| r.action == Action::Rollback && &r.repository == repository)
        .max_by_key(|r| r.timestamp)
}

/// True if `repository` was rolled back less than `window` before `now`.
///
/// A rollback stamped in the future (clock skew) counts as recent.
pub fn was_just_rolled_back(
    records: &[AuditRecord],
    repository: &RepositoryName,
    now: DateTime<Utc>,
    window: Duration,
) -> bool {
    let Some(last) = last_rollback(records, repository) else {
        return false;
    };

    match (now - last.timestamp.with_timezone(&Utc)).to_std() {
        Ok(elapsed) => elapsed < window,
        Err(_) => true,
    }
}

/// Decides whether an incoming update was caused by our own rollback.
///
/// Neither implementation links the event to a specific rollback; anything
/// arriving inside the window is suppressed, including a genuine push.
#[async_trait]
pub trait SelfTriggerFilter: Send + Sync {
    async fn was_just_rolled_back(
        &self,
        repository: &RepositoryName,
        now: DateTime<Utc>,
    ) -> Result<bool, ControlError>;
}

/// Debounce driven by the rollback rows of the audit history.
pub struct AuditLogFilter {
    records: Arc<dyn RecordStore>,
    window: Duration,
}

impl AuditLogFilter {
    pub fn new(records: Arc<dyn RecordStore>, window: Duration) -> Self {
        Self { records, window }
    }
}

#[async_trait]
impl SelfTriggerFilter for AuditLogFilter {
    async fn was_just_rolled_back(
        &self,
        repository: &RepositoryName,
        now: DateTime<Utc>,
    ) -> Result<bool, ControlError> {
        let records = self.records.scan_all().await.context(HistoryReadSnafu)?;
        Ok(was_just_rolled_back(&records, repository, now, self.window))
    }
}

/// Debounce driven by the per-repository suppression marker a rollback sets.
pub struct MarkerFilter {
    markers: Arc<dyn MarkerStore>,
}

impl MarkerFilter {
    pub fn new(markers: Arc<dyn MarkerStore>) -> Self {
        Self { markers }
    }
}

#[async_trait]
impl SelfTriggerFilter for MarkerFilter {
    async fn was_just_rolled_back(
        &self,
        repository: &RepositoryName,
        now: DateTime<Utc>,
    ) -> Result<bool, ControlError> {
        let marker = match self.markers.get_marker(repository).await {
            Ok(marker) => marker,
            Err(e) => {
                tracing::warn!("Cannot read suppression marker for {}: {}", repository, e);
                None
            }
        };

        match marker {
            Some(marker) if marker.is_active(now) => {
                tracing::debug!(
                    "Suppression marker for {} set by {} (pid {}) until {}",
                    repository,
                    marker.holder,
                    marker.pid,
                    marker.expires_at
                );
                Ok(true)
            }
            Some(_) => {
                if let Err(e) = self.markers.clear_marker(repository).await {
                    tracing::warn!("Cannot clear expired marker for {}: {}", repository, e);
                }
                Ok(false)
            }
            None => Ok(false),
        }
    }
}

/// Convert a debounce window to a chrono duration, saturating at one day.
pub(crate) fn window_delta(window: Duration) -> chrono::Duration {
    chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SuppressionMarker;
    use crate::backend::memory::{MemoryMarkerStore, MemoryRecordStore};
    use crate::types::{RunId, next_minor};
    use chrono::TimeZone;

    fn repo(name: &str) -> RepositoryName {
        RepositoryName::new(name).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap()
    }

    fn rollback_at(name: &str, at: DateTime<Utc>) -> AuditRecord {
        let bump = next_minor("3.8").unwrap();
        AuditRecord::rollback(&repo(name), "3.8", &bump, "latest", at)
    }

    fn update_at(name: &str, at: DateTime<Utc>) -> AuditRecord {
        let bump = next_minor("3.8").unwrap();
        AuditRecord::update(&RunId::new("r"), &repo(name), &bump, "latest", at)
    }

    const WINDOW: Duration = Duration::from_secs(5);

    #[test]
    fn no_rollback_means_not_suppressed() {
        assert!(!was_just_rolled_back(&[], &repo("web"), t0(), WINDOW));

        let records = vec![update_at("web", t0())];
        assert!(!was_just_rolled_back(&records, &repo("web"), t0(), WINDOW));
    }

    #[test]
    fn recent_rollback_suppresses() {
        let records = vec![rollback_at("web", t0())];
        let now = t0() + chrono::Duration::seconds(2);
        assert!(was_just_rolled_back(&records, &repo("web"), now, WINDOW));
    }

    #[test]
    fn old_rollback_does_not_suppress() {
        let records = vec![rollback_at("web", t0())];
        let now = t0() + chrono::Duration::seconds(10);
        assert!(!was_just_rolled_back(&records, &repo("web"), now, WINDOW));

        let at_edge = t0() + chrono::Duration::seconds(5);
        assert!(!was_just_rolled_back(&records, &repo("web"), at_edge, WINDOW));
    }

    #[test]
    fn uses_most_recent_rollback_regardless_of_order() {
        let records = vec![
            rollback_at("web", t0() + chrono::Duration::seconds(8)),
            rollback_at("web", t0()),
        ];
        let now = t0() + chrono::Duration::seconds(10);
        assert!(was_just_rolled_back(&records, &repo("web"), now, WINDOW));
    }

    #[test]
    fn other_repositories_do_not_count() {
        let records = vec![rollback_at("api", t0())];
        let now = t0() + chrono::Duration::seconds(1);
        assert!(!was_just_rolled_back(&records, &repo("web"), now, WINDOW));
    }

    #[test]
    fn future_rollback_counts_as_recent() {
        let records = vec![rollback_at("web", t0() + chrono::Duration::seconds(30))];
        assert!(was_just_rolled_back(&records, &repo("web"), t0(), WINDOW));
    }

    #[tokio::test]
    async fn audit_log_filter_reads_store() {
        let store = Arc::new(MemoryRecordStore::new().with_record(rollback_at("web", t0())));
        let filter = AuditLogFilter::new(store, WINDOW);

        let soon = t0() + chrono::Duration::seconds(2);
        assert!(filter.was_just_rolled_back(&repo("web"), soon).await.unwrap());
    }

    #[tokio::test]
    async fn audit_log_filter_propagates_scan_failure() {
        let store = Arc::new(MemoryRecordStore::new());
        store.fail_scans();
        let filter = AuditLogFilter::new(store, WINDOW);

        assert!(filter.was_just_rolled_back(&repo("web"), t0()).await.is_err());
    }

    #[tokio::test]
    async fn marker_filter_honours_expiry_and_clears() {
        let markers = Arc::new(MemoryMarkerStore::new());
        let marker = SuppressionMarker::new(&repo("web"), t0(), window_delta(WINDOW));
        markers.set_marker(&marker).await.unwrap();
        let filter = MarkerFilter::new(markers.clone());

        let soon = t0() + chrono::Duration::seconds(2);
        assert!(filter.was_just_rolled_back(&repo("web"), soon).await.unwrap());

        let later = t0() + chrono::Duration::seconds(10);
        assert!(!filter.was_just_rolled_back(&repo("web"), later).await.unwrap());
        assert!(markers.is_empty());
    }
}
