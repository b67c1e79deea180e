// ABOUTME: Controller bundling the collaborators and settings for one managed pipeline.
// ABOUTME: Entry points for update and rollback, plus the shared tag resolution step.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use snafu::{OptionExt, ResultExt};

use super::clock::{Clock, SystemClock};
use super::error::{ControlError, FormatSnafu, NoVersionTagSnafu, RegistrySnafu};
use super::filter::{AuditLogFilter, MarkerFilter, SelfTriggerFilter};
use super::guard::MIN_HISTORY_DEPTH;
use super::history::HistoryRecorder;
use super::outcome::{Completion, Outcome};
use crate::backend::{MarkerStore, PipelineOps, RecordStore, RegistryOps};
use crate::types::{Action, RepositoryName, VersionBump, latest_tag, next_minor};

pub const DEFAULT_MUTABLE_TAG: &str = "latest";
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(5);

/// Which signal the self-trigger filter reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DebounceMode {
    /// Rollback rows in the audit history.
    #[default]
    AuditLog,
    /// The suppression marker written by rollbacks.
    Marker,
}

#[derive(Debug, Clone)]
pub struct ControlSettings {
    /// Pipeline gated by the guard and started by updates.
    pub pipeline: String,
    /// Recent runs inspected by the guard.
    pub history_depth: usize,
    /// Tag that always names the current image.
    pub mutable_tag: String,
    /// Debounce window after a rollback.
    pub window: Duration,
    pub debounce: DebounceMode,
}

impl ControlSettings {
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            history_depth: MIN_HISTORY_DEPTH,
            mutable_tag: DEFAULT_MUTABLE_TAG.to_string(),
            window: DEFAULT_WINDOW,
            debounce: DebounceMode::default(),
        }
    }
}

/// The numeric tag an action works from.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedTag {
    pub tag: String,
    pub bump: VersionBump,
    /// Other non-mutable tags present besides `tag`.
    pub others: Vec<String>,
}

pub struct Controller {
    pub(crate) registry: Arc<dyn RegistryOps>,
    pub(crate) pipeline: Arc<dyn PipelineOps>,
    pub(crate) history: HistoryRecorder,
    pub(crate) filter: Arc<dyn SelfTriggerFilter>,
    pub(crate) markers: Option<Arc<dyn MarkerStore>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) settings: ControlSettings,
}

impl Controller {
    /// Controller debouncing on the audit history until markers are supplied.
    pub fn new(
        registry: Arc<dyn RegistryOps>,
        pipeline: Arc<dyn PipelineOps>,
        records: Arc<dyn RecordStore>,
        settings: ControlSettings,
    ) -> Self {
        let filter = Arc::new(AuditLogFilter::new(records.clone(), settings.window));
        Self {
            registry,
            pipeline,
            history: HistoryRecorder::new(records),
            filter,
            markers: None,
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    /// Rollbacks write suppression markers here; in marker mode, updates read them.
    pub fn with_markers(mut self, markers: Arc<dyn MarkerStore>) -> Self {
        if self.settings.debounce == DebounceMode::Marker {
            self.filter = Arc::new(MarkerFilter::new(markers.clone()));
        }
        self.markers = Some(markers);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn SelfTriggerFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn settings(&self) -> &ControlSettings {
        &self.settings
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    pub async fn update(&self, repository: &RepositoryName) -> Result<Completion, ControlError> {
        super::update::update(self, repository).await
    }

    pub async fn rollback(&self, repository: &RepositoryName) -> Result<Completion, ControlError> {
        super::rollback::rollback(self, repository).await
    }

    /// Run `action` and fold the result into the OK/SKIPPED/FAILED contract.
    pub async fn handle(&self, action: Action, repository: &RepositoryName) -> Outcome {
        let result = match action {
            Action::Update => self.update(repository).await,
            Action::Rollback => self.rollback(repository).await,
        };
        if let Err(e) = &result {
            tracing::error!("{} of {} failed: {}", action, repository, e);
        }
        Outcome::from_result(result)
    }

    /// Highest-versioned tag other than the mutable one, split for bumping.
    pub(crate) async fn resolve_version_tag(
        &self,
        repository: &RepositoryName,
    ) -> Result<ResolvedTag, ControlError> {
        let tags = self
            .registry
            .list_tags(repository)
            .await
            .context(RegistrySnafu {
                operation: "list tags",
                repository: repository.clone(),
            })?;

        let candidates: Vec<&str> = tags
            .iter()
            .map(String::as_str)
            .filter(|t| *t != self.settings.mutable_tag)
            .collect();

        let tag = latest_tag(candidates.iter().copied())
            .context(NoVersionTagSnafu {
                repository: repository.clone(),
            })?
            .to_string();

        let bump = next_minor(&tag).context(FormatSnafu {
            repository: repository.clone(),
        })?;

        let others = candidates
            .into_iter()
            .filter(|t| *t != tag)
            .map(str::to_string)
            .collect();

        tracing::debug!("{} resolves to version tag {}", repository, tag);
        Ok(ResolvedTag { tag, bump, others })
    }
}
