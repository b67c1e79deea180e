// ABOUTME: Diagnostics accumulator for non-fatal warnings during an update or rollback.
// ABOUTME: Collects warnings that shouldn't fail the action but should reach the caller.

use serde::Serialize;

/// Collects non-fatal warnings during control operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning collected during an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn marker_write(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::MarkerWrite,
            message: message.into(),
        }
    }

    pub fn mutable_tag_missing(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::MutableTagMissing,
            message: message.into(),
        }
    }

    pub fn older_version_tags(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::OlderVersionTags,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Suppression marker could not be written; the next update may not be debounced.
    MarkerWrite,
    /// The mutable tag was already absent when the rollback tried to remove it.
    MutableTagMissing,
    /// Numeric tags besides the rollback target remain in the repository.
    OlderVersionTags,
}
