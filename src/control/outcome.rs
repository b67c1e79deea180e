// ABOUTME: Result contract returned by every entry point: OK, SKIPPED or FAILED.
// ABOUTME: Skipping by policy is a distinct outcome, never a failure.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{ControlError, ErrorKind};
use crate::diagnostics::Warning;
use crate::types::AuditRecord;

/// What an update or rollback did when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The action ran and `record` was appended to the history.
    Applied {
        record: AuditRecord,
        warnings: Vec<Warning>,
    },
    /// The self-trigger filter suppressed the action.
    Skipped { reason: String },
}

impl Completion {
    pub fn record(&self) -> Option<&AuditRecord> {
        match self {
            Completion::Applied { record, .. } => Some(record),
            Completion::Skipped { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Skipped,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => write!(f, "OK"),
            Status::Skipped => write!(f, "SKIPPED"),
            Status::Failed => write!(f, "FAILED"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<AuditRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl Outcome {
    pub fn from_result(result: Result<Completion, ControlError>) -> Self {
        let blank = Outcome {
            status: Status::Ok,
            error: None,
            kind: None,
            reason: None,
            record: None,
            warnings: Vec::new(),
        };

        match result {
            Ok(Completion::Applied { record, warnings }) => Outcome {
                record: Some(record),
                warnings,
                ..blank
            },
            Ok(Completion::Skipped { reason }) => Outcome {
                status: Status::Skipped,
                reason: Some(reason),
                ..blank
            },
            Err(e) => Outcome::failure(e.to_string(), Some(e.kind())),
        }
    }

    /// Failure raised outside the control loop, such as a bad config.
    pub fn failure(error: impl Into<String>, kind: Option<ErrorKind>) -> Self {
        Outcome {
            status: Status::Failed,
            error: Some(error.into()),
            kind,
            reason: None,
            record: None,
            warnings: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == Status::Failed
    }
}

impl From<Result<Completion, ControlError>> for Outcome {
    fn from(result: Result<Completion, ControlError>) -> Self {
        Outcome::from_result(result)
    }
}
