// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (status only) and JSON output modes.

use clap::ValueEnum;

use crate::control::{Outcome, Status};
use crate::error::Error;
use crate::types::AuditRecord;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputMode {
    /// Human-friendly lines
    #[default]
    Normal,
    /// Only the final status
    Quiet,
    /// One JSON document per result
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print the result of an update or rollback.
    pub fn outcome(&self, outcome: &Outcome) {
        match self.mode {
            OutputMode::Json => match serde_json::to_string(outcome) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("Error: cannot serialize outcome: {e}"),
            },
            OutputMode::Quiet => println!("{}", outcome.status),
            OutputMode::Normal => {
                match (&outcome.status, &outcome.record) {
                    (Status::Ok, Some(record)) => println!(
                        "OK: {} {} {} -> {}",
                        record.action,
                        record.repository,
                        record.version_before,
                        record.version_after
                    ),
                    (Status::Skipped, _) => println!(
                        "SKIPPED: {}",
                        outcome.reason.as_deref().unwrap_or("suppressed by policy")
                    ),
                    (status, _) => println!("{status}"),
                }
                for warning in &outcome.warnings {
                    eprintln!("Warning: {}", warning.message);
                }
                if let Some(error) = &outcome.error {
                    eprintln!("Error: {error}");
                }
            }
        }
    }

    /// Print one audit record.
    pub fn record(&self, record: &AuditRecord) {
        match self.mode {
            OutputMode::Json => match serde_json::to_string(record) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("Error: cannot serialize record: {e}"),
            },
            OutputMode::Normal | OutputMode::Quiet => println!("{record}"),
        }
    }

    /// Print an error raised before or around the control loop.
    ///
    /// JSON mode emits the same document shape as [`Output::outcome`] on stdout.
    pub fn error(&self, error: &Error) {
        match self.mode {
            OutputMode::Normal => eprintln!("Error: {error}"),
            OutputMode::Quiet | OutputMode::Json => {
                self.outcome(&Outcome::failure(error.to_string(), error.kind()));
                if self.mode == OutputMode::Quiet {
                    eprintln!("Error: {error}");
                }
            }
        }
    }
}
