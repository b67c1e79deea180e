// ABOUTME: Application-wide error types for tagflip.
// ABOUTME: Uses thiserror for configuration, input and backend setup failures.

use std::path::PathBuf;
use thiserror::Error;

use crate::backend::BackendError;
use crate::control::{ControlError, ErrorKind};
use crate::types::RepositoryNameError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid repository name: {0}")]
    InvalidRepository(#[from] RepositoryNameError),

    #[error("invalid trigger payload: {0}")]
    InvalidTrigger(String),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error("backend setup failed: {0}")]
    Backend(#[from] BackendError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Failure category, when the error maps onto one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Control(e) => Some(e.kind()),
            Error::Backend(_) | Error::Io(_) => Some(ErrorKind::Infrastructure),
            Error::InvalidRepository(_) | Error::InvalidTrigger(_) => Some(ErrorKind::Format),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_errors_map_onto_kinds() {
        let err = Error::Backend(BackendError::Unavailable("daemon down".into()));
        assert_eq!(err.kind(), Some(ErrorKind::Infrastructure));

        let err = Error::InvalidTrigger("missing action".into());
        assert_eq!(err.kind(), Some(ErrorKind::Format));

        let err = Error::ConfigNotFound(PathBuf::from("/srv"));
        assert_eq!(err.kind(), None);
    }
}
