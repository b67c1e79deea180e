// ABOUTME: Error type shared by every external collaborator.
// ABOUTME: Registry, pipeline and store failures all surface as BackendError.

/// Failure reported by a registry, pipeline or store backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BackendError {
    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        BackendError::NotFound {
            what,
            name: name.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound { .. })
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
