// ABOUTME: Image registry operations used by the rollback and update paths.
// ABOUTME: Tags are plain strings; a manifest is whatever the registry binds a tag to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::BackendResult;
use crate::types::RepositoryName;

/// Opaque image manifest (or image id) a tag points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(String);

impl Manifest {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tag-level access to an image registry.
#[async_trait]
pub trait RegistryOps: Send + Sync {
    /// Every tag currently present in the repository.
    async fn list_tags(&self, repository: &RepositoryName) -> BackendResult<Vec<String>>;

    /// The manifest bound to `tag`.
    async fn get_manifest(&self, repository: &RepositoryName, tag: &str)
    -> BackendResult<Manifest>;

    /// Remove `tag` from the repository.
    async fn delete_tag(&self, repository: &RepositoryName, tag: &str) -> BackendResult<()>;

    /// Bind `tag` to `manifest`, replacing any existing binding.
    async fn put_tag(
        &self,
        repository: &RepositoryName,
        tag: &str,
        manifest: &Manifest,
    ) -> BackendResult<()>;
}
