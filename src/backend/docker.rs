// ABOUTME: Registry backend for a Docker-API daemon via bollard.
// ABOUTME: Tags are `repository:tag` references and a manifest is the image id.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{ListImagesOptions, RemoveImageOptions, TagImageOptions};
use tokio::sync::OnceCell;

use super::error::{BackendError, BackendResult};
use super::registry::{Manifest, RegistryOps};
use crate::types::RepositoryName;

const TIMEOUT_SECS: u64 = 120;

fn map_error(e: bollard::errors::Error, what: &'static str, name: &str) -> BackendError {
    match &e {
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == 404 =>
        {
            BackendError::not_found(what, name)
        }
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 || *status_code == 400 => {
            BackendError::Rejected(format!("{}: {}", name, message))
        }
        _ => BackendError::Unavailable(format!("{}: {}", name, e)),
    }
}

/// Where the daemon lives. Parsed up front; dialled on first use.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Endpoint {
    LocalDefaults,
    Unix(String),
    Http(String),
}

impl Endpoint {
    fn parse(endpoint: Option<&str>) -> BackendResult<Self> {
        match endpoint {
            None => Ok(Endpoint::LocalDefaults),
            Some(ep) if ep.starts_with("unix://") || ep.starts_with('/') => {
                Ok(Endpoint::Unix(ep.to_string()))
            }
            Some(ep) if ep.starts_with("tcp://") || ep.starts_with("http://") => {
                Ok(Endpoint::Http(ep.to_string()))
            }
            Some(ep) => Err(BackendError::Rejected(format!(
                "unsupported registry endpoint: {}",
                ep
            ))),
        }
    }

    fn dial(&self) -> BackendResult<Docker> {
        match self {
            Endpoint::LocalDefaults => Docker::connect_with_local_defaults(),
            Endpoint::Unix(ep) => {
                Docker::connect_with_unix(ep, TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
            }
            Endpoint::Http(ep) => {
                Docker::connect_with_http(ep, TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
            }
        }
        .map_err(|e| BackendError::Unavailable(format!("failed to connect: {}", e)))
    }
}

/// Registry view over the images known to a Docker or Podman daemon.
pub struct DockerRegistry {
    endpoint: Endpoint,
    client: OnceCell<Docker>,
}

impl std::fmt::Debug for DockerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerRegistry")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl DockerRegistry {
    /// Registry for `endpoint`, or the local daemon defaults when `None`.
    ///
    /// Accepts `unix:///path`, a bare socket path, or `tcp://` / `http://` URLs.
    /// Only the endpoint shape is checked here; the daemon is contacted by the
    /// first registry call.
    pub fn connect(endpoint: Option<&str>) -> BackendResult<Self> {
        Ok(Self {
            endpoint: Endpoint::parse(endpoint)?,
            client: OnceCell::new(),
        })
    }

    async fn client(&self) -> BackendResult<&Docker> {
        self.client
            .get_or_try_init(|| async {
                tracing::debug!("Connecting to daemon at {:?}", self.endpoint);
                self.endpoint.dial()
            })
            .await
    }

    fn reference(repository: &RepositoryName, tag: &str) -> String {
        format!("{}:{}", repository, tag)
    }
}

/// Tags of `repository` among `repo:tag` references, in input order.
fn tags_for<'a>(
    repository: &'a str,
    references: impl IntoIterator<Item = &'a String> + 'a,
) -> impl Iterator<Item = String> + 'a {
    references.into_iter().filter_map(move |reference| {
        reference
            .rsplit_once(':')
            .filter(|(repo, tag)| *repo == repository && !tag.contains('/'))
            .map(|(_, tag)| tag.to_string())
    })
}

#[async_trait]
impl RegistryOps for DockerRegistry {
    async fn list_tags(&self, repository: &RepositoryName) -> BackendResult<Vec<String>> {
        let mut filters: HashMap<String, Vec<String>> = HashMap::new();
        filters.insert("reference".to_string(), vec![repository.to_string()]);

        let opts = ListImagesOptions {
            all: false,
            filters: Some(filters),
            ..Default::default()
        };

        let images = self
            .client()
            .await?
            .list_images(Some(opts))
            .await
            .map_err(|e| map_error(e, "repository", repository.as_str()))?;

        let tags: Vec<String> = images
            .iter()
            .flat_map(|image| tags_for(repository.as_str(), image.repo_tags.iter()))
            .collect();

        tracing::debug!("{} has {} tag(s)", repository, tags.len());
        Ok(tags)
    }

    async fn get_manifest(
        &self,
        repository: &RepositoryName,
        tag: &str,
    ) -> BackendResult<Manifest> {
        let reference = Self::reference(repository, tag);
        let details = self
            .client()
            .await?
            .inspect_image(&reference)
            .await
            .map_err(|e| map_error(e, "tag", &reference))?;

        details
            .id
            .map(Manifest::new)
            .ok_or_else(|| BackendError::Unavailable(format!("{} has no image id", reference)))
    }

    async fn delete_tag(&self, repository: &RepositoryName, tag: &str) -> BackendResult<()> {
        let reference = Self::reference(repository, tag);
        let opts = RemoveImageOptions {
            force: false,
            noprune: true,
            ..Default::default()
        };

        self.client()
            .await?
            .remove_image(&reference, Some(opts), None)
            .await
            .map_err(|e| map_error(e, "tag", &reference))?;

        Ok(())
    }

    async fn put_tag(
        &self,
        repository: &RepositoryName,
        tag: &str,
        manifest: &Manifest,
    ) -> BackendResult<()> {
        let opts = TagImageOptions {
            repo: Some(repository.to_string()),
            tag: Some(tag.to_string()),
            ..Default::default()
        };

        self.client()
            .await?
            .tag_image(manifest.as_str(), Some(opts))
            .await
            .map_err(|e| map_error(e, "image", manifest.as_str()))?;

        Ok(())
    }
}
