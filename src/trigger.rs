// ABOUTME: Inbound trigger payloads for update and rollback events.
// ABOUTME: Accepts `{repository}`, the legacy `{ecr_repo}` and registry push events.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::RepositoryName;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    Direct {
        #[serde(alias = "ecr_repo")]
        repository: String,
    },
    RegistryEvent {
        detail: EventDetail,
    },
}

#[derive(Debug, Deserialize)]
struct EventDetail {
    #[serde(rename = "repository-name")]
    repository_name: String,
}

/// The repository an event asks us to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub repository: RepositoryName,
}

impl Trigger {
    pub fn from_json(json: &str) -> Result<Self> {
        let payload: Payload = serde_json::from_str(json).map_err(|e| {
            Error::InvalidTrigger(format!(
                "expected {{\"repository\": ...}} or a registry event: {e}"
            ))
        })?;

        let name = match payload {
            Payload::Direct { repository } => repository,
            Payload::RegistryEvent { detail } => detail.repository_name,
        };

        Ok(Self {
            repository: RepositoryName::new(&name)?,
        })
    }
}
