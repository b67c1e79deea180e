// ABOUTME: Config values that are either literal or read from the environment.
// ABOUTME: `{ env: VAR, default: ... }` falls back to the default when VAR is unset.

use crate::error::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn literal(value: impl Into<String>) -> Self {
        EnvValue::Literal(value.into())
    }

    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }

    /// Resolve, rejecting values that are empty after trimming.
    pub fn resolve_non_empty(&self, field: &str) -> Result<String> {
        let value = self.resolve()?;
        if value.trim().is_empty() {
            return Err(Error::InvalidConfig(format!("{field} cannot be empty")));
        }
        Ok(value.trim().to_string())
    }
}
