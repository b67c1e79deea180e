// ABOUTME: Image repository name validation.
// ABOUTME: Accepts registry-style paths such as `team/web-app` or `localhost:5000/api`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

const MAX_LEN: usize = 256;

#[derive(Debug, Error)]
pub enum RepositoryNameError {
    #[error("repository name cannot be empty")]
    Empty,

    #[error("repository name exceeds maximum length of {MAX_LEN} characters")]
    TooLong,

    #[error("repository name must start and end with a letter or digit")]
    BadBoundary,

    #[error("repository name must be lowercase")]
    NotLowercase,

    #[error("invalid character in repository name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryName(String);

impl RepositoryName {
    pub fn new(value: &str) -> Result<Self, RepositoryNameError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(RepositoryNameError::Empty);
        }

        if value.len() > MAX_LEN {
            return Err(RepositoryNameError::TooLong);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(RepositoryNameError::NotLowercase);
            }
            let separator = matches!(c, '.' | '_' | '-' | '/' | ':');
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && !separator {
                return Err(RepositoryNameError::InvalidChar(c));
            }
        }

        let alnum = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
        if !alnum(value.chars().next()) || !alnum(value.chars().last()) {
            return Err(RepositoryNameError::BadBoundary);
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name usable as a single path component. Percent-encoded, so distinct
    /// names never share a stem.
    pub fn file_stem(&self) -> String {
        urlencoding::encode(&self.0).into_owned()
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for RepositoryName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RepositoryName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RepositoryName::new(&s).map_err(serde::de::Error::custom)
    }
}
