// ABOUTME: Version tag codec: numeric sort keys and minor-version bumps.
// ABOUTME: Sorting is permissive (digit runs), mutation paths require strict `major.minor`.

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionFormatError {
    #[error("version tag `{0}` is not of the form <major>.<minor>")]
    NotMajorMinor(String),

    #[error("version component `{component}` in tag `{tag}` is not a decimal integer")]
    NotNumeric { tag: String, component: String },

    #[error("minor version of tag `{0}` cannot be incremented")]
    Overflow(String),
}

/// Sort key made of every maximal ASCII digit run in a tag, left to right.
///
/// Ordering is lexicographic over the integers, so `10.2` sorts after `9.9`
/// and a tag without digits (such as `latest`) sorts below everything else.
/// Runs too large for `u64` saturate at `u64::MAX`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VersionKey(Vec<u64>);

impl VersionKey {
    pub fn parse(tag: &str) -> Self {
        let mut parts = Vec::new();
        let mut current: Option<u64> = None;

        for c in tag.chars() {
            match c.to_digit(10) {
                Some(d) => {
                    let acc = current.unwrap_or(0);
                    current = Some(acc.saturating_mul(10).saturating_add(u64::from(d)));
                }
                None => {
                    if let Some(n) = current.take() {
                        parts.push(n);
                    }
                }
            }
        }
        if let Some(n) = current {
            parts.push(n);
        }

        Self(parts)
    }

    pub fn components(&self) -> &[u64] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Ord for VersionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Returns the tag with the greatest [`VersionKey`].
///
/// Among tags with identical keys the first one encountered wins. Callers
/// should not depend on which of several equal tags is picked.
pub fn latest_tag<'a, I>(tags: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, VersionKey)> = None;

    for tag in tags {
        let key = VersionKey::parse(tag);
        let replace = match &best {
            Some((_, best_key)) => key > *best_key,
            None => true,
        };
        if replace {
            best = Some((tag, key));
        }
    }

    best.map(|(tag, _)| tag)
}

/// A strict `<major>.<minor>` tag and its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionBump {
    pub major: u64,
    pub minor: u64,
    pub next_minor: u64,
}

impl VersionBump {
    /// The version as observed, normalized (`3.07` renders as `3.7`).
    pub fn before(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    /// The version with the minor component incremented.
    pub fn after(&self) -> String {
        format!("{}.{}", self.major, self.next_minor)
    }
}

impl fmt::Display for VersionBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.before(), self.after())
    }
}

/// Split a `<major>.<minor>` tag and compute the next minor version.
pub fn next_minor(tag: &str) -> Result<VersionBump, VersionFormatError> {
    let (major, minor) = tag
        .split_once('.')
        .ok_or_else(|| VersionFormatError::NotMajorMinor(tag.to_string()))?;

    if minor.contains('.') {
        return Err(VersionFormatError::NotMajorMinor(tag.to_string()));
    }

    let major = parse_component(tag, major)?;
    let minor = parse_component(tag, minor)?;
    let next_minor = minor
        .checked_add(1)
        .ok_or_else(|| VersionFormatError::Overflow(tag.to_string()))?;

    Ok(VersionBump {
        major,
        minor,
        next_minor,
    })
}

fn parse_component(tag: &str, component: &str) -> Result<u64, VersionFormatError> {
    let not_numeric = || VersionFormatError::NotNumeric {
        tag: tag.to_string(),
        component: component.to_string(),
    };

    // `u64::from_str` accepts a leading `+`, which is not a version digit.
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return Err(not_numeric());
    }
    component.parse().map_err(|_| not_numeric())
}
