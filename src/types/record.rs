// ABOUTME: Immutable audit rows describing completed updates and rollbacks.
// ABOUTME: Timestamps use a fixed UTC+8 offset with whole-second precision.

use chrono::{DateTime, FixedOffset, Offset, SecondsFormat, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::id::{ExecutionId, RunId};
use super::repository::RepositoryName;
use super::version::VersionBump;

const AUDIT_OFFSET_SECS: i32 = 8 * 3600;

/// The fixed offset every audit timestamp is rendered in.
pub fn audit_offset() -> FixedOffset {
    FixedOffset::east_opt(AUDIT_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Convert an instant to the audit offset, dropping sub-second precision.
pub fn to_audit_time<Tz: TimeZone>(at: DateTime<Tz>) -> DateTime<FixedOffset> {
    let local = at.with_timezone(&audit_offset());
    local.with_nanosecond(0).unwrap_or(local)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Update,
    Rollback,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Update => write!(f, "update"),
            Action::Rollback => write!(f, "rollback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub execution_id: ExecutionId,
    #[serde(alias = "ecr_repo")]
    pub repository: RepositoryName,
    #[serde(rename = "date", with = "audit_timestamp")]
    pub timestamp: DateTime<FixedOffset>,
    pub action: Action,
    pub version_before: String,
    pub version_after: String,
}

impl AuditRecord {
    /// Row for an update that started pipeline run `run`.
    pub fn update<Tz: TimeZone>(
        run: &RunId,
        repository: &RepositoryName,
        bump: &VersionBump,
        mutable_tag: &str,
        at: DateTime<Tz>,
    ) -> Self {
        Self {
            execution_id: ExecutionId::from_run(run),
            repository: repository.clone(),
            timestamp: to_audit_time(at),
            action: Action::Update,
            version_before: bump.before(),
            version_after: format!("{} ({})", bump.after(), mutable_tag),
        }
    }

    /// Row for a rollback onto `target`.
    ///
    /// The prior version is inferred as `target` with its minor bumped; it
    /// is not observed and is wrong if minor versions were ever skipped.
    pub fn rollback<Tz: TimeZone>(
        repository: &RepositoryName,
        target: &str,
        bump: &VersionBump,
        mutable_tag: &str,
        at: DateTime<Tz>,
    ) -> Self {
        Self {
            execution_id: ExecutionId::for_rollback(),
            repository: repository.clone(),
            timestamp: to_audit_time(at),
            action: Action::Rollback,
            version_before: bump.after(),
            version_after: format!("{} ({})", target, mutable_tag),
        }
    }
}

mod audit_timestamp {
    use chrono::{DateTime, FixedOffset, SecondsFormat};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<FixedOffset>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, false))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<FixedOffset>, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} -> {} [{}]",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
            self.repository,
            self.action,
            self.version_before,
            self.version_after,
            self.execution_id
        )
    }
}
