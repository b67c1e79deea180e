// ABOUTME: Validated domain types shared by the control loop and its backends.
// ABOUTME: Version tags, repository names, typed identifiers and audit records.

mod id;
mod record;
mod repository;
pub mod version;

pub use id::{ExecutionId, Id, RunId};
pub use record::{Action, AuditRecord, audit_offset, to_audit_time};
pub use repository::{RepositoryName, RepositoryNameError};
pub use version::{VersionBump, VersionFormatError, VersionKey, latest_tag, next_minor};
