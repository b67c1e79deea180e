// ABOUTME: External collaborators the control loop calls into.
// ABOUTME: Traits for registry, pipeline and stores, plus memory, file, command and Docker backends.

pub mod command;
pub mod docker;
mod error;
pub mod file;
pub mod memory;
mod pipeline;
mod registry;
mod store;

pub use error::{BackendError, BackendResult};
pub use pipeline::{PipelineOps, PipelineRun, RunStatus};
pub use registry::{Manifest, RegistryOps};
pub use store::{MarkerStore, RecordStore, SuppressionMarker};
