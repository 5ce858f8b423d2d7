//! Error types for the job module.

use thiserror::Error;

use super::types::{JobId, JobStatus};

/// Errors raised by job lookups and lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// No job with this id is in the batch.
    #[error("Job not found: {0}")]
    NotFound(JobId),

    /// The requested transition is not allowed from the current status.
    #[error("Cannot move job {id} from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },
}
