//! Error types for the batch module.

use thiserror::Error;

use crate::format::FormatError;
use crate::job::{JobError, JobId, JobStatus};

/// Errors raised by the batch controller.
///
/// `Validation` and `Capacity` never abort a submission; they are reported
/// to the user as notices and the rest of the batch goes ahead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatchError {
    /// The file's name does not end in an allowed extension.
    #[error("File {file_name} is not an audio file and will be skipped.")]
    Validation { file_name: String },

    /// Valid files were left out because the batch is full.
    #[error("You can convert up to {max_jobs} files at a time. {dropped} files were not added.")]
    Capacity { max_jobs: usize, dropped: usize },

    /// The job has no output to hand out yet.
    #[error("Job {id} has no output ready (status: {status})")]
    NotReady { id: JobId, status: JobStatus },

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_message() {
        let err = BatchError::Capacity {
            max_jobs: 15,
            dropped: 5,
        };
        assert_eq!(
            err.to_string(),
            "You can convert up to 15 files at a time. 5 files were not added."
        );
    }

    #[test]
    fn test_job_error_is_transparent() {
        let err: BatchError = JobError::NotFound(JobId::from("x")).into();
        assert_eq!(err.to_string(), "Job not found: x");
    }
}
