//! Types for the batch module.

use serde::Serialize;

use super::error::BatchError;
use crate::job::{JobId, JobSnapshot};

/// A file handed to the batch.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Outcome of one submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubmitReport {
    /// Jobs created, in submission order.
    pub accepted: Vec<JobId>,
    /// Names of files refused by the extension check.
    pub rejected: Vec<String>,
    /// Valid files left out because the batch was full.
    pub dropped_for_capacity: usize,
}

/// Job counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub idle: usize,
    pub uploading: usize,
    pub converting: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Aggregate view of the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchStatus {
    pub total_jobs: usize,
    pub max_jobs: usize,
    pub remaining_capacity: usize,
    pub counts: StatusCounts,
    pub selected_format: String,
    pub engine: String,
    pub engine_loaded: bool,
    /// Outputs currently held in memory.
    pub live_outputs: usize,
    /// Outputs released by removal or reset.
    pub released_outputs: u64,
}

/// Severity of a user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
    /// Job the notice is about, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
}

impl Notice {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            message: message.into(),
            job_id: None,
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            message: message.into(),
            job_id: None,
        }
    }

    pub fn for_job(mut self, job_id: &JobId) -> Self {
        self.job_id = Some(job_id.clone());
        self
    }

    /// Engine finished loading for the first time.
    pub fn engine_ready() -> Self {
        Self::success("Ready!", "Audio converter loaded successfully.")
    }

    /// Engine failed to load while starting `file_name`.
    pub fn engine_load_failed(file_name: &str) -> Self {
        Self::error(
            "Error",
            format!(
                "Failed to load audio converter. {} was not converted. Please try again.",
                file_name
            ),
        )
    }

    /// File refused by the extension check.
    pub fn invalid_file(file_name: &str) -> Self {
        let reason = BatchError::Validation {
            file_name: file_name.to_string(),
        };
        Self::error("Invalid file format", reason.to_string())
    }

    /// Files left out because the batch is full.
    pub fn too_many_files(max_jobs: usize, dropped: usize) -> Self {
        Self::error(
            "Too many files",
            BatchError::Capacity { max_jobs, dropped }.to_string(),
        )
    }

    /// Job completed.
    pub fn conversion_completed(file_name: &str, format_label: &str) -> Self {
        Self::success(
            "Conversion completed!",
            format!("{} has been converted to {}.", file_name, format_label),
        )
    }

    /// Job failed inside the engine.
    pub fn conversion_failed(file_name: &str) -> Self {
        Self::error(
            "Conversion failed",
            format!(
                "There was an error converting {}. Please try again.",
                file_name
            ),
        )
    }
}

/// Events published by the batch controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    /// A job was accepted.
    JobAdded { job: JobSnapshot },
    /// A job changed status or progress.
    JobUpdated { job: JobSnapshot },
    /// A job was removed by the user.
    JobRemoved { job_id: JobId },
    /// Every job was removed.
    BatchCleared { removed: usize },
    /// The global format selector changed.
    FormatSelected { format: String },
    /// A user notification.
    Notice(Notice),
}
