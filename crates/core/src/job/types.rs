//! Types for the job module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::format::{replace_extension, OutputFormat};
use crate::output::BlobId;

/// Identifier of a job, unique for the lifetime of a batch controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Derives an id from the source name, the submission timestamp and the
    /// file's index within that submission.
    pub fn derive(source_name: &str, timestamp_ms: i64, index: usize) -> Self {
        Self(format!("{}-{}-{}", source_name, timestamp_ms, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, not started yet.
    Idle,
    /// Waiting for the engine to become available.
    Uploading,
    /// Inside the engine.
    Converting,
    /// Output is ready for download.
    Completed,
    /// Conversion failed; only removal is possible.
    Failed,
}

impl JobStatus {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Returns the status as a string (for logs and metrics).
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Uploading => "uploading",
            JobStatus::Converting => "converting",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names of a job's entries in the engine's scratch filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchNames {
    pub input: String,
    pub output: String,
}

impl ScratchNames {
    /// Generates fresh names. The input keeps the source extension so the
    /// engine can detect the container.
    pub fn generate(source_name: &str, format: &OutputFormat) -> Self {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let source_ext = source_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "bin".to_string());
        Self {
            input: format!("input_{}.{}", token, source_ext),
            output: format!("output_{}.{}", token, format.extension()),
        }
    }
}

/// Handle to a completed job's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultHandle {
    /// Key of the bytes in the output store.
    #[serde(skip)]
    pub blob: BlobId,
    pub output_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// One file's conversion.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub source_name: String,
    pub source_size_bytes: u64,
    /// Format bound at creation.
    pub format: &'static OutputFormat,
    pub output_name: String,
    pub status: JobStatus,
    /// 0..=100, never decreasing while converting.
    pub progress: u8,
    pub scratch: ScratchNames,
    pub result: Option<ResultHandle>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Creates an idle job bound to `format`.
    pub fn new(
        id: JobId,
        source_name: impl Into<String>,
        source_size_bytes: u64,
        format: &'static OutputFormat,
    ) -> Self {
        let source_name = source_name.into();
        let now = Utc::now();
        Self {
            id,
            output_name: replace_extension(&source_name, format.extension()),
            scratch: ScratchNames::generate(&source_name, format),
            source_name,
            source_size_bytes,
            format,
            status: JobStatus::Idle,
            progress: 0,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Read-only view for listings and events.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            source_name: self.source_name.clone(),
            source_size_bytes: self.source_size_bytes,
            size_display: format_file_size(self.source_size_bytes),
            format: self.format.id.to_string(),
            output_name: self.output_name.clone(),
            status: self.status,
            progress: self.progress,
            result: self.result.clone(),
            error: self.error.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Serializable view of a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub source_name: String,
    pub source_size_bytes: u64,
    pub size_display: String,
    pub format: String,
    pub output_name: String,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultHandle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Human-readable byte size: "0 Bytes", "1.5 KB", "3.25 MB".
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut exponent = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && exponent < UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[exponent])
}
