//! Configuration for the batch controller.

use serde::{Deserialize, Serialize};

use crate::format::DEFAULT_FORMAT_ID;

/// Extensions accepted at intake when nothing else is configured.
pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 10] = [
    ".mp3", ".wav", ".m4a", ".flac", ".ogg", ".amr", ".mp2", ".m4r", ".aac", ".wma",
];

/// Batch controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum number of jobs held at once.
    #[serde(default = "default_max_jobs")]
    pub max_jobs: usize,

    /// Format selected at startup.
    #[serde(default = "default_format")]
    pub default_format: String,

    /// File name suffixes accepted at intake (case-insensitive).
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Capacity of the batch event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_max_jobs() -> usize {
    15
}

fn default_format() -> String {
    DEFAULT_FORMAT_ID.to_string()
}

fn default_allowed_extensions() -> Vec<String> {
    DEFAULT_ALLOWED_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_event_buffer() -> usize {
    256
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_jobs: default_max_jobs(),
            default_format: default_format(),
            allowed_extensions: default_allowed_extensions(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl BatchConfig {
    /// Sets the job cap.
    pub fn with_max_jobs(mut self, max_jobs: usize) -> Self {
        self.max_jobs = max_jobs;
        self
    }

    /// Sets the startup format.
    pub fn with_default_format(mut self, format: impl Into<String>) -> Self {
        self.default_format = format.into();
        self
    }
}
