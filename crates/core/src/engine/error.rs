//! Error types for the engine module.

use thiserror::Error;

/// Errors that can occur while driving the transcoding engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine could not be initialized.
    #[error("Engine failed to load: {reason}")]
    LoadFailed { reason: String },

    /// A primitive was called before the engine finished loading.
    #[error("Engine is not loaded")]
    NotLoaded,

    /// The engine ran the command but reported an abnormal outcome.
    #[error("Engine execution failed: {reason}")]
    ExecutionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The command finished but the expected artifact is not there.
    #[error("Expected output was not produced: {name}")]
    OutputMissing { name: String },

    /// The command ran past the configured limit and was killed.
    #[error("Engine command timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// A scratch name that would escape the engine's filesystem.
    #[error("Invalid scratch file name: {name}")]
    InvalidName { name: String },

    /// I/O error while staging or reading files.
    #[error("I/O error: {0}")]
    Io(String),
}

impl EngineError {
    /// Creates a load failure.
    pub fn load_failed(reason: impl Into<String>) -> Self {
        Self::LoadFailed {
            reason: reason.into(),
        }
    }

    /// Creates an execution failure with optional engine diagnostics.
    pub fn execution_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ExecutionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates an output missing error.
    pub fn output_missing(name: impl Into<String>) -> Self {
        Self::OutputMissing { name: name.into() }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LoadFailed { .. } => "load_failed",
            Self::NotLoaded => "not_loaded",
            Self::ExecutionFailed { .. } => "execution_failed",
            Self::OutputMissing { .. } => "output_missing",
            Self::Timeout { .. } => "timeout",
            Self::InvalidName { .. } => "invalid_name",
            Self::Io(_) => "io",
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_failed_message() {
        let err = EngineError::execution_failed("exit code 1", Some("Invalid data".into()));
        assert_eq!(err.to_string(), "Engine execution failed: exit code 1");
        assert_eq!(err.kind(), "execution_failed");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: EngineError = io.into();
        assert!(matches!(err, EngineError::Io(ref msg) if msg.contains("denied")));
    }
}
