//! Error types for the format catalog.

use thiserror::Error;

/// Errors raised by catalog lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The id is not registered in the catalog.
    #[error("Unknown output format: {id}")]
    Unknown { id: String },
}

impl FormatError {
    /// Creates an unknown format error.
    pub fn unknown(id: impl Into<String>) -> Self {
        Self::Unknown { id: id.into() }
    }
}
