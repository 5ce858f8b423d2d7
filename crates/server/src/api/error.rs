//! Error responses shared by the API handlers.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use wavesmith_core::{BatchError, FormatError, JobError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn job_error(e: JobError) -> ApiError {
    let status = match e {
        JobError::NotFound(_) => StatusCode::NOT_FOUND,
        JobError::InvalidTransition { .. } => StatusCode::CONFLICT,
    };
    api_error(status, e.to_string())
}

pub fn format_error(e: FormatError) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, e.to_string())
}

pub fn batch_error(e: BatchError) -> ApiError {
    match e {
        BatchError::Job(e) => job_error(e),
        BatchError::Format(e) => format_error(e),
        BatchError::Validation { .. } => api_error(StatusCode::BAD_REQUEST, e.to_string()),
        BatchError::NotReady { .. } | BatchError::Capacity { .. } => {
            api_error(StatusCode::CONFLICT, e.to_string())
        }
    }
}
