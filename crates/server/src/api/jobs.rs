//! Job upload, inspection, removal and download.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use wavesmith_core::{JobId, JobSnapshot, SourceFile, SubmitReport};

use super::error::{api_error, batch_error, format_error, job_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobSnapshot>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ClearJobsResponse {
    pub removed: usize,
}

/// Accept a multipart upload of one or more `file` fields.
///
/// An optional `format` field changes the global format selector before the
/// files are screened, so the new jobs are bound to it.
pub async fn upload_jobs(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitReport>), ApiError> {
    let mut files = Vec::new();
    let mut format: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(api_error(
                    StatusCode::BAD_REQUEST,
                    format!("Malformed multipart body: {}", e),
                ))
            }
        };

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = match field.file_name() {
                    Some(file_name) if !file_name.is_empty() => file_name.to_string(),
                    _ => {
                        return Err(api_error(
                            StatusCode::BAD_REQUEST,
                            "File field is missing a file name",
                        ))
                    }
                };
                let bytes = field.bytes().await.map_err(|e| {
                    api_error(
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read {}: {}", file_name, e),
                    )
                })?;
                files.push(SourceFile::new(file_name, bytes.to_vec()));
            }
            "format" => {
                let text = field.text().await.map_err(|e| {
                    api_error(
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read format field: {}", e),
                    )
                })?;
                if !text.trim().is_empty() {
                    format = Some(text.trim().to_string());
                }
            }
            other => debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    if files.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "No files in upload"));
    }

    // Jobs take this request's format even if another upload selects a different one
    let controller = state.controller();
    let format = match format {
        Some(id) => Some(controller.select_format(&id).map_err(format_error)?),
        None => None,
    };

    info!(files = files.len(), format = ?format.map(|f| f.id), "Upload received");
    let report = match format {
        Some(format) => controller.submit_with_format(files, format).await,
        None => controller.submit(files).await,
    };
    Ok((StatusCode::ACCEPTED, Json(report)))
}

/// List every job in submission order.
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<ListJobsResponse> {
    let jobs = state.controller().jobs().await;
    let count = jobs.len();
    Json(ListJobsResponse { jobs, count })
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobSnapshot>, ApiError> {
    state
        .controller()
        .job(&JobId::from(id.as_str()))
        .await
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Job not found: {}", id)))
}

/// Remove one job, releasing its output if it has one.
pub async fn remove_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .controller()
        .remove(&JobId::from(id))
        .await
        .map_err(job_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove every job.
pub async fn clear_jobs(State(state): State<Arc<AppState>>) -> Json<ClearJobsResponse> {
    let removed = state.controller().reset().await;
    Json(ClearJobsResponse { removed })
}

/// Stream the converted file of a completed job.
pub async fn download_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let output = state
        .controller()
        .download(&JobId::from(id))
        .await
        .map_err(batch_error)?;

    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(&output.file_name)
    );
    Ok((
        [
            (header::CONTENT_TYPE, output.mime_type.clone()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        output.data.clone(),
    )
        .into_response())
}
