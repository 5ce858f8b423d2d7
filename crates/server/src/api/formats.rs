//! Output format catalog and the global format selector.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use wavesmith_core::{format, OutputFormat};

use super::error::{format_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FormatsResponse {
    pub formats: &'static [OutputFormat],
    pub selected: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SelectFormatBody {
    pub format: String,
}

/// List the catalog and the currently selected format.
pub async fn list_formats(State(state): State<Arc<AppState>>) -> Json<FormatsResponse> {
    Json(FormatsResponse {
        formats: format::all(),
        selected: state.controller().selected_format().id,
    })
}

/// Change the format applied to future uploads.
pub async fn select_format(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SelectFormatBody>,
) -> Result<(StatusCode, Json<OutputFormat>), ApiError> {
    let selected = state
        .controller()
        .select_format(&body.format)
        .map_err(format_error)?;
    info!(format = selected.id, "Output format changed");
    Ok((StatusCode::OK, Json(selected.clone())))
}
