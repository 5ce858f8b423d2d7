use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use super::{formats, handlers, jobs, middleware::metrics_middleware, ws};
use crate::state::AppState;

/// Upper bound on one multipart upload.
pub const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let ui_dir = state.config().server.ui_dir.clone();

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/status", get(handlers::get_status))
        // Formats
        .route("/formats", get(formats::list_formats))
        .route("/formats/selected", put(formats::select_format))
        // Jobs
        .route(
            "/jobs",
            get(jobs::list_jobs)
                .post(jobs::upload_jobs)
                .delete(jobs::clear_jobs),
        )
        .route("/jobs/{id}", get(jobs::get_job).delete(jobs::remove_job))
        .route("/jobs/{id}/download", get(jobs::download_job))
        // Events
        .route("/ws", get(ws::ws_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state.clone());

    let router = Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state);

    // Serve the UI with SPA fallback when configured
    let router = match ui_dir {
        Some(dir) => {
            let index_path = dir.join("index.html");
            router.fallback_service(ServeDir::new(&dir).fallback(ServeFile::new(index_path)))
        }
        None => router,
    };

    router
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
