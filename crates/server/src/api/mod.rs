pub mod error;
pub mod formats;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod routes;
pub mod ws;

pub use error::ErrorResponse;
pub use routes::create_router;
