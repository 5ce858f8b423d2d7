//! Batch intake and job orchestration.
//!
//! The [`BatchController`] validates submitted files, enforces the job cap,
//! spawns one driver task per accepted file and exposes the ordered job list,
//! downloads and an event stream. Drivers share the engine through the
//! [`EngineAdapter`](crate::engine::EngineAdapter), so conversions run one at
//! a time in lease order while intake and listing stay responsive.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wavesmith_core::batch::{BatchConfig, BatchController, SourceFile};
//! use wavesmith_core::engine::{EngineAdapter, EngineConfig, FfmpegEngine};
//!
//! let engine = FfmpegEngine::new(EngineConfig::default());
//! let controller = BatchController::new(
//!     BatchConfig::default(),
//!     EngineAdapter::new(Arc::new(engine)),
//! );
//!
//! controller.select_format("wav")?;
//! let report = controller
//!     .submit(vec![SourceFile::new("song.mp3", bytes)])
//!     .await;
//! ```

mod config;
mod controller;
mod driver;
mod error;
mod registry;
mod types;
mod validation;

pub use config::{BatchConfig, DEFAULT_ALLOWED_EXTENSIONS};
pub use controller::BatchController;
pub use error::BatchError;
pub use types::{
    BatchEvent, BatchStatus, Notice, NoticeLevel, SourceFile, StatusCounts, SubmitReport,
};
pub use validation::{is_allowed, screen, Intake};
