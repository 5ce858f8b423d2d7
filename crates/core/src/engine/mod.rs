//! Transcoding engine access.
//!
//! [`TranscodeEngine`] is the boundary to the engine itself: load, a scratch
//! filesystem, command execution and a progress stream. [`FfmpegEngine`] backs
//! it with an `ffmpeg` binary.
//!
//! Jobs never use an engine directly. They go through [`EngineAdapter`], which
//! loads the engine lazily, hands out one [`EngineLease`] at a time and tags
//! progress ticks with the job holding the lease.

mod adapter;
mod config;
mod error;
mod ffmpeg;
mod traits;

pub use adapter::{EngineAdapter, EngineLease, EngineProgress};
pub use config::EngineConfig;
pub use error::EngineError;
pub use ffmpeg::FfmpegEngine;
pub use traits::TranscodeEngine;
