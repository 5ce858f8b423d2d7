//! Output format catalog.
//!
//! A static registry mapping an output format id (`"mp3"`, `"wav"`, ...) to the
//! container MIME type, the FFmpeg audio codec, and the bitrate policy used when
//! building the engine command line.
//!
//! # Example
//!
//! ```ignore
//! use wavesmith_core::format::{self, build_command};
//!
//! let wav = format::resolve("wav")?;
//! assert_eq!(wav.mime_type, "audio/wav");
//!
//! let args = build_command("in_1.mp3", "out_1.wav", wav);
//! // ["-i", "in_1.mp3", "-codec:a", "pcm_s16le", "out_1.wav"]
//! ```

mod catalog;
mod error;

pub use catalog::{
    all, build_command, resolve, replace_extension, OutputFormat, DEFAULT_BITRATE_KBPS,
    DEFAULT_FORMAT_ID,
};
pub use error::FormatError;
