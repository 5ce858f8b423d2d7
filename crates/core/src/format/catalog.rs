//! The static format table and command construction.

use serde::Serialize;

use super::error::FormatError;

/// Bitrate applied to lossy formats, in kb/s.
pub const DEFAULT_BITRATE_KBPS: u32 = 192;

/// Format selected when nothing else is configured.
pub const DEFAULT_FORMAT_ID: &str = "mp3";

/// A registered output format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputFormat {
    /// Catalog id, also the output file extension.
    pub id: &'static str,
    /// Label shown in the format selector.
    pub display_label: &'static str,
    /// MIME type declared on the produced file.
    pub mime_type: &'static str,
    /// FFmpeg audio encoder.
    pub codec_name: &'static str,
    /// Whether the encoder gets an explicit `-b:a` argument.
    pub uses_bitrate_cap: bool,
}

impl OutputFormat {
    /// File extension for outputs of this format.
    pub fn extension(&self) -> &'static str {
        self.id
    }

    /// Encoder arguments for this format, bitrate included when capped.
    pub fn codec_args(&self) -> Vec<String> {
        let mut args = vec!["-codec:a".to_string(), self.codec_name.to_string()];
        if self.uses_bitrate_cap {
            args.extend(["-b:a".to_string(), format!("{}k", DEFAULT_BITRATE_KBPS)]);
        }
        args
    }
}

static FORMATS: [OutputFormat; 8] = [
    OutputFormat {
        id: "mp3",
        display_label: "MP3",
        mime_type: "audio/mpeg",
        codec_name: "libmp3lame",
        uses_bitrate_cap: true,
    },
    OutputFormat {
        id: "wav",
        display_label: "WAV",
        mime_type: "audio/wav",
        codec_name: "pcm_s16le",
        uses_bitrate_cap: false,
    },
    OutputFormat {
        id: "m4a",
        display_label: "M4A",
        mime_type: "audio/mp4",
        codec_name: "aac",
        uses_bitrate_cap: true,
    },
    OutputFormat {
        id: "flac",
        display_label: "FLAC",
        mime_type: "audio/flac",
        codec_name: "flac",
        uses_bitrate_cap: false,
    },
    OutputFormat {
        id: "ogg",
        display_label: "OGG",
        mime_type: "audio/ogg",
        codec_name: "libvorbis",
        uses_bitrate_cap: true,
    },
    OutputFormat {
        id: "amr",
        display_label: "AMR",
        mime_type: "audio/amr",
        codec_name: "amrnb",
        uses_bitrate_cap: false,
    },
    OutputFormat {
        id: "mp2",
        display_label: "MP2",
        mime_type: "audio/mpeg",
        codec_name: "mp2",
        uses_bitrate_cap: false,
    },
    OutputFormat {
        id: "m4r",
        display_label: "M4R",
        mime_type: "audio/mp4",
        codec_name: "aac",
        uses_bitrate_cap: true,
    },
];

/// All registered formats, in selector order.
pub fn all() -> &'static [OutputFormat] {
    &FORMATS
}

/// Looks up a format by id (case-insensitive).
pub fn resolve(id: &str) -> Result<&'static OutputFormat, FormatError> {
    let id = id.trim();
    FORMATS
        .iter()
        .find(|f| f.id.eq_ignore_ascii_case(id))
        .ok_or_else(|| FormatError::unknown(id))
}

/// Builds the engine argument list for one conversion.
pub fn build_command(input_name: &str, output_name: &str, format: &OutputFormat) -> Vec<String> {
    let mut args = vec!["-i".to_string(), input_name.to_string()];
    args.extend(format.codec_args());
    args.push(output_name.to_string());
    args
}

/// Replaces the last extension of `name` with `extension`.
///
/// Names without an extension get one appended.
pub fn replace_extension(name: &str, extension: &str) -> String {
    match name.rfind('.') {
        Some(idx) => format!("{}.{}", &name[..idx], extension),
        None => format!("{}.{}", name, extension),
    }
}
