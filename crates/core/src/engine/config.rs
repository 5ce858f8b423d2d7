//! Configuration for the FFmpeg engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the FFmpeg-backed engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Root directory for per-session scratch filesystems.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// FFmpeg log level. Must be `info` or more verbose for progress ratios,
    /// since the input duration is read from the banner.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Timeout for a single engine command in seconds.
    #[serde(default = "default_exec_timeout")]
    pub exec_timeout_secs: u64,

    /// Additional global ffmpeg arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("wavesmith")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_exec_timeout() -> u64 {
    3600 // 1 hour
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            scratch_dir: default_scratch_dir(),
            log_level: default_log_level(),
            exec_timeout_secs: default_exec_timeout(),
            extra_args: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Creates a config with a custom ffmpeg path.
    pub fn with_ffmpeg_path(ffmpeg_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ..Default::default()
        }
    }

    /// Sets the scratch directory.
    pub fn with_scratch_dir(mut self, scratch_dir: PathBuf) -> Self {
        self.scratch_dir = scratch_dir;
        self
    }

    /// Sets the command timeout in seconds.
    pub fn with_timeout(mut self, exec_timeout_secs: u64) -> Self {
        self.exec_timeout_secs = exec_timeout_secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.exec_timeout_secs, 3600);
        assert!(config.scratch_dir.ends_with("wavesmith"));
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::with_ffmpeg_path(PathBuf::from("/opt/ffmpeg/bin/ffmpeg"))
            .with_scratch_dir(PathBuf::from("/tmp/scratch"))
            .with_timeout(60);

        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.scratch_dir, PathBuf::from("/tmp/scratch"));
        assert_eq!(config.exec_timeout_secs, 60);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str(r#"ffmpeg_path = "/usr/bin/ffmpeg""#).unwrap();
        assert_eq!(config.ffmpeg_path, PathBuf::from("/usr/bin/ffmpeg"));
        assert_eq!(config.exec_timeout_secs, 3600);
        assert!(config.extra_args.is_empty());
    }
}
