//! FFmpeg-process engine.
//!
//! The scratch filesystem is a per-session directory; commands run with that
//! directory as their working directory so scratch names resolve as relative
//! paths, the same way they do inside an embedded engine.

use async_trait::async_trait;
use regex_lite::Regex;
use std::path::PathBuf;
use std::process::Stdio;
use std::collections::VecDeque;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::broadcast;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::config::EngineConfig;
use super::error::EngineError;
use super::traits::TranscodeEngine;

/// Capacity of the progress broadcast channel.
const PROGRESS_BUFFER: usize = 64;

/// Lines of stderr kept for failure diagnostics.
const STDERR_TAIL_LINES: usize = 20;

/// Engine that runs an external `ffmpeg` binary.
pub struct FfmpegEngine {
    config: EngineConfig,
    session_dir: PathBuf,
    progress_tx: broadcast::Sender<f64>,
}

/// A progress-relevant line of ffmpeg output.
#[derive(Debug, Clone, PartialEq)]
enum ProgressLine {
    /// Input duration from the banner, in seconds.
    Duration(f64),
    /// Output position, in seconds.
    OutTime(f64),
    /// `progress=end`.
    End,
}

impl FfmpegEngine {
    /// Creates an engine with its own scratch session under `config.scratch_dir`.
    pub fn new(config: EngineConfig) -> Self {
        let session_dir = config
            .scratch_dir
            .join(format!("session-{}", uuid::Uuid::new_v4().simple()));
        let (progress_tx, _) = broadcast::channel(PROGRESS_BUFFER);
        Self {
            config,
            session_dir,
            progress_tx,
        }
    }

    /// Creates an engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Directory backing this engine's scratch filesystem.
    pub fn session_dir(&self) -> &PathBuf {
        &self.session_dir
    }

    /// Maps a scratch name to its path, refusing anything but a plain file name.
    fn scratch_path(&self, name: &str) -> Result<PathBuf, EngineError> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\');
        if invalid {
            return Err(EngineError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(self.session_dir.join(name))
    }

    /// Full argument list passed to the ffmpeg process.
    fn build_args(&self, args: &[String]) -> Vec<String> {
        let mut full = vec![
            "-y".to_string(), // Overwrite output
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            self.config.log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ];
        full.extend(self.config.extra_args.iter().cloned());
        full.extend(args.iter().cloned());
        full
    }

    /// Parses one stderr line into a progress-relevant value.
    fn parse_line(line: &str, duration_re: &Regex, time_re: &Regex) -> Option<ProgressLine> {
        let line = line.trim();
        if line == "progress=end" {
            return Some(ProgressLine::End);
        }
        if let Some(caps) = time_re.captures(line) {
            let micros = caps.get(1)?.as_str().parse::<f64>().ok()?;
            // out_time_ms is reported in microseconds
            return Some(ProgressLine::OutTime(micros / 1_000_000.0));
        }
        if let Some(caps) = duration_re.captures(line) {
            let hours = caps.get(1)?.as_str().parse::<f64>().ok()?;
            let minutes = caps.get(2)?.as_str().parse::<f64>().ok()?;
            let seconds = caps.get(3)?.as_str().parse::<f64>().ok()?;
            return Some(ProgressLine::Duration(hours * 3600.0 + minutes * 60.0 + seconds));
        }
        None
    }

    fn publish(&self, ratio: f64) {
        // No receivers just means nobody is watching
        let _ = self.progress_tx.send(ratio.clamp(0.0, 1.0));
    }

    /// Reads ffmpeg's stderr to EOF, publishing progress as it goes.
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than ending the
    /// read, so the pipe is always drained. Returns the last non-progress
    /// lines for diagnostics.
    async fn scan_stderr<R>(
        mut reader: R,
        duration_re: &Regex,
        time_re: &Regex,
        mut publish: impl FnMut(f64),
    ) -> Vec<String>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut duration_secs: Option<f64> = None;
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to read ffmpeg stderr");
                    break;
                }
            }
            let text = String::from_utf8_lossy(&buf);
            // Stats updates are separated by bare carriage returns
            for line in text.trim_end_matches(['\r', '\n']).split('\r') {
                if line.is_empty() {
                    continue;
                }
                match Self::parse_line(line, duration_re, time_re) {
                    Some(ProgressLine::Duration(secs)) => {
                        // First banner duration belongs to the first input
                        if duration_secs.is_none() && secs > 0.0 {
                            duration_secs = Some(secs);
                        }
                    }
                    Some(ProgressLine::OutTime(secs)) => {
                        if let Some(total) = duration_secs {
                            publish(secs / total);
                        }
                    }
                    Some(ProgressLine::End) => publish(1.0),
                    None if !line.contains('=') => {
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line.to_string());
                    }
                    None => {}
                }
            }
        }
        tail.into()
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn load(&self) -> Result<(), EngineError> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EngineError::load_failed(format!(
                        "FFmpeg not found at path: {}",
                        self.config.ffmpeg_path.display()
                    ))
                } else {
                    EngineError::load_failed(e.to_string())
                }
            })?;

        if !output.status.success() {
            return Err(EngineError::load_failed(format!(
                "ffmpeg -version exited with code: {:?}",
                output.status.code()
            )));
        }

        tokio::fs::create_dir_all(&self.session_dir)
            .await
            .map_err(|e| {
                EngineError::load_failed(format!(
                    "Failed to create scratch directory {}: {}",
                    self.session_dir.display(),
                    e
                ))
            })?;

        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("ffmpeg")
            .to_string();
        info!(version = %version, scratch = %self.session_dir.display(), "FFmpeg engine loaded");
        Ok(())
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError> {
        let path = self.scratch_path(name)?;
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn exec(&self, args: &[String]) -> Result<(), EngineError> {
        let full_args = self.build_args(args);
        debug!(args = ?full_args, "Spawning ffmpeg");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&full_args)
            .current_dir(&self.session_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EngineError::execution_failed(
                        format!(
                            "FFmpeg not found at path: {}",
                            self.config.ffmpeg_path.display()
                        ),
                        None,
                    )
                } else {
                    EngineError::from(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::execution_failed("stderr was not captured", None))?;

        let duration_re = Regex::new(r"Duration:\s*(\d+):(\d{2}):(\d{2}(?:\.\d+)?)")
            .map_err(|e| EngineError::execution_failed(e.to_string(), None))?;
        let time_re = Regex::new(r"^out_time_ms=(\d+)$")
            .map_err(|e| EngineError::execution_failed(e.to_string(), None))?;

        let timeout_duration = Duration::from_secs(self.config.exec_timeout_secs);
        let result = timeout(timeout_duration, async {
            let tail = Self::scan_stderr(
                BufReader::new(stderr),
                &duration_re,
                &time_re,
                |ratio| self.publish(ratio),
            )
            .await;
            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, Vec<String>), std::io::Error>((status, tail))
        })
        .await;

        match result {
            Ok(Ok((status, tail))) => {
                if !status.success() {
                    let diagnostics = tail.join("\n");
                    warn!(code = ?status.code(), "ffmpeg exited abnormally");
                    return Err(EngineError::execution_failed(
                        format!("FFmpeg exited with code: {:?}", status.code()),
                        if diagnostics.is_empty() {
                            None
                        } else {
                            Some(diagnostics)
                        },
                    ));
                }
                Ok(())
            }
            Ok(Err(e)) => Err(EngineError::from(e)),
            Err(_) => {
                // Kill the process on timeout
                let _ = child.kill().await;
                Err(EngineError::Timeout {
                    timeout_secs: self.config.exec_timeout_secs,
                })
            }
        }
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        let path = self.scratch_path(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(EngineError::output_missing(name))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineError> {
        let path = self.scratch_path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn progress(&self) -> broadcast::Receiver<f64> {
        self.progress_tx.subscribe()
    }
}
