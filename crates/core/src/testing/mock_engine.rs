//! Mock transcoding engine for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

use crate::engine::{EngineError, TranscodeEngine};

/// Progress ratios emitted during every simulated command.
const PROGRESS_STEPS: [f64; 5] = [0.2, 0.4, 0.6, 0.8, 1.0];

/// Diagnostic attached to injected command failures.
pub const MOCK_FAILURE_STDERR: &str = "Invalid data found when processing input";

/// Mock implementation of the TranscodeEngine trait.
///
/// Provides controllable behavior for testing:
/// - In-memory scratch filesystem
/// - Recorded commands for assertions
/// - Load counting, delays and injected load failures
/// - Injected command failures keyed on input content
/// - Simulated progress and a high-water mark of concurrent commands
///
/// Clones share all state, so a test can keep one handle while the adapter
/// owns another.
///
/// # Example
///
/// ```rust,ignore
/// use wavesmith_core::testing::MockEngine;
///
/// let engine = MockEngine::new();
/// engine.fail_exec_for_input(b"corrupt");
///
/// let adapter = EngineAdapter::new(Arc::new(engine.clone()));
/// // ... run jobs ...
///
/// assert_eq!(engine.load_count(), 1);
/// assert_eq!(engine.max_concurrent_execs(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockEngine {
    /// Scratch filesystem.
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    /// Every command passed to `exec`.
    commands: Arc<RwLock<Vec<Vec<String>>>>,
    loaded: Arc<AtomicBool>,
    load_count: Arc<AtomicUsize>,
    /// Number of upcoming loads that will fail.
    load_failures: Arc<AtomicUsize>,
    load_delay_ms: Arc<AtomicU64>,
    exec_delay_ms: Arc<AtomicU64>,
    /// Commands whose input contains one of these byte strings fail.
    fail_markers: Arc<StdMutex<Vec<Vec<u8>>>>,
    /// When set, commands succeed without producing output.
    skip_output: Arc<AtomicBool>,
    in_exec: Arc<AtomicUsize>,
    max_concurrent: Arc<AtomicUsize>,
    progress_tx: broadcast::Sender<f64>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// Create a new mock engine that loads instantly and converts in ~10ms.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(64);
        Self {
            files: Arc::new(RwLock::new(HashMap::new())),
            commands: Arc::new(RwLock::new(Vec::new())),
            loaded: Arc::new(AtomicBool::new(false)),
            load_count: Arc::new(AtomicUsize::new(0)),
            load_failures: Arc::new(AtomicUsize::new(0)),
            load_delay_ms: Arc::new(AtomicU64::new(0)),
            exec_delay_ms: Arc::new(AtomicU64::new(10)),
            fail_markers: Arc::new(StdMutex::new(Vec::new())),
            skip_output: Arc::new(AtomicBool::new(false)),
            in_exec: Arc::new(AtomicUsize::new(0)),
            max_concurrent: Arc::new(AtomicUsize::new(0)),
            progress_tx,
        }
    }

    /// Number of times `load` has been called.
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    /// Make the next `count` loads fail.
    pub fn fail_next_loads(&self, count: usize) {
        self.load_failures.store(count, Ordering::SeqCst);
    }

    /// Set how long each load takes.
    pub fn set_load_delay(&self, delay: Duration) {
        self.load_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Set how long each command takes.
    pub fn set_exec_delay(&self, delay: Duration) {
        self.exec_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Fail any command whose input contains `marker`.
    pub fn fail_exec_for_input(&self, marker: &[u8]) {
        self.fail_markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(marker.to_vec());
    }

    /// Let commands succeed without writing their output file.
    pub fn set_skip_output(&self, skip: bool) {
        self.skip_output.store(skip, Ordering::SeqCst);
    }

    /// Publish a raw progress tick, as the engine would.
    pub fn emit_progress(&self, ratio: f64) {
        let _ = self.progress_tx.send(ratio);
    }

    /// Get all recorded commands.
    pub async fn recorded_commands(&self) -> Vec<Vec<String>> {
        self.commands.read().await.clone()
    }

    /// Get the number of commands executed.
    pub async fn exec_count(&self) -> usize {
        self.commands.read().await.len()
    }

    /// Names currently present in the scratch filesystem.
    pub async fn file_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.files.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Highest number of commands that were ever running at once.
    pub fn max_concurrent_execs(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }

    fn ensure_loaded(&self) -> Result<(), EngineError> {
        if self.loaded.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EngineError::NotLoaded)
        }
    }

    fn should_fail(&self, input: &[u8]) -> bool {
        self.fail_markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|marker| !marker.is_empty() && input.windows(marker.len()).any(|w| w == marker))
    }

    async fn simulate(&self, args: &[String]) -> Result<(), EngineError> {
        let input_name = args
            .iter()
            .position(|a| a == "-i")
            .and_then(|idx| args.get(idx + 1))
            .ok_or_else(|| EngineError::execution_failed("No input specified", None))?;
        let output_name = args
            .last()
            .ok_or_else(|| EngineError::execution_failed("No output specified", None))?;

        let input = self
            .files
            .read()
            .await
            .get(input_name)
            .cloned()
            .ok_or_else(|| {
                EngineError::execution_failed(
                    format!("{}: No such file or directory", input_name),
                    None,
                )
            })?;

        let step = Duration::from_millis(self.exec_delay_ms.load(Ordering::SeqCst))
            / PROGRESS_STEPS.len() as u32;
        for ratio in PROGRESS_STEPS {
            tokio::time::sleep(step).await;
            tokio::task::yield_now().await;
            let _ = self.progress_tx.send(ratio);
        }

        if self.should_fail(&input) {
            return Err(EngineError::execution_failed(
                "Conversion exited with code 1",
                Some(MOCK_FAILURE_STDERR.to_string()),
            ));
        }

        if !self.skip_output.load(Ordering::SeqCst) {
            let mut output = format!("converted[{}]:", output_name).into_bytes();
            output.extend_from_slice(&input);
            self.files.write().await.insert(output_name.clone(), output);
        }
        Ok(())
    }
}

#[async_trait]
impl TranscodeEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn load(&self) -> Result<(), EngineError> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        let delay = self.load_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let failing = self
            .load_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(EngineError::load_failed("mock load failure"));
        }
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        self.files
            .write()
            .await
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn exec(&self, args: &[String]) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        self.commands.write().await.push(args.to_vec());

        let running = self.in_exec.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(running, Ordering::SeqCst);
        let result = self.simulate(args).await;
        self.in_exec.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.ensure_loaded()?;
        self.files
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::output_missing(name))
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        self.files.write().await.remove(name);
        Ok(())
    }

    fn progress(&self) -> broadcast::Receiver<f64> {
        self.progress_tx.subscribe()
    }
}
