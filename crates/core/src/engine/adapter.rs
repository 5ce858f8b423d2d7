//! Shared access to a [`TranscodeEngine`].
//!
//! The adapter owns three concerns:
//! - a lazy load that runs once no matter how many jobs ask for it, and is
//!   retried by the next caller after a failure
//! - a FIFO gate so at most one job talks to the engine at a time
//! - re-publishing the engine's anonymous progress ticks tagged with the job
//!   whose command produced them

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};
use tracing::{debug, error, info};

use super::error::EngineError;
use super::traits::TranscodeEngine;
use crate::job::JobId;
use crate::metrics::ENGINE_LOADS;

/// Capacity of the tagged progress channel.
const PROGRESS_BUFFER: usize = 256;

type LoadFuture = Shared<BoxFuture<'static, Result<(), EngineError>>>;

/// A progress tick attributed to a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineProgress {
    pub job_id: JobId,
    pub ratio: f64,
}

enum LoadState {
    Unloaded,
    Loading(LoadFuture),
    Loaded,
}

struct AdapterInner {
    engine: Arc<dyn TranscodeEngine>,
    state: StdMutex<LoadState>,
    gate: Arc<Mutex<()>>,
    progress_tx: broadcast::Sender<EngineProgress>,
}

/// Cloneable handle to the shared engine.
#[derive(Clone)]
pub struct EngineAdapter {
    inner: Arc<AdapterInner>,
}

impl EngineAdapter {
    /// Wraps an engine. Nothing is loaded until [`ensure_loaded`](Self::ensure_loaded).
    pub fn new(engine: Arc<dyn TranscodeEngine>) -> Self {
        let (progress_tx, _) = broadcast::channel(PROGRESS_BUFFER);
        Self {
            inner: Arc::new(AdapterInner {
                engine,
                state: StdMutex::new(LoadState::Unloaded),
                gate: Arc::new(Mutex::new(())),
                progress_tx,
            }),
        }
    }

    /// Name of the wrapped engine.
    pub fn engine_name(&self) -> &str {
        self.inner.engine.name()
    }

    /// Returns true once a load has succeeded.
    pub fn is_loaded(&self) -> bool {
        matches!(
            *self
                .inner
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
            LoadState::Loaded
        )
    }

    /// Loads the engine if needed.
    ///
    /// Concurrent callers share a single in-flight load and all see its
    /// outcome. A failed load leaves the adapter unloaded.
    pub async fn ensure_loaded(&self) -> Result<(), EngineError> {
        let load = {
            let mut state = self
                .inner
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match &*state {
                LoadState::Loaded => return Ok(()),
                LoadState::Loading(load) => load.clone(),
                LoadState::Unloaded => {
                    let inner = Arc::clone(&self.inner);
                    let load = async move { inner.run_load().await }.boxed().shared();
                    *state = LoadState::Loading(load.clone());
                    load
                }
            }
        };
        load.await
    }

    /// Waits for exclusive use of the engine on behalf of `job_id`.
    ///
    /// Waiters are served in arrival order. Fails with
    /// [`EngineError::NotLoaded`] before the first successful load.
    pub async fn acquire(&self, job_id: &JobId) -> Result<EngineLease, EngineError> {
        if !self.is_loaded() {
            return Err(EngineError::NotLoaded);
        }
        let guard = Arc::clone(&self.inner.gate).lock_owned().await;
        debug!(job_id = %job_id, "Engine lease acquired");
        Ok(EngineLease {
            engine: Arc::clone(&self.inner.engine),
            progress_tx: self.inner.progress_tx.clone(),
            job_id: job_id.clone(),
            _guard: guard,
        })
    }

    /// Subscribes to progress ticks tagged with their job.
    ///
    /// Only ticks published while a lease is inside [`EngineLease::run`] are
    /// forwarded. Anything the engine emits between commands is dropped.
    pub fn subscribe_progress(&self) -> broadcast::Receiver<EngineProgress> {
        self.inner.progress_tx.subscribe()
    }
}

impl AdapterInner {
    async fn run_load(self: Arc<Self>) -> Result<(), EngineError> {
        info!(engine = self.engine.name(), "Loading engine");
        let result = self.engine.load().await;

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &result {
            Ok(()) => {
                *state = LoadState::Loaded;
                drop(state);
                ENGINE_LOADS.with_label_values(&["success"]).inc();
                info!(engine = self.engine.name(), "Engine loaded");
            }
            Err(e) => {
                *state = LoadState::Unloaded;
                drop(state);
                ENGINE_LOADS.with_label_values(&["failed"]).inc();
                error!(engine = self.engine.name(), error = %e, "Engine load failed");
            }
        }
        result
    }
}

/// Exclusive use of the engine for one job.
///
/// Dropping the lease admits the next waiter.
pub struct EngineLease {
    engine: Arc<dyn TranscodeEngine>,
    progress_tx: broadcast::Sender<EngineProgress>,
    job_id: JobId,
    _guard: OwnedMutexGuard<()>,
}

impl EngineLease {
    /// Job this lease was granted to.
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Stages input bytes in the engine's scratch filesystem.
    pub async fn write_input(&self, name: &str, data: &[u8]) -> Result<(), EngineError> {
        self.engine.write_file(name, data).await
    }

    /// Runs one engine command.
    ///
    /// Ticks the engine publishes while the command runs are re-published
    /// tagged with this lease's job.
    pub async fn run(&self, args: &[String]) -> Result<(), EngineError> {
        debug!(job_id = %self.job_id, args = ?args, "Running engine command");
        // Must subscribe before exec starts
        let mut ticks = self.engine.progress();
        let exec = self.engine.exec(args);
        tokio::pin!(exec);

        let result = loop {
            tokio::select! {
                result = &mut exec => break result,
                tick = ticks.recv() => match tick {
                    Ok(ratio) => self.forward(ratio),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(job_id = %self.job_id, skipped, "Progress ticks lagged");
                    }
                    Err(RecvError::Closed) => break (&mut exec).await,
                },
            }
        };

        // Ticks published just before the command returned
        loop {
            match ticks.try_recv() {
                Ok(ratio) => self.forward(ratio),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        result
    }

    fn forward(&self, ratio: f64) {
        let _ = self.progress_tx.send(EngineProgress {
            job_id: self.job_id.clone(),
            ratio,
        });
    }

    /// Reads a produced artifact.
    pub async fn read_output(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.engine.read_file(name).await
    }

    /// Deletes a scratch entry; missing entries are ignored.
    pub async fn remove_file(&self, name: &str) -> Result<(), EngineError> {
        self.engine.delete_file(name).await
    }
}

impl Drop for EngineLease {
    fn drop(&mut self) {
        debug!(job_id = %self.job_id, "Engine lease released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEngine;
    use std::time::Duration;

    fn adapter(engine: &MockEngine) -> EngineAdapter {
        EngineAdapter::new(Arc::new(engine.clone()))
    }

    #[tokio::test]
    async fn test_ensure_loaded_is_idempotent() {
        let engine = MockEngine::new();
        let adapter = adapter(&engine);
        assert!(!adapter.is_loaded());

        adapter.ensure_loaded().await.unwrap();
        adapter.ensure_loaded().await.unwrap();
        assert!(adapter.is_loaded());
        assert_eq!(engine.load_count(), 1);
        assert_eq!(adapter.engine_name(), "mock");
    }

    #[tokio::test]
    async fn test_acquire_before_load_fails() {
        let adapter = adapter(&MockEngine::new());
        let err = adapter.acquire(&JobId::from("a")).await.err().unwrap();
        assert!(matches!(err, EngineError::NotLoaded));
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let engine = MockEngine::new();
        engine.fail_next_loads(1);
        let adapter = adapter(&engine);

        let err = adapter.ensure_loaded().await.unwrap_err();
        assert!(matches!(err, EngineError::LoadFailed { .. }));
        assert!(!adapter.is_loaded());

        adapter.ensure_loaded().await.unwrap();
        assert!(adapter.is_loaded());
        assert_eq!(engine.load_count(), 2);
    }

    #[tokio::test]
    async fn test_progress_tagged_with_running_lease() {
        let engine = MockEngine::new();
        let adapter = adapter(&engine);
        adapter.ensure_loaded().await.unwrap();
        let mut progress = adapter.subscribe_progress();

        let lease = adapter.acquire(&JobId::from("job-1")).await.unwrap();
        lease.write_input("in.mp3", b"x").await.unwrap();
        lease
            .run(&["-i".to_string(), "in.mp3".to_string(), "out.wav".to_string()])
            .await
            .unwrap();

        let mut ratios = Vec::new();
        while let Ok(tick) = progress.try_recv() {
            assert_eq!(tick.job_id, JobId::from("job-1"));
            ratios.push(tick.ratio);
        }
        assert_eq!(ratios, vec![0.2, 0.4, 0.6, 0.8, 1.0]);
    }

    #[tokio::test]
    async fn test_ticks_between_commands_are_dropped() {
        let engine = MockEngine::new();
        let adapter = adapter(&engine);
        adapter.ensure_loaded().await.unwrap();
        let mut progress = adapter.subscribe_progress();

        // No lease at all
        engine.emit_progress(0.1);

        // Leased but no command running
        let lease = adapter.acquire(&JobId::from("job-1")).await.unwrap();
        engine.emit_progress(0.5);
        drop(lease);
        tokio::task::yield_now().await;

        assert!(matches!(
            progress.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_lease_is_exclusive() {
        let engine = MockEngine::new();
        let adapter = adapter(&engine);
        adapter.ensure_loaded().await.unwrap();

        let first = adapter.acquire(&JobId::from("first")).await.unwrap();
        let waiter = {
            let adapter = adapter.clone();
            tokio::spawn(async move { adapter.acquire(&JobId::from("second")).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
