//! The batch controller.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock as StdRwLock};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use super::config::BatchConfig;
use super::driver;
use super::error::BatchError;
use super::registry::JobRegistry;
use super::types::{BatchEvent, BatchStatus, Notice, SourceFile, StatusCounts, SubmitReport};
use super::validation::screen;
use crate::engine::EngineAdapter;
use crate::format::{self, FormatError, OutputFormat, DEFAULT_FORMAT_ID};
use crate::job::{Job, JobError, JobId, JobSnapshot, JobStatus};
use crate::metrics::{FILES_REJECTED, JOBS_SUBMITTED};
use crate::output::{OutputStore, StoredOutput};

/// State shared by the controller handle and its job drivers.
pub(super) struct ControllerInner {
    pub(super) config: BatchConfig,
    pub(super) adapter: EngineAdapter,
    pub(super) registry: RwLock<JobRegistry>,
    pub(super) outputs: OutputStore,
    selected_format: StdRwLock<&'static OutputFormat>,
    events_tx: broadcast::Sender<BatchEvent>,
    last_timestamp: StdMutex<i64>,
    ready_announced: AtomicBool,
}

impl ControllerInner {
    pub(super) fn emit(&self, event: BatchEvent) {
        // No subscribers is fine
        let _ = self.events_tx.send(event);
    }

    pub(super) fn notify(&self, notice: Notice) {
        self.emit(BatchEvent::Notice(notice));
    }

    /// Publishes the "Ready!" notice after the first successful load.
    pub(super) fn announce_ready(&self) {
        if !self.ready_announced.swap(true, Ordering::SeqCst) {
            self.notify(Notice::engine_ready());
        }
    }

    /// Applies `f` to the job under the registry lock and publishes the new
    /// snapshot if it succeeded.
    pub(super) async fn update_job<T>(
        &self,
        id: &JobId,
        f: impl FnOnce(&mut Job) -> Result<T, JobError>,
    ) -> Result<T, JobError> {
        let mut registry = self.registry.write().await;
        let job = registry
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound(id.clone()))?;
        let value = f(job)?;
        self.emit(BatchEvent::JobUpdated {
            job: job.snapshot(),
        });
        Ok(value)
    }

    pub(super) async fn contains(&self, id: &JobId) -> bool {
        self.registry.read().await.contains(id)
    }

    /// Next submission timestamp, strictly greater than the previous one.
    fn next_timestamp(&self) -> i64 {
        let mut last = self
            .last_timestamp
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let timestamp = Utc::now().timestamp_millis().max(*last + 1);
        *last = timestamp;
        timestamp
    }

    fn selected_format(&self) -> &'static OutputFormat {
        *self
            .selected_format
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the batch of jobs: intake, fan-out, removal and aggregate views.
///
/// Cloning yields another handle to the same batch.
#[derive(Clone)]
pub struct BatchController {
    inner: Arc<ControllerInner>,
}

impl BatchController {
    /// Creates an empty batch over `adapter`.
    ///
    /// An unknown `default_format` falls back to mp3.
    pub fn new(config: BatchConfig, adapter: EngineAdapter) -> Self {
        let selected = format::resolve(&config.default_format).unwrap_or_else(|e| {
            warn!(error = %e, fallback = DEFAULT_FORMAT_ID, "Unknown default format");
            &format::all()[0]
        });
        let (events_tx, _) = broadcast::channel(config.event_buffer.max(1));

        Self {
            inner: Arc::new(ControllerInner {
                config,
                adapter,
                registry: RwLock::new(JobRegistry::new()),
                outputs: OutputStore::new(),
                selected_format: StdRwLock::new(selected),
                events_tx,
                last_timestamp: StdMutex::new(0),
                ready_announced: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the batch configuration.
    pub fn config(&self) -> &BatchConfig {
        &self.inner.config
    }

    /// Returns the engine adapter.
    pub fn adapter(&self) -> &EngineAdapter {
        &self.inner.adapter
    }

    /// Screens `files`, creates a job per accepted file and starts each one.
    ///
    /// Every job is bound to the format selected at this moment.
    pub async fn submit(&self, files: Vec<SourceFile>) -> SubmitReport {
        let format = self.inner.selected_format();
        self.submit_with_format(files, format).await
    }

    /// Like [`submit`](Self::submit), but binds every job to `format`
    /// regardless of the current selection.
    pub async fn submit_with_format(
        &self,
        files: Vec<SourceFile>,
        format: &'static OutputFormat,
    ) -> SubmitReport {
        let inner = &self.inner;
        let mut report = SubmitReport::default();
        let mut started = Vec::new();

        {
            let mut registry = inner.registry.write().await;
            let intake = screen(
                files,
                &inner.config.allowed_extensions,
                registry.len(),
                inner.config.max_jobs,
            );

            for name in &intake.rejected {
                FILES_REJECTED.with_label_values(&["extension"]).inc();
                inner.notify(Notice::invalid_file(name));
            }
            if intake.dropped_for_capacity > 0 {
                FILES_REJECTED
                    .with_label_values(&["capacity"])
                    .inc_by(intake.dropped_for_capacity as u64);
                inner.notify(Notice::too_many_files(
                    inner.config.max_jobs,
                    intake.dropped_for_capacity,
                ));
            }

            let timestamp = inner.next_timestamp();
            for (index, file) in intake.accepted.into_iter().enumerate() {
                let id = JobId::derive(&file.name, timestamp, index);
                let job = Job::new(id.clone(), file.name.as_str(), file.size_bytes(), format);
                inner.emit(BatchEvent::JobAdded {
                    job: job.snapshot(),
                });
                registry.insert(job);
                report.accepted.push(id.clone());
                started.push((id, file.data));
            }

            report.rejected = intake.rejected;
            report.dropped_for_capacity = intake.dropped_for_capacity;
        }

        JOBS_SUBMITTED.inc_by(started.len() as u64);
        info!(
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            dropped = report.dropped_for_capacity,
            format = format.id,
            "Files submitted"
        );

        for (id, data) in started {
            tokio::spawn(driver::drive(Arc::clone(inner), id, data));
        }
        report
    }

    /// Removes exactly one job and releases its output.
    ///
    /// A job inside the engine finishes its command; its result is then
    /// discarded.
    pub async fn remove(&self, id: &JobId) -> Result<(), JobError> {
        let job = self
            .inner
            .registry
            .write()
            .await
            .remove(id)
            .ok_or_else(|| JobError::NotFound(id.clone()))?;

        if let Some(result) = &job.result {
            self.inner.outputs.release(result.blob);
        }
        info!(job_id = %id, status = %job.status, "Job removed");
        self.inner.emit(BatchEvent::JobRemoved { job_id: id.clone() });
        Ok(())
    }

    /// Removes every job. Returns how many were removed.
    pub async fn reset(&self) -> usize {
        let jobs = self.inner.registry.write().await.drain();
        for job in &jobs {
            if let Some(result) = &job.result {
                self.inner.outputs.release(result.blob);
            }
        }
        info!(removed = jobs.len(), "Batch reset");
        self.inner.emit(BatchEvent::BatchCleared {
            removed: jobs.len(),
        });
        jobs.len()
    }

    /// Snapshots of every job, in submission order.
    pub async fn jobs(&self) -> Vec<JobSnapshot> {
        self.inner
            .registry
            .read()
            .await
            .iter()
            .map(Job::snapshot)
            .collect()
    }

    /// Snapshot of one job.
    pub async fn job(&self, id: &JobId) -> Option<JobSnapshot> {
        self.inner.registry.read().await.get(id).map(Job::snapshot)
    }

    /// Output of a completed job.
    pub async fn download(&self, id: &JobId) -> Result<Arc<StoredOutput>, BatchError> {
        let registry = self.inner.registry.read().await;
        let job = registry
            .get(id)
            .ok_or_else(|| JobError::NotFound(id.clone()))?;
        let result = match (&job.status, &job.result) {
            (JobStatus::Completed, Some(result)) => result,
            _ => {
                return Err(BatchError::NotReady {
                    id: id.clone(),
                    status: job.status,
                })
            }
        };
        self.inner
            .outputs
            .get(result.blob)
            .ok_or_else(|| JobError::NotFound(id.clone()).into())
    }

    /// Changes the format used for future submissions.
    pub fn select_format(&self, id: &str) -> Result<&'static OutputFormat, FormatError> {
        let format = format::resolve(id)?;
        *self
            .inner
            .selected_format
            .write()
            .unwrap_or_else(PoisonError::into_inner) = format;
        debug!(format = format.id, "Format selected");
        self.inner.emit(BatchEvent::FormatSelected {
            format: format.id.to_string(),
        });
        Ok(format)
    }

    /// Format that the next submission will use.
    pub fn selected_format(&self) -> &'static OutputFormat {
        self.inner.selected_format()
    }

    /// Subscribes to batch events.
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Aggregate counts and engine state.
    pub async fn status(&self) -> BatchStatus {
        let registry = self.inner.registry.read().await;
        let mut counts = StatusCounts::default();
        for job in registry.iter() {
            match job.status {
                JobStatus::Idle => counts.idle += 1,
                JobStatus::Uploading => counts.uploading += 1,
                JobStatus::Converting => counts.converting += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        let max_jobs = self.inner.config.max_jobs;

        BatchStatus {
            total_jobs: registry.len(),
            max_jobs,
            remaining_capacity: max_jobs.saturating_sub(registry.len()),
            counts,
            selected_format: self.selected_format().id.to_string(),
            engine: self.inner.adapter.engine_name().to_string(),
            engine_loaded: self.inner.adapter.is_loaded(),
            live_outputs: self.inner.outputs.live_count(),
            released_outputs: self.inner.outputs.released_count(),
        }
    }

    /// Number of outputs released since startup.
    pub fn released_outputs(&self) -> u64 {
        self.inner.outputs.released_count()
    }

    /// Number of outputs currently held.
    pub fn live_outputs(&self) -> usize {
        self.inner.outputs.live_count()
    }
}
