//! Testing utilities and mock implementations.
//!
//! [`MockEngine`] stands in for a real transcoding engine so the batch
//! controller and the HTTP layer can be exercised without ffmpeg installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use wavesmith_core::testing::{fixtures, MockEngine};
//!
//! let engine = MockEngine::new();
//! let controller = fixtures::controller(&engine);
//! controller.submit(vec![fixtures::source_file("song.mp3")]).await;
//! ```

mod mock_engine;

pub use mock_engine::{MockEngine, MOCK_FAILURE_STDERR};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;
    use std::time::Duration;

    use super::MockEngine;
    use crate::batch::{BatchConfig, BatchController, SourceFile};
    use crate::engine::EngineAdapter;
    use crate::job::{JobId, JobSnapshot, JobStatus};

    /// Create a source file with small placeholder audio content.
    pub fn source_file(name: &str) -> SourceFile {
        SourceFile::new(name, format!("audio-bytes-of-{}", name).into_bytes())
    }

    /// Create `count` distinct valid source files.
    pub fn source_files(count: usize) -> Vec<SourceFile> {
        (0..count)
            .map(|i| source_file(&format!("track{:02}.mp3", i + 1)))
            .collect()
    }

    /// Create a controller with default configuration over `engine`.
    pub fn controller(engine: &MockEngine) -> BatchController {
        controller_with_config(engine, BatchConfig::default())
    }

    /// Create a controller with custom configuration over `engine`.
    pub fn controller_with_config(engine: &MockEngine, config: BatchConfig) -> BatchController {
        let adapter = EngineAdapter::new(Arc::new(engine.clone()));
        BatchController::new(config, adapter)
    }

    /// Poll until the job reaches a terminal status.
    ///
    /// Panics after five seconds.
    pub async fn wait_for_terminal(controller: &BatchController, id: &JobId) -> JobSnapshot {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(job) = controller.job(id).await {
                if job.status.is_terminal() {
                    return job;
                }
            }
            if tokio::time::Instant::now() > deadline {
                panic!("job {} did not settle", id);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Poll until every job in the batch is terminal.
    ///
    /// Panics after five seconds.
    pub async fn wait_for_all_terminal(controller: &BatchController) -> Vec<JobSnapshot> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let jobs = controller.jobs().await;
            if jobs.iter().all(|j| j.status.is_terminal()) {
                return jobs;
            }
            if tokio::time::Instant::now() > deadline {
                let pending: Vec<_> = jobs
                    .iter()
                    .filter(|j| !j.status.is_terminal())
                    .map(|j| (j.id.to_string(), j.status))
                    .collect();
                panic!("jobs did not settle: {:?}", pending);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Count jobs with the given status.
    pub fn count_status(jobs: &[JobSnapshot], status: JobStatus) -> usize {
        jobs.iter().filter(|j| j.status == status).count()
    }
}
