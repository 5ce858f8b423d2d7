//! Lifecycle transitions.
//!
//! ```text
//! Idle -> Uploading -> Converting -> Completed
//!             |            |
//!             +-> Failed <-+
//! ```
//!
//! A rejected transition leaves the job untouched.

use chrono::Utc;

use super::error::JobError;
use super::types::{Job, JobStatus, ResultHandle};

impl Job {
    fn transition(&mut self, allowed_from: &[JobStatus], to: JobStatus) -> Result<(), JobError> {
        if !allowed_from.contains(&self.status) {
            return Err(JobError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Idle -> Uploading. Progress is held at 0 while the engine loads.
    pub fn begin_upload(&mut self) -> Result<(), JobError> {
        self.transition(&[JobStatus::Idle], JobStatus::Uploading)?;
        self.progress = 0;
        Ok(())
    }

    /// Uploading -> Converting, resetting progress.
    pub fn begin_converting(&mut self) -> Result<(), JobError> {
        self.transition(&[JobStatus::Uploading], JobStatus::Converting)?;
        self.progress = 0;
        Ok(())
    }

    /// Applies a progress ratio while converting.
    ///
    /// The ratio is clamped to 0.0 - 1.0 and never moves progress backwards.
    /// Returns whether the visible percentage changed.
    pub fn record_progress(&mut self, ratio: f64) -> Result<bool, JobError> {
        if self.status != JobStatus::Converting {
            return Err(JobError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: JobStatus::Converting,
            });
        }
        let ratio = if ratio.is_finite() {
            ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let percent = (ratio * 100.0).round() as u8;
        if percent <= self.progress {
            return Ok(false);
        }
        self.progress = percent;
        self.updated_at = Utc::now();
        Ok(true)
    }

    /// Converting -> Completed with the result handle.
    pub fn complete(&mut self, handle: ResultHandle) -> Result<(), JobError> {
        self.transition(&[JobStatus::Converting], JobStatus::Completed)?;
        self.progress = 100;
        self.result = Some(handle);
        self.error = None;
        Ok(())
    }

    /// Uploading or Converting -> Failed.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), JobError> {
        self.transition(
            &[JobStatus::Uploading, JobStatus::Converting],
            JobStatus::Failed,
        )?;
        self.result = None;
        self.error = Some(reason.into());
        Ok(())
    }
}
