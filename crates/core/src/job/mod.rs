//! Per-file conversion jobs.
//!
//! A [`Job`] is created idle when a file is accepted and is only moved by the
//! transition methods in `machine`. Terminal jobs carry either a
//! [`ResultHandle`] or an error string, never both.

mod error;
mod machine;
mod types;

pub use error::JobError;
pub use types::{
    format_file_size, Job, JobId, JobSnapshot, JobStatus, ResultHandle, ScratchNames,
};
