//! In-memory storage for converted outputs.
//!
//! Completed jobs hold a [`BlobId`] into the [`OutputStore`]; the bytes stay
//! alive until the job is removed or the batch is reset.

mod store;

pub use store::{BlobId, OutputStore, StoredOutput};
