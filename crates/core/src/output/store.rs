//! Output store implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use crate::metrics::OUTPUTS_RELEASED;

/// Key of a stored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobId(uuid::Uuid);

impl BlobId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for BlobId {
    fn default() -> Self {
        Self::new()
    }
}

/// A converted file held in memory.
#[derive(Debug)]
pub struct StoredOutput {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Shared map of converted outputs with release accounting.
#[derive(Debug, Clone, Default)]
pub struct OutputStore {
    blobs: Arc<RwLock<HashMap<BlobId, Arc<StoredOutput>>>>,
    released: Arc<AtomicU64>,
}

impl OutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` and returns its key.
    pub fn insert(
        &self,
        data: Vec<u8>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> BlobId {
        let id = BlobId::new();
        let output = Arc::new(StoredOutput {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        });
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, output);
        id
    }

    /// Returns the stored output, if it has not been released.
    pub fn get(&self, id: BlobId) -> Option<Arc<StoredOutput>> {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Drops the bytes behind `id`. Returns false if nothing was stored.
    ///
    /// Downloads already holding the [`Arc`] finish with their copy.
    pub fn release(&self, id: BlobId) -> bool {
        let removed = self
            .blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        match removed {
            Some(output) => {
                self.released.fetch_add(1, Ordering::Relaxed);
                OUTPUTS_RELEASED.inc();
                debug!(file = %output.file_name, bytes = output.data.len(), "Released output");
                true
            }
            None => false,
        }
    }

    /// Number of outputs currently held.
    pub fn live_count(&self) -> usize {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of outputs released since creation.
    pub fn released_count(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }
}
