//! In-memory blob store for tests and local runs without a storage account.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{BlobStore, StorageError};

/// A blob held by [`MemoryBlobStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub body: Vec<u8>,
    pub content_type: String,
}

impl StoredBlob {
    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Blob store keeping everything in a map keyed by path.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a copy of the blob stored at `path`.
    pub fn get(&self, path: &str) -> Option<StoredBlob> {
        self.lock().get(path).cloned()
    }

    /// All stored paths in lexical order.
    pub fn paths(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredBlob>> {
        // A poisoned map is still a valid map
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BlobStore for MemoryBlobStore {
    async fn put_blob(
        &self,
        path: &str,
        body: Vec<u8>,
        content_type: &'static str,
    ) -> Result<(), StorageError> {
        self.lock().insert(
            path.to_string(),
            StoredBlob {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}
