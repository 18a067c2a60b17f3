//! InMemoryBlobStorage - HashMap backed storage substrate
//!
//! Nothing survives the process. Used by tests and by the `local` backend
//! when no root directory is configured.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::{ImageId, StoreResult};
use crate::ports::{Blob, BlobMeta, BlobStorage, Clock, Namespace, SystemClock};

/// InMemoryBlobStorage keeps one map per namespace.
///
/// `modified` is stamped from the injected clock, so tests can age blobs by
/// advancing a `FixedClock`.
pub struct InMemoryBlobStorage<C = SystemClock> {
    blobs: RwLock<HashMap<Namespace, HashMap<ImageId, Blob>>>,
    clock: C,
}

impl InMemoryBlobStorage<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InMemoryBlobStorage<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InMemoryBlobStorage<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            clock,
        }
    }
}

#[async_trait]
impl<C: Clock> BlobStorage for InMemoryBlobStorage<C> {
    async fn put(&self, ns: Namespace, id: &ImageId, data: &[u8]) -> StoreResult<()> {
        let blob = Blob {
            data: data.to_vec(),
            modified: self.clock.now(),
        };
        self.blobs
            .write()
            .await
            .entry(ns)
            .or_default()
            .insert(id.clone(), blob);
        Ok(())
    }

    async fn get(&self, ns: Namespace, id: &ImageId) -> StoreResult<Option<Blob>> {
        let blobs = self.blobs.read().await;
        Ok(blobs.get(&ns).and_then(|m| m.get(id)).cloned())
    }

    async fn stat(&self, ns: Namespace, id: &ImageId) -> StoreResult<Option<BlobMeta>> {
        let blobs = self.blobs.read().await;
        Ok(blobs.get(&ns).and_then(|m| m.get(id)).map(|blob| BlobMeta {
            id: id.clone(),
            modified: blob.modified,
        }))
    }

    async fn delete(&self, ns: Namespace, id: &ImageId) -> StoreResult<bool> {
        let mut blobs = self.blobs.write().await;
        Ok(blobs
            .get_mut(&ns)
            .is_some_and(|m| m.remove(id).is_some()))
    }

    async fn list(&self, ns: Namespace) -> StoreResult<Vec<BlobMeta>> {
        let blobs = self.blobs.read().await;
        let Some(m) = blobs.get(&ns) else {
            return Ok(Vec::new());
        };
        Ok(m
            .iter()
            .map(|(id, blob)| BlobMeta {
                id: id.clone(),
                modified: blob.modified,
            })
            .collect())
    }

    /// Single write lock, so the move is atomic for concurrent readers.
    async fn relocate(&self, id: &ImageId, from: Namespace, to: Namespace) -> StoreResult<bool> {
        let mut blobs = self.blobs.write().await;
        let Some(blob) = blobs.get_mut(&from).and_then(|m| m.remove(id)) else {
            return Ok(false);
        };
        blobs.entry(to).or_default().insert(id.clone(), blob);
        Ok(true)
    }
}
