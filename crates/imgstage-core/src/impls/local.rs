//! LocalStore - the staging/commit/cleanup lifecycle engine
//!
//! # Concurrency
//! - one async mutex serializes every mutation (save, commit, each cleanup
//!   deletion), so an id is never visible in both namespaces
//! - load and listings do not take the lock; commit writes the committed
//!   copy before the staged copy disappears, and load checks staging first
//! - cleanup re-checks each candidate under the lock, so a concurrent commit
//!   either wins (candidate gone, skipped) or loses (deleted first, commit
//!   reports `NotFound`)
//!
//! The cleanup cursor is in-memory state of the instance. A restarted process
//! reports the zero timestamp until its first sweep.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::domain::{ImageId, SavePolicy, StagingSnapshot, StoreError, StoreResult, Timestamp};
use crate::ports::{BlobStorage, Clock, ImageStore, Namespace, SystemClock};

/// LocalStore implements `ImageStore` on top of a `BlobStorage`.
pub struct LocalStore<S, C = SystemClock> {
    storage: S,
    clock: C,
    save_policy: SavePolicy,
    /// Serializes mutations across both namespaces.
    write_lock: Mutex<()>,
    /// Time of the last successful cleanup. Written only by `cleanup`.
    cleanup_cursor: RwLock<Timestamp>,
}

impl<S: BlobStorage> LocalStore<S, SystemClock> {
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, SystemClock)
    }
}

impl<S: BlobStorage, C: Clock> LocalStore<S, C> {
    pub fn with_clock(storage: S, clock: C) -> Self {
        Self {
            storage,
            clock,
            save_policy: SavePolicy::default(),
            write_lock: Mutex::new(()),
            cleanup_cursor: RwLock::new(Timestamp::ZERO),
        }
    }

    pub fn with_save_policy(mut self, save_policy: SavePolicy) -> Self {
        self.save_policy = save_policy;
        self
    }

    pub fn save_policy(&self) -> SavePolicy {
        self.save_policy
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Time of the last successful cleanup, zero if none ran.
    pub async fn last_cleanup(&self) -> Timestamp {
        *self.cleanup_cursor.read().await
    }
}

/// `now - arrival > ttl`
fn is_expired(now: DateTime<Utc>, arrival: DateTime<Utc>, ttl: Duration) -> bool {
    let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
    now.signed_duration_since(arrival) > ttl
}

#[async_trait]
impl<S: BlobStorage, C: Clock> ImageStore for LocalStore<S, C> {
    async fn save(&self, id: &ImageId, data: &[u8]) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;

        if self.storage.stat(Namespace::Committed, id).await?.is_some() {
            return Err(StoreError::AlreadyCommitted(id.clone()));
        }
        if self.save_policy == SavePolicy::Reject
            && self.storage.stat(Namespace::Staging, id).await?.is_some()
        {
            return Err(StoreError::AlreadyStaged(id.clone()));
        }

        self.storage.put(Namespace::Staging, id, data).await?;
        tracing::debug!(id = %id, size = data.len(), "staged image");
        Ok(())
    }

    async fn load(&self, id: &ImageId) -> StoreResult<Vec<u8>> {
        for ns in [Namespace::Staging, Namespace::Committed] {
            if let Some(blob) = self.storage.get(ns, id).await? {
                return Ok(blob.data);
            }
        }
        Err(StoreError::NotFound(id.clone()))
    }

    async fn commit(&self, id: &ImageId) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;

        let moved = self
            .storage
            .relocate(id, Namespace::Staging, Namespace::Committed)
            .await?;
        if !moved {
            return Err(StoreError::NotFound(id.clone()));
        }
        tracing::debug!(id = %id, "committed image");
        Ok(())
    }

    async fn cleanup(&self, cancel: &CancellationToken, ttl: Duration) -> StoreResult<()> {
        let started = self.clock.now();
        if cancel.is_cancelled() {
            return Err(StoreError::Canceled);
        }

        let candidates = self.storage.list(Namespace::Staging).await?;
        let mut removed = 0usize;
        let mut kept = 0usize;

        for candidate in candidates {
            if cancel.is_cancelled() {
                tracing::warn!(removed, "cleanup canceled mid-sweep");
                return Err(StoreError::Canceled);
            }
            if !is_expired(started, candidate.modified, ttl) {
                kept += 1;
                continue;
            }

            let _guard = self.write_lock.lock().await;
            // committed or re-saved since the listing?
            match self.storage.stat(Namespace::Staging, &candidate.id).await? {
                Some(current) if is_expired(started, current.modified, ttl) => {
                    if self.storage.delete(Namespace::Staging, &candidate.id).await? {
                        tracing::debug!(id = %candidate.id, "removed expired staged image");
                        removed += 1;
                    }
                }
                Some(_) => kept += 1,
                None => {}
            }
        }

        {
            let mut cursor = self.cleanup_cursor.write().await;
            // never move backwards, even if the clock does
            *cursor = (*cursor).max(Timestamp::from(started));
        }
        tracing::info!(removed, kept, ttl_secs = ttl.as_secs(), "staging cleanup finished");
        Ok(())
    }

    async fn get_staging_images(&self) -> StoreResult<StagingSnapshot> {
        let mut ids: Vec<ImageId> = self
            .storage
            .list(Namespace::Staging)
            .await?
            .into_iter()
            .map(|meta| meta.id)
            .collect();
        ids.sort();
        let last_cleanup = *self.cleanup_cursor.read().await;
        Ok(StagingSnapshot::new(ids, last_cleanup))
    }
}
