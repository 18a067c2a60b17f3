//! ImageStore port - the staging/commit/cleanup contract
//!
//! Images arrive into a staging area at upload time. Once the content that
//! references them is accepted they are committed (moved) to permanent
//! storage. Staged images nobody commits are removed by a TTL sweep.
//!
//! # Implementations
//! - `impls::LocalStore`: operates on a `BlobStorage` directly
//! - `rpc::RpcStore`: forwards every call to a remote process over JSON-RPC
//!
//! Both must be indistinguishable to callers: same results, same errors.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::domain::{ImageId, StagingSnapshot, StoreResult};

/// ImageStore is the polymorphic image backend.
///
/// # Invariants
/// - an id lives in at most one of {staging, committed}
/// - cleanup never removes a committed image
/// - `get_staging_images` lists the live staging set, only the cleanup
///   timestamp is remembered between calls
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Write `data` into staging under `id`.
    async fn save(&self, id: &ImageId, data: &[u8]) -> StoreResult<()>;

    /// Read an image, staging first then committed storage.
    async fn load(&self, id: &ImageId) -> StoreResult<Vec<u8>>;

    /// Move `id` from staging to committed storage.
    ///
    /// Fails with `NotFound` if `id` is not staged, so a second commit of the
    /// same id fails.
    async fn commit(&self, id: &ImageId) -> StoreResult<()>;

    /// Delete every staged image older than `ttl` and record the sweep time.
    ///
    /// On cancellation returns `Canceled`. Deletions already made stay made,
    /// the recorded sweep time is left untouched.
    async fn cleanup(&self, cancel: &CancellationToken, ttl: Duration) -> StoreResult<()>;

    /// Current staging ids plus the time of the last successful cleanup.
    async fn get_staging_images(&self) -> StoreResult<StagingSnapshot>;
}
