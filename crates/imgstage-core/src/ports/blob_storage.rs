//! BlobStorage port - durable key/value substrate of the local backend
//!
//! The local backend only decides placement (staging vs committed namespace)
//! and TTL arithmetic. Bytes go wherever the `BlobStorage` puts them.
//!
//! # Implementations
//! - `InMemoryBlobStorage`: tests and ephemeral deployments
//! - `FsBlobStorage`: one file per image under `<root>/<namespace>/`

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ImageId, StoreResult};

/// Namespace of a stored blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Staging,
    Committed,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Staging => "staging",
            Namespace::Committed => "committed",
        }
    }
}

/// Stored bytes plus the time they were last written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
    pub modified: DateTime<Utc>,
}

/// Listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMeta {
    pub id: ImageId,
    pub modified: DateTime<Utc>,
}

/// BlobStorage persists bytes by (namespace, id).
///
/// # Thread Safety
/// - `Send + Sync`; callers may issue operations concurrently
/// - atomicity across several calls is the caller's job (LocalStore holds a lock)
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Create or replace a blob. `modified` becomes "now".
    async fn put(&self, ns: Namespace, id: &ImageId, data: &[u8]) -> StoreResult<()>;

    async fn get(&self, ns: Namespace, id: &ImageId) -> StoreResult<Option<Blob>>;

    /// Metadata only, without reading the bytes.
    async fn stat(&self, ns: Namespace, id: &ImageId) -> StoreResult<Option<BlobMeta>>;

    /// Returns whether something was removed.
    async fn delete(&self, ns: Namespace, id: &ImageId) -> StoreResult<bool>;

    async fn list(&self, ns: Namespace) -> StoreResult<Vec<BlobMeta>>;

    /// Move a blob between namespaces. Returns false if `from` had no such blob.
    ///
    /// The default copies then deletes, undoing the copy if the delete fails.
    /// Implementations with a native move (rename) should override it.
    async fn relocate(&self, id: &ImageId, from: Namespace, to: Namespace) -> StoreResult<bool> {
        let Some(blob) = self.get(from, id).await? else {
            return Ok(false);
        };
        self.put(to, id, &blob.data).await?;
        if let Err(e) = self.delete(from, id).await {
            if let Err(undo) = self.delete(to, id).await {
                tracing::error!(id = %id, error = %undo, "failed to undo partial relocate");
            }
            return Err(e);
        }
        Ok(true)
    }
}
