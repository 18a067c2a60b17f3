//! FsBlobStorage - one file per image on the local filesystem
//!
//! Layout: `<root>/staging/<name>`, `<root>/committed/<name>`, plus
//! `<root>/tmp/` for in-flight writes. `<name>` is the hex encoding of the id,
//! so any non-empty id maps to exactly one safe file name. Writes go to a temp
//! file first and are renamed into place, so readers never see a half-written
//! image. Commit is a rename.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

use crate::domain::{ImageId, StoreError, StoreResult};
use crate::ports::{Blob, BlobMeta, BlobStorage, Namespace};

const TMP_DIR: &str = "tmp";
/// Longest file name accepted by common filesystems (ext4, xfs, apfs).
const MAX_NAME_BYTES: usize = 255;

/// FsBlobStorage stores blobs as plain files. `modified` is the file mtime.
#[derive(Debug)]
pub struct FsBlobStorage {
    root: PathBuf,
    tmp_seq: AtomicU64,
}

impl FsBlobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tmp_seq: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir(&self, ns: Namespace) -> PathBuf {
        self.root.join(ns.as_str())
    }

    fn path(&self, ns: Namespace, id: &ImageId) -> StoreResult<PathBuf> {
        Ok(self.dir(ns).join(file_name(id)?))
    }

    /// Temp names carry the pid so processes sharing a root never collide.
    fn tmp_path(&self) -> PathBuf {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(TMP_DIR)
            .join(format!("{}-{seq}.tmp", std::process::id()))
    }
}

/// File name for `id`. Only the empty id and ids too long to encode are refused.
fn file_name(id: &ImageId) -> StoreResult<String> {
    let name = hex::encode(id.as_str());
    if name.is_empty() || name.len() > MAX_NAME_BYTES {
        return Err(StoreError::InvalidId(id.clone()));
    }
    Ok(name)
}

/// Inverse of `file_name`; `None` for files this storage did not write.
fn id_from_file_name(name: &str) -> Option<ImageId> {
    let raw = hex::decode(name).ok()?;
    let id = String::from_utf8(raw).ok()?;
    // uppercase or otherwise non-canonical names would not round-trip
    (!id.is_empty() && hex::encode(&id) == name).then(|| ImageId::from(id))
}

fn write_err(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Write(format!("{}: {e}", path.display()))
}

fn read_err(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Read(format!("{}: {e}", path.display()))
}

fn modified_at(path: &Path, meta: &std::fs::Metadata) -> StoreResult<DateTime<Utc>> {
    meta.modified()
        .map(DateTime::<Utc>::from)
        .map_err(|e| read_err(path, e))
}

#[async_trait]
impl BlobStorage for FsBlobStorage {
    async fn put(&self, ns: Namespace, id: &ImageId, data: &[u8]) -> StoreResult<()> {
        let path = self.path(ns, id)?;
        let tmp = self.tmp_path();
        for dir in [self.dir(ns), self.root.join(TMP_DIR)] {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| write_err(&dir, e))?;
        }

        if let Err(e) = fs::write(&tmp, data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(write_err(&tmp, e));
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(write_err(&path, e));
        }
        Ok(())
    }

    async fn get(&self, ns: Namespace, id: &ImageId) -> StoreResult<Option<Blob>> {
        let path = self.path(ns, id)?;
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(read_err(&path, e)),
        };
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            // removed between read and stat
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(read_err(&path, e)),
        };
        Ok(Some(Blob {
            data,
            modified: modified_at(&path, &meta)?,
        }))
    }

    async fn stat(&self, ns: Namespace, id: &ImageId) -> StoreResult<Option<BlobMeta>> {
        let path = self.path(ns, id)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(BlobMeta {
                id: id.clone(),
                modified: modified_at(&path, &meta)?,
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(read_err(&path, e)),
        }
    }

    async fn delete(&self, ns: Namespace, id: &ImageId) -> StoreResult<bool> {
        let path = self.path(ns, id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
            Err(e) => Err(write_err(&path, e)),
        }
    }

    async fn list(&self, ns: Namespace) -> StoreResult<Vec<BlobMeta>> {
        let dir = self.dir(ns);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(read_err(&dir, e)),
        };

        let mut listed = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| read_err(&dir, e))? {
            let path = entry.path();
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(e) if e.kind() == IoErrorKind::NotFound => continue,
                Err(e) => return Err(read_err(&path, e)),
            };
            if !meta.is_file() {
                continue;
            }
            let Some(id) = entry.file_name().to_str().and_then(id_from_file_name) else {
                tracing::warn!(path = %path.display(), "Skipping foreign file in image store");
                continue;
            };
            listed.push(BlobMeta {
                id,
                modified: modified_at(&path, &meta)?,
            });
        }
        Ok(listed)
    }

    async fn relocate(&self, id: &ImageId, from: Namespace, to: Namespace) -> StoreResult<bool> {
        let src = self.path(from, id)?;
        let dst = self.path(to, id)?;
        let dst_dir = self.dir(to);
        fs::create_dir_all(&dst_dir)
            .await
            .map_err(|e| write_err(&dst_dir, e))?;

        match fs::rename(&src, &dst).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
            Err(e) => Err(write_err(&dst, e)),
        }
    }
}
