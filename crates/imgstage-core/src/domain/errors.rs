//! Errors - store error taxonomy
//!
//! Every backend (local or remote) reports failures through [`StoreError`].
//! Each variant renders with a stable message prefix so the RPC client can
//! map remote error text back to the same variant (see `rpc::codec::ERROR_TABLE`).

use thiserror::Error;

use super::ids::ImageId;

/// Coarse classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Write,
    Read,
    Canceled,
    Protocol,
    Remote,
    AlreadyStaged,
    AlreadyCommitted,
    InvalidId,
    Transport,
}

/// StoreError is the error type of every `ImageStore` operation.
///
/// # Display
/// The message prefixes are part of the wire contract: the server sends
/// `to_string()` as the RPC error field and the client parses it back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Load or commit target is absent.
    #[error("image not found: {0}")]
    NotFound(ImageId),

    /// Persisting a mutation failed (disk, or remote unreachable on save/commit/cleanup).
    #[error("image write failed: {0}")]
    Write(String),

    /// Reading from the storage substrate failed.
    #[error("image read failed: {0}")]
    Read(String),

    /// Cleanup was canceled mid-sweep. Deletions already done are kept.
    #[error("cleanup canceled")]
    Canceled,

    /// Malformed RPC request or response.
    #[error("rpc protocol error: {0}")]
    Protocol(String),

    /// Remote-reported failure that maps to no known kind.
    #[error("{0}")]
    Remote(String),

    /// Save under `SavePolicy::Reject` for an id that is already staged.
    #[error("image already staged: {0}")]
    AlreadyStaged(ImageId),

    /// Save for an id that has already been committed.
    #[error("image already committed: {0}")]
    AlreadyCommitted(ImageId),

    /// Id cannot be used as a key by the storage substrate.
    #[error("invalid image id: {0}")]
    InvalidId(ImageId),

    /// The RPC request of a read operation never got a response.
    #[error("rpc transport failed: {0}")]
    Transport(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Write(_) => ErrorKind::Write,
            StoreError::Read(_) => ErrorKind::Read,
            StoreError::Canceled => ErrorKind::Canceled,
            StoreError::Protocol(_) => ErrorKind::Protocol,
            StoreError::Remote(_) => ErrorKind::Remote,
            StoreError::AlreadyStaged(_) => ErrorKind::AlreadyStaged,
            StoreError::AlreadyCommitted(_) => ErrorKind::AlreadyCommitted,
            StoreError::InvalidId(_) => ErrorKind::InvalidId,
            StoreError::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Rebuild an error from its kind and the message detail that followed the prefix.
    pub fn from_parts(kind: ErrorKind, detail: &str) -> Self {
        match kind {
            ErrorKind::NotFound => StoreError::NotFound(ImageId::from(detail)),
            ErrorKind::Write => StoreError::Write(detail.to_string()),
            ErrorKind::Read => StoreError::Read(detail.to_string()),
            ErrorKind::Canceled => StoreError::Canceled,
            ErrorKind::Protocol => StoreError::Protocol(detail.to_string()),
            ErrorKind::Remote => StoreError::Remote(detail.to_string()),
            ErrorKind::AlreadyStaged => StoreError::AlreadyStaged(ImageId::from(detail)),
            ErrorKind::AlreadyCommitted => StoreError::AlreadyCommitted(ImageId::from(detail)),
            ErrorKind::InvalidId => StoreError::InvalidId(ImageId::from(detail)),
            ErrorKind::Transport => StoreError::Transport(detail.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_stable_prefixes() {
        assert_eq!(
            StoreError::NotFound(ImageId::from("54321")).to_string(),
            "image not found: 54321"
        );
        assert_eq!(StoreError::Canceled.to_string(), "cleanup canceled");
        assert_eq!(
            StoreError::Remote("disk on fire".into()).to_string(),
            "disk on fire"
        );
    }

    #[test]
    fn from_parts_inverts_kind() {
        let err = StoreError::AlreadyStaged(ImageId::from("abc"));
        assert_eq!(StoreError::from_parts(err.kind(), "abc"), err);
        assert_eq!(
            StoreError::from_parts(ErrorKind::Canceled, "ignored"),
            StoreError::Canceled
        );
    }
}
