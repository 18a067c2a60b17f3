//! Impls - port implementations
//!
//! # Included
//! - **LocalStore**: `ImageStore` over any `BlobStorage`
//! - **InMemoryBlobStorage**: map-backed substrate (tests, ephemeral use)
//! - **FsBlobStorage**: file-per-image substrate
//!
//! The remote `ImageStore` lives in `rpc`.

pub mod fs_blob;
pub mod inmem_blob;
pub mod local;

pub use self::fs_blob::FsBlobStorage;
pub use self::inmem_blob::InMemoryBlobStorage;
pub use self::local::LocalStore;
