//! Ports - abstraction layer
//!
//! The traits the core is written against. Concrete backends live in
//! `impls` (local) and `rpc` (remote).

pub mod blob_storage;
pub mod clock;
pub mod image_store;

pub use self::blob_storage::{Blob, BlobMeta, BlobStorage, Namespace};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::image_store::ImageStore;
