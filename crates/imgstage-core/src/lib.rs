//! imgstage-core
//!
//! Two-phase image storage for a comment engine: uploads land in a staging
//! area, are committed once the referencing content is accepted, and are
//! swept by TTL otherwise.
//!
//! # Modules
//! - **domain**: ids, timestamps, staging view, policies, errors
//! - **ports**: `ImageStore` contract, `BlobStorage` substrate, `Clock`
//! - **impls**: `LocalStore` and its storage substrates
//! - **rpc**: JSON-RPC codec, remote client (`RpcStore`), axum server adapter
//! - **config**: picks local or remote at construction time

pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod rpc;

pub use config::{ConfigError, StoreConfig};
pub use domain::{ErrorKind, ImageId, SavePolicy, StagingSnapshot, StoreError, StoreResult, Timestamp};
pub use ports::ImageStore;
