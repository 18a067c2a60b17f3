//! RPC - the remote realization of `ImageStore`
//!
//! - **codec**: wire contract (method names, envelopes, encodings, error table)
//! - **client**: `RpcStore`, the remote backend
//! - **server**: axum adapter serving any `ImageStore` over the same contract

pub mod client;
pub mod codec;
pub mod server;

pub use self::client::RpcStore;
pub use self::server::router;
