//! RpcStore - `ImageStore` proxied to a remote process
//!
//! One HTTP POST per call, no caching, no retries. The remote side runs its
//! own `LocalStore`; errors it reports come back through `codec::decode_error`
//! so callers see the same `StoreError` variants a local backend would give.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::codec::{self, Call, Response};
use crate::domain::{ImageId, StagingSnapshot, StoreError, StoreResult};
use crate::ports::ImageStore;

/// RpcStore talks JSON-RPC to `api` (full endpoint URL).
///
/// # Errors
/// - transport failure on save/commit/cleanup → `Write`
/// - transport failure on load/get_staging_images → `Transport`
/// - undecodable or mismatched response → `Protocol`
/// - remote error text → matching variant, else `Remote`
#[derive(Debug)]
pub struct RpcStore {
    client: reqwest::Client,
    api: String,
    next_id: AtomicU64,
}

impl RpcStore {
    pub fn new(api: impl Into<String>) -> Self {
        Self::with_client(api, reqwest::Client::new())
    }

    pub fn with_client(api: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            api: api.into(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Client with a per-request timeout.
    pub fn with_timeout(api: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(api, client))
    }

    pub fn api(&self) -> &str {
        &self.api
    }

    /// Send one call and return its (possibly absent) result.
    async fn call(&self, call: Call) -> StoreResult<Option<Value>> {
        let mutating = matches!(call, Call::Save { .. } | Call::Commit(_) | Call::Cleanup(_));
        let transport = |e: reqwest::Error| {
            if mutating {
                StoreError::Write(format!("rpc call to {} failed: {e}", self.api))
            } else {
                StoreError::Transport(format!("{}: {e}", self.api))
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let method = call.method();
        let request = call.into_request(id);
        tracing::debug!(method, id, api = %self.api, "sending rpc request");

        let response = self
            .client
            .post(&self.api)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;

        let envelope: Response = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(StoreError::Protocol(format!(
                    "{method}: undecodable response: {e}"
                )));
            }
            Err(_) => {
                return Err(StoreError::Protocol(format!(
                    "{method}: unexpected http status {status}"
                )));
            }
        };

        if let Some(error) = envelope.error.filter(|e| !e.is_empty()) {
            tracing::debug!(method, id, error = %error, "rpc call failed remotely");
            return Err(codec::decode_error(&error));
        }
        if !status.is_success() {
            return Err(StoreError::Protocol(format!(
                "{method}: unexpected http status {status}"
            )));
        }
        if envelope.id != id {
            return Err(StoreError::Protocol(format!(
                "{method}: response id {} does not match request id {id}",
                envelope.id
            )));
        }
        Ok(envelope.result)
    }
}

#[async_trait]
impl ImageStore for RpcStore {
    async fn save(&self, id: &ImageId, data: &[u8]) -> StoreResult<()> {
        self.call(Call::Save {
            id: id.clone(),
            data: data.to_vec(),
        })
        .await?;
        Ok(())
    }

    async fn load(&self, id: &ImageId) -> StoreResult<Vec<u8>> {
        let result = self.call(Call::Load(id.clone())).await?;
        codec::decode_load_result(result)
    }

    async fn commit(&self, id: &ImageId) -> StoreResult<()> {
        self.call(Call::Commit(id.clone())).await?;
        Ok(())
    }

    /// Cancellation abandons the in-flight request only; whatever the remote
    /// sweep already deleted stays deleted.
    async fn cleanup(&self, cancel: &CancellationToken, ttl: Duration) -> StoreResult<()> {
        if cancel.is_cancelled() {
            return Err(StoreError::Canceled);
        }
        tokio::select! {
            result = self.call(Call::Cleanup(ttl)) => result.map(|_| ()),
            _ = cancel.cancelled() => {
                tracing::warn!(api = %self.api, "rpc cleanup canceled while in flight");
                Err(StoreError::Canceled)
            }
        }
    }

    async fn get_staging_images(&self) -> StoreResult<StagingSnapshot> {
        let result = self.call(Call::GetStagingImages).await?;
        codec::decode_staging_result(result)
    }
}
