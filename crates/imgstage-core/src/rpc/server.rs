//! Server adapter - serves any `ImageStore` over the JSON-RPC contract
//!
//! The HTTP framework is axum, mounted on a single POST route. Store errors
//! travel in the `error` field of a 200 response; only an envelope that cannot
//! be parsed at all gets a 400.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::codec::{self, Call, Request, Response};
use crate::domain::{StoreError, StoreResult};
use crate::ports::ImageStore;

/// Largest accepted request body. Images travel base64 encoded (+33%).
pub const MAX_REQUEST_BYTES: usize = 32 * 1024 * 1024;

#[derive(Clone)]
struct RpcState {
    store: Arc<dyn ImageStore>,
    shutdown: CancellationToken,
}

/// Build a router answering JSON-RPC calls on `path`.
///
/// Cleanup sweeps started over RPC are canceled when `shutdown` fires.
pub fn router(store: Arc<dyn ImageStore>, path: &str, shutdown: CancellationToken) -> Router {
    Router::new()
        .route(path, post(handle))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .with_state(RpcState { store, shutdown })
}

async fn handle(State(state): State<RpcState>, body: Bytes) -> (StatusCode, Json<Response>) {
    let request: Request = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            let err = StoreError::Protocol(format!("undecodable request: {e}"));
            tracing::warn!(error = %err, "rejecting rpc request");
            return (StatusCode::BAD_REQUEST, Json(Response::failure(0, &err)));
        }
    };

    let id = request.id;
    let method = request.method.clone();
    let cancel = state.shutdown.child_token();
    match dispatch(state.store.as_ref(), &cancel, request).await {
        Ok(result) => (StatusCode::OK, Json(Response::success(id, result))),
        Err(err) => {
            tracing::debug!(method = %method, id, error = %err, "rpc call failed");
            (StatusCode::OK, Json(Response::failure(id, &err)))
        }
    }
}

/// Decode a request, run it against `store`, encode the result.
pub async fn dispatch(
    store: &dyn ImageStore,
    cancel: &CancellationToken,
    request: Request,
) -> StoreResult<Option<Value>> {
    match Call::decode(&request.method, request.params)? {
        Call::Save { id, data } => {
            store.save(&id, &data).await?;
            Ok(None)
        }
        Call::Load(id) => {
            let data = store.load(&id).await?;
            Ok(Some(codec::encode_load_result(&data)))
        }
        Call::Commit(id) => {
            store.commit(&id).await?;
            Ok(None)
        }
        Call::Cleanup(ttl) => {
            store.cleanup(cancel, ttl).await?;
            Ok(None)
        }
        Call::GetStagingImages => {
            let snapshot = store.get_staging_images().await?;
            Ok(Some(codec::encode_staging_result(&snapshot)?))
        }
    }
}
