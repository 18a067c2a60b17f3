#![allow(dead_code)]

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// A 1x1 transparent PNG.
pub const PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

pub fn png_base64() -> String {
    BASE64.encode(PNG)
}

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: Router) -> (SocketAddr, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, handle)
}

/// Server that records every request body and answers with a canned reply.
pub struct CannedServer {
    pub url: String,
    bodies: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

#[derive(Clone)]
struct Canned {
    bodies: Arc<Mutex<Vec<String>>>,
    status: StatusCode,
    reply: String,
    delay: Duration,
}

async fn answer(State(canned): State<Canned>, body: Bytes) -> (StatusCode, String) {
    canned
        .bodies
        .lock()
        .unwrap()
        .push(String::from_utf8_lossy(&body).into_owned());
    if !canned.delay.is_zero() {
        tokio::time::sleep(canned.delay).await;
    }
    (canned.status, canned.reply.clone())
}

impl CannedServer {
    pub async fn start(reply: &str) -> Self {
        Self::start_with(StatusCode::OK, reply, Duration::ZERO).await
    }

    pub async fn start_with(status: StatusCode, reply: &str, delay: Duration) -> Self {
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let canned = Canned {
            bodies: bodies.clone(),
            status,
            reply: reply.to_string(),
            delay,
        };
        let router = Router::new().route("/", post(answer)).with_state(canned);
        let (addr, handle) = serve(router).await;
        Self {
            url: format!("http://{addr}/"),
            bodies,
            handle,
        }
    }

    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().unwrap().clone()
    }

    /// The single request this server has seen.
    pub fn only_body(&self) -> String {
        let bodies = self.bodies();
        assert_eq!(bodies.len(), 1, "expected exactly one request, got {bodies:?}");
        bodies[0].clone()
    }
}

impl Drop for CannedServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
