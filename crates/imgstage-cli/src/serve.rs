//! `imgstage serve`: exposes the configured store over JSON-RPC.

use std::error::Error;
use std::net::SocketAddr;

use imgstage_core::rpc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::cleanup_loop::CleanupLoop;
use crate::config::Config;

pub async fn run(config: &Config) -> Result<(), Box<dyn Error>> {
    let store = config.store.build()?;
    let shutdown = CancellationToken::new();

    let sweeper = config.cleanup.interval().map(|interval| {
        let cleanup = CleanupLoop::new(store.clone(), interval, config.cleanup.ttl());
        tokio::spawn(cleanup.run(shutdown.clone()))
    });
    if sweeper.is_none() {
        tracing::info!("cleanup scheduler disabled");
    }

    let app = rpc::router(store, &config.server.path, shutdown.clone());
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, path = %config.server.path, "image store listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Some(handle) = sweeper {
        handle.await?;
    }
    tracing::info!("server stopped");
    Ok(())
}

/// Resolves on ctrl-c or SIGTERM and cancels `token`, which also stops the
/// cleanup scheduler and any in-flight cleanup call.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
        _ = token.cancelled() => {}
    }
    token.cancel();
}
