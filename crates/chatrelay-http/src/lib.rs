//! HTTP server for chatrelay.
//!
//! Exposes the chat API under `/api` and, optionally, a directory of static
//! files for everything else.

mod routes;
mod state;

use axum::{routing::post, Router};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

pub use routes::{ChatRequest, ErrorResponse, ResetRequest};
pub use state::SharedState;

/// Build the application router.
///
/// When `static_dir` is set, unmatched paths are served from it, with
/// `index.html` answering `GET /`.
pub fn router(state: Arc<SharedState>, static_dir: Option<&Path>) -> Router {
    let mut app = Router::new()
        .route("/api/chat", post(routes::chat_handler))
        .route("/api/reset", post(routes::reset_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Handle to a running HTTP server.
#[derive(Default)]
pub struct HttpServerHandle {
    local_addr: Option<SocketAddr>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<std::thread::JoinHandle<()>>,
}

impl HttpServerHandle {
    /// Check if the server is running.
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }

    /// Address the server is bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Stop the server gracefully and wait for it to finish.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.join();
        }
    }
}

/// Resolve `host` to the addresses to try binding, in resolver order.
///
/// Accepts IP literals (including bare IPv6 such as `::`) and hostnames.
fn resolve_bind_addrs(host: &str, port: u16) -> Result<Vec<SocketAddr>, String> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| format!("Invalid address {}: {}", host, e))?
        .collect();
    if addrs.is_empty() {
        return Err(format!("Invalid address {}: no addresses resolved", host));
    }
    Ok(addrs)
}

/// Start the HTTP server on `host:port`.
///
/// The listener is bound before this returns, so address errors are reported
/// to the caller. The server runs in a separate thread with its own tokio
/// runtime. When it stops, the chat service's sessions are released.
pub fn start(
    state: Arc<SharedState>,
    host: &str,
    port: u16,
    static_dir: Option<PathBuf>,
) -> Result<HttpServerHandle, String> {
    let addrs = resolve_bind_addrs(host, port)?;

    let std_listener = std::net::TcpListener::bind(&addrs[..])
        .map_err(|e| format!("Failed to bind HTTP server to {}:{}: {}", host, port, e))?;
    std_listener
        .set_nonblocking(true)
        .map_err(|e| format!("Failed to configure listener: {}", e))?;
    let local_addr = std_listener
        .local_addr()
        .map_err(|e| format!("Failed to read bound address: {}", e))?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let task = std::thread::spawn(move || {
        rt.block_on(async move {
            let chat = Arc::clone(&state.chat);
            let app = router(state, static_dir.as_deref());

            let listener = match tokio::net::TcpListener::from_std(std_listener) {
                Ok(l) => l,
                Err(e) => {
                    log::error!("Failed to register listener on {}: {}", local_addr, e);
                    return;
                }
            };

            log::info!("HTTP server listening on http://{}", local_addr);

            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                    log::info!("HTTP server shutting down");
                })
                .await
            {
                log::error!("HTTP server error: {}", e);
            }

            chat.shutdown();
        });
    });

    Ok(HttpServerHandle {
        local_addr: Some(local_addr),
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

// ============================================================================
// TESTS
// ============================================================================
