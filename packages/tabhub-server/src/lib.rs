pub mod server;
pub mod websocket;

use axum::{routing::get, Router};
use std::sync::Arc;
use tabhub_core::Hub;
use tokio_util::task::TaskTracker;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

/// Default per-connection outbox capacity (frames)
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

pub struct AppState {
    pub hub: Arc<Hub>,
    /// Connection tasks, awaited on shutdown
    pub connections: TaskTracker,
    /// Frames buffered per connection before new ones are dropped
    pub outbox_capacity: usize,
}

impl AppState {
    pub fn new(hub: Arc<Hub>, outbox_capacity: usize) -> Self {
        Self {
            hub,
            connections: TaskTracker::new(),
            outbox_capacity: outbox_capacity.max(1),
        }
    }

    /// Cancel every connection task and wait for them to finish.
    pub async fn shutdown(&self) {
        self.hub.shutdown();
        self.connections.close();
        self.connections.wait().await;
    }
}

/// Websocket routes for extensions and the popup.
///
/// Extensions dial the bare origin (`ws://localhost:8765`); `/ws` is an alias.
pub fn hub_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(websocket::ws_handler))
        .route("/ws", get(websocket::ws_handler))
        .with_state(state)
}

/// Static responder for the popup markup.
pub fn static_routes(dir: &std::path::Path) -> Router {
    Router::new().fallback_service(ServeDir::new(dir)).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}
