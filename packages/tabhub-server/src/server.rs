use clap::Args;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tabhub_core::{platform_focuser, Hub, DEFAULT_HUB_PORT};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::{hub_routes, static_routes, AppState, DEFAULT_OUTBOX_CAPACITY};

/// Default port for the static popup responder
pub const DEFAULT_STATIC_PORT: u16 = 8000;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid listen address {0}")]
    InvalidAddress(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Host to bind the websocket hub to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Websocket port [default: 8765, or $TABHUB_PORT]
    #[arg(long)]
    pub port: Option<u16>,

    /// Serve this directory (popup markup) over HTTP
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Port for the static responder
    #[arg(long, default_value_t = DEFAULT_STATIC_PORT)]
    pub static_port: u16,

    /// Frames buffered per connection before new ones are dropped
    #[arg(long, default_value_t = DEFAULT_OUTBOX_CAPACITY)]
    pub outbox_capacity: usize,

    /// Verbose logging (overridden by RUST_LOG)
    #[arg(long)]
    pub debug: bool,
}

impl ServerArgs {
    /// `--port`, then `TABHUB_PORT`, then the port extensions dial by default.
    pub fn hub_port(&self) -> u16 {
        self.port
            .or_else(|| {
                std::env::var("TABHUB_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
            })
            .unwrap_or(DEFAULT_HUB_PORT)
    }
}

fn socket_addr(host: &str, port: u16) -> Result<SocketAddr, ServerError> {
    let host = if host == "localhost" { "127.0.0.1" } else { host };
    format!("{}:{}", host, port)
        .parse()
        .or_else(|_| format!("[{}]:{}", host, port).parse())
        .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", host, port)))
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Run the hub until Ctrl+C / SIGTERM. Bind failures are returned to the caller.
pub async fn run(args: ServerArgs) -> Result<(), ServerError> {
    let hub = Arc::new(Hub::new(platform_focuser()));
    let state = Arc::new(AppState::new(hub, args.outbox_capacity));

    let addr = socket_addr(&args.host, args.hub_port())?;
    let listener = bind(addr).await?;
    info!("tabhub listening at ws://{}", addr);

    if let Some(dir) = &args.static_dir {
        let static_addr = socket_addr(&args.host, args.static_port)?;
        let static_listener = bind(static_addr).await?;
        info!("serving {} at http://{}", dir.display(), static_addr);

        let app = static_routes(dir);
        let shutdown = state.hub.shutdown_token();
        tokio::spawn(async move {
            let served = axum::serve(static_listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = served {
                error!("static server stopped: {}", e);
            }
        });
    }

    let served = axum::serve(listener, hub_routes(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    state.shutdown().await;
    info!("tabhub stopped");
    served.map_err(ServerError::Serve)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down");
}
