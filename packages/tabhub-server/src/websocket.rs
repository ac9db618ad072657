use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::AppState;

pub async fn ws_handler(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| {
        state
            .connections
            .track_future(handle_socket(socket, state.clone()))
    })
}

/// One connection: a send half draining the outbox and a receive half feeding
/// the protocol handler. Whichever ends first takes the other down.
pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let hub = state.hub.clone();
    let shutdown = hub.shutdown_token();

    let (outbox_tx, mut outbox_rx) = mpsc::channel::<String>(state.outbox_capacity);
    let conn_id = hub.connect(outbox_tx).await;

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = outbox_rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let recv_hub = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    recv_hub.handle_message(conn_id, text.as_str()).await;
                }
                Message::Close(_) => break,
                Message::Binary(_) => {
                    debug!(conn = conn_id, "ignoring binary frame");
                }
                // Ping/pong are answered by the transport
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
        _ = shutdown.cancelled() => {
            recv_task.abort();
            send_task.abort();
        }
    };

    hub.disconnect(conn_id).await;
}
