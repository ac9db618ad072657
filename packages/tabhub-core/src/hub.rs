//! Connection Hub
//!
//! Owns the live connections and the Source Registry behind a single lock, so a
//! registry mutation and the broadcast of its snapshot are one atomic step and
//! every client sees snapshots in the same order.
//!
//! Connections are represented by their outbox, the sending half of a bounded
//! channel drained by the transport. Delivery never awaits: a full or closed
//! outbox loses that frame only, and is never removed here. Removal is the
//! transport's job once it notices the peer is gone.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::focus::WindowFocuser;
use crate::handler::{self, Outcome};
use crate::protocol::OutboundMessage;
use crate::registry::SourceRegistry;
use crate::tab::{OpaqueId, Snapshot, Tab};

pub type ConnectionId = u64;

/// Frames queued for one connection
pub type Outbox = mpsc::Sender<String>;

struct HubState {
    registry: SourceRegistry,
    connections: BTreeMap<ConnectionId, Outbox>,
}

pub struct Hub {
    state: RwLock<HubState>,
    next_conn_id: AtomicU64,
    focuser: Arc<dyn WindowFocuser>,
    shutdown: CancellationToken,
}

impl Hub {
    pub fn new(focuser: Arc<dyn WindowFocuser>) -> Self {
        Self {
            state: RwLock::new(HubState {
                registry: SourceRegistry::new(),
                connections: BTreeMap::new(),
            }),
            next_conn_id: AtomicU64::new(1),
            focuser,
            shutdown: CancellationToken::new(),
        }
    }

    /// Register a connection and queue the current snapshot for it.
    ///
    /// The snapshot is sent even when no source has pushed yet.
    pub async fn connect(&self, outbox: Outbox) -> ConnectionId {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.write().await;
        let frame = OutboundMessage::tabs_update(&state.registry.merged_snapshot()).encode();
        deliver(conn_id, &outbox, frame);
        state.connections.insert(conn_id, outbox);

        info!(conn = conn_id, clients = state.connections.len(), "client connected");
        conn_id
    }

    /// Remove a connection. Returns false if it was already gone.
    pub async fn disconnect(&self, conn_id: ConnectionId) -> bool {
        let mut state = self.state.write().await;
        let removed = state.connections.remove(&conn_id).is_some();
        if removed {
            info!(conn = conn_id, clients = state.connections.len(), "client disconnected");
        }
        removed
    }

    /// Queue `message` for every live connection except `excluding`.
    ///
    /// Returns how many connections accepted the frame.
    pub async fn broadcast(&self, message: &str, excluding: Option<ConnectionId>) -> usize {
        let state = self.state.write().await;
        fan_out(&state.connections, message, excluding)
    }

    /// Replace a source's tabs and broadcast the new snapshot to everyone,
    /// the pushing connection included.
    pub async fn replace_tabs(&self, browser: &str, tabs: Vec<Tab>) -> usize {
        let mut state = self.state.write().await;
        state.registry.replace_tabs(browser, tabs);
        debug!(browser = %browser, total_tabs = state.registry.tab_count(), "registry updated");
        let frame = OutboundMessage::tabs_update(&state.registry.merged_snapshot()).encode();
        fan_out(&state.connections, &frame, None)
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.registry.merged_snapshot()
    }

    pub async fn find_owner(&self, tab_id: &OpaqueId) -> Option<String> {
        self.state
            .read()
            .await
            .registry
            .find_owner(tab_id)
            .map(str::to_string)
    }

    /// Raise the window of `source` on the blocking pool, outside the hub lock.
    pub async fn focus(&self, source: &str) -> bool {
        let focuser = Arc::clone(&self.focuser);
        let source = source.to_string();
        match tokio::task::spawn_blocking(move || focuser.focus(&source)).await {
            Ok(raised) => raised,
            Err(e) => {
                warn!("window focus task failed: {}", e);
                false
            }
        }
    }

    /// Interpret one inbound text frame from `from`.
    pub async fn handle_message(&self, from: ConnectionId, text: &str) -> Outcome {
        handler::handle_message(self, from, text).await
    }

    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    /// Ask every connection task to stop.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Cancelled once `shutdown` has been called.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

fn fan_out(
    connections: &BTreeMap<ConnectionId, Outbox>,
    message: &str,
    excluding: Option<ConnectionId>,
) -> usize {
    connections
        .iter()
        .filter(|(id, _)| Some(**id) != excluding)
        .filter(|(id, outbox)| deliver(**id, outbox, message.to_string()))
        .count()
}

fn deliver(conn_id: ConnectionId, outbox: &Outbox, frame: String) -> bool {
    match outbox.try_send(frame) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(conn = conn_id, "outbox full, dropping frame");
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!(conn = conn_id, "outbox closed, dropping frame");
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::Value;
    use std::sync::Mutex;

    /// Records focus requests instead of touching the window manager.
    #[derive(Default)]
    pub(crate) struct RecordingFocuser {
        pub calls: Mutex<Vec<String>>,
        pub raise: bool,
    }

    impl WindowFocuser for RecordingFocuser {
        fn focus(&self, source: &str) -> bool {
            self.calls.lock().unwrap().push(source.to_string());
            self.raise
        }
    }

    pub(crate) fn hub_with(focuser: Arc<RecordingFocuser>) -> Hub {
        Hub::new(focuser)
    }

    pub(crate) fn outbox() -> (Outbox, mpsc::Receiver<String>) {
        mpsc::channel(64)
    }

    pub(crate) fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(serde_json::from_str(&frame).unwrap());
        }
        frames
    }

    fn tab(id: i64, title: &str) -> Tab {
        Tab::new(id, title, "http://example.com").with_window(1)
    }

    #[tokio::test]
    async fn test_connect_sends_empty_snapshot() {
        let hub = hub_with(Arc::default());
        let (tx, mut rx) = outbox();
        hub.connect(tx).await;

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "tabs_update");
        assert_eq!(frames[0]["tabs"].as_array().unwrap().len(), 0);
        assert_eq!(frames[0]["browsers"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_late_joiner_gets_union() {
        let hub = hub_with(Arc::default());
        hub.replace_tabs("Chrome", vec![tab(1, "A")]).await;
        hub.replace_tabs("Firefox", vec![tab(2, "B"), tab(3, "C")]).await;

        let (tx, mut rx) = outbox();
        hub.connect(tx).await;

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        let labels: Vec<&str> = frames[0]["tabs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["browser"].as_str().unwrap())
            .collect();
        assert_eq!(labels, vec!["Chrome", "Firefox", "Firefox"]);
        assert_eq!(frames[0]["browsers"], serde_json::json!(["Chrome", "Firefox"]));
    }

    #[tokio::test]
    async fn test_connection_ids_are_unique() {
        let hub = hub_with(Arc::default());
        let (tx1, _rx1) = outbox();
        let (tx2, _rx2) = outbox();
        let a = hub.connect(tx1).await;
        let b = hub.connect(tx2).await;
        assert_ne!(a, b);
        assert_eq!(hub.connection_count().await, 2);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let hub = hub_with(Arc::default());
        let (tx, _rx) = outbox();
        let id = hub.connect(tx).await;

        assert!(hub.disconnect(id).await);
        assert!(!hub.disconnect(id).await);
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender() {
        let hub = hub_with(Arc::default());
        let (tx1, mut rx1) = outbox();
        let (tx2, mut rx2) = outbox();
        let c1 = hub.connect(tx1).await;
        hub.connect(tx2).await;
        drain(&mut rx1);
        drain(&mut rx2);

        let delivered = hub.broadcast(r#"{"type":"ping"}"#, Some(c1)).await;
        assert_eq!(delivered, 1);
        assert!(drain(&mut rx1).is_empty());
        assert_eq!(drain(&mut rx2).len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_survives_dead_connection() {
        let hub = hub_with(Arc::default());
        let (tx1, mut rx1) = outbox();
        let (tx2, rx2) = outbox();
        let (tx3, mut rx3) = outbox();
        hub.connect(tx1).await;
        hub.connect(tx2).await;
        hub.connect(tx3).await;
        drain(&mut rx1);
        drain(&mut rx3);

        // C2's transport is gone but it has not been disconnected yet
        drop(rx2);

        let delivered = hub.broadcast(r#"{"type":"ping"}"#, None).await;
        assert_eq!(delivered, 2);
        assert_eq!(drain(&mut rx1).len(), 1);
        assert_eq!(drain(&mut rx3).len(), 1);
        assert_eq!(hub.connection_count().await, 3);
    }

    #[tokio::test]
    async fn test_full_outbox_does_not_block_others() {
        let hub = hub_with(Arc::default());
        let (slow_tx, _slow_rx) = mpsc::channel(1);
        let (tx, mut rx) = outbox();
        // The connect snapshot fills the slow outbox
        hub.connect(slow_tx).await;
        hub.connect(tx).await;
        drain(&mut rx);

        hub.replace_tabs("Edge", vec![tab(1, "E")]).await;
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn test_replace_tabs_broadcasts_to_everyone() {
        let hub = hub_with(Arc::default());
        let (tx1, mut rx1) = outbox();
        let (tx2, mut rx2) = outbox();
        hub.connect(tx1).await;
        hub.connect(tx2).await;
        drain(&mut rx1);
        drain(&mut rx2);

        assert_eq!(hub.replace_tabs("Brave", vec![tab(1, "B")]).await, 2);
        let frames = drain(&mut rx1);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["tabs"][0]["browser"], "Brave");
        assert_eq!(drain(&mut rx2), frames);
    }

    #[tokio::test]
    async fn test_focus_runs_focuser() {
        let focuser = Arc::new(RecordingFocuser {
            raise: true,
            ..Default::default()
        });
        let hub = hub_with(focuser.clone());

        assert!(hub.focus("Opera GX").await);
        assert_eq!(*focuser.calls.lock().unwrap(), vec!["Opera GX"]);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_token() {
        let hub = hub_with(Arc::default());
        let token = hub.shutdown_token();
        assert!(!token.is_cancelled());
        hub.shutdown();
        assert!(token.is_cancelled());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sources_never_interleave() {
        const ROUNDS: usize = 50;
        const TABS_PER_PUSH: usize = 5;

        let hub = Arc::new(hub_with(Arc::default()));
        let (tx, mut rx) = mpsc::channel(4 * ROUNDS);
        hub.connect(tx).await;

        let push = |browser: &'static str| {
            let hub = Arc::clone(&hub);
            tokio::spawn(async move {
                for round in 0..ROUNDS {
                    let tabs = (0..TABS_PER_PUSH)
                        .map(|i| tab(i as i64, &format!("round {}", round)))
                        .collect();
                    hub.replace_tabs(browser, tabs).await;
                }
            })
        };
        let a = push("Chrome");
        let b = push("Firefox");
        a.await.unwrap();
        b.await.unwrap();

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1 + 2 * ROUNDS);
        for frame in &frames {
            for browser in ["Chrome", "Firefox"] {
                let titles: Vec<&str> = frame["tabs"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .filter(|t| t["browser"] == browser)
                    .map(|t| t["title"].as_str().unwrap())
                    .collect();
                // Either absent or one complete push
                assert!(titles.is_empty() || titles.len() == TABS_PER_PUSH);
                assert!(titles.windows(2).all(|w| w[0] == w[1]));
            }
        }
    }
}
