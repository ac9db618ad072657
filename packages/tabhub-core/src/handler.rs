//! Protocol Handler
//!
//! Applies one decoded inbound message to the hub. There is no per-connection
//! state: a connection becomes a source simply by pushing tabs, and any
//! connection may request an activation.

use tracing::debug;

use crate::error::ProtocolError;
use crate::hub::{ConnectionId, Hub};
use crate::protocol::InboundMessage;
use crate::tab::OpaqueId;

/// What handling a frame did, for logging and tests.
#[derive(Debug)]
pub enum Outcome {
    TabsUpdated {
        browser: String,
        tabs: usize,
        delivered: usize,
    },
    Activated {
        tab_id: OpaqueId,
        owner: Option<String>,
        focused: bool,
        relayed: usize,
    },
    /// The frame was malformed or of an unknown kind; the connection stays open
    Dropped(ProtocolError),
}

pub async fn handle_message(hub: &Hub, from: ConnectionId, text: &str) -> Outcome {
    let message = match InboundMessage::decode(text) {
        Ok(message) => message,
        Err(e) => {
            debug!(conn = from, "dropping message: {}", e);
            return Outcome::Dropped(e);
        }
    };

    match message {
        InboundMessage::TabsUpdate { browser, tabs } => {
            let count = tabs.len();
            let delivered = hub.replace_tabs(&browser, tabs).await;
            debug!(conn = from, browser = %browser, tabs = count, delivered, "tabs updated");
            Outcome::TabsUpdated {
                browser,
                tabs: count,
                delivered,
            }
        }
        InboundMessage::ActivateTab { tab_id, window_id } => {
            let owner = hub.find_owner(&tab_id).await;
            let focused = match &owner {
                Some(source) => hub.focus(source).await,
                None => {
                    debug!(conn = from, tab = %tab_id, "no source owns tab");
                    false
                }
            };

            // Relay verbatim so the owning extension can switch tabs itself
            let relayed = hub.broadcast(text, Some(from)).await;
            debug!(
                conn = from,
                tab = %tab_id,
                window = %window_id,
                owner = ?owner,
                focused,
                relayed,
                "activation relayed"
            );
            Outcome::Activated {
                tab_id,
                owner,
                focused,
                relayed,
            }
        }
    }
}
