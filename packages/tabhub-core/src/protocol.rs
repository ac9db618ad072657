//! Wire messages
//!
//! Inbound frames are decoded once, here, into a closed enum. Outbound frames
//! carry the merged snapshot; activation requests are relayed as the raw text
//! they arrived in and never re-encoded.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::tab::{OpaqueId, Snapshot, Tab};

const TABS_UPDATE: &str = "tabs_update";
const ACTIVATE_TAB: &str = "activate_tab";

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// A source's complete tab list
    TabsUpdate { browser: String, tabs: Vec<Tab> },
    /// A consumer asks to switch to a tab
    ActivateTab { tab_id: OpaqueId, window_id: OpaqueId },
}

#[derive(Deserialize)]
struct TabsUpdatePayload {
    browser: String,
    tabs: Vec<Tab>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivateTabPayload {
    tab_id: OpaqueId,
    window_id: OpaqueId,
}

impl InboundMessage {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
        let kind = match &value {
            Value::Object(map) => match map.get("type") {
                Some(Value::String(kind)) => kind.clone(),
                _ => return Err(ProtocolError::MissingKind),
            },
            _ => return Err(ProtocolError::NotAnObject),
        };

        match kind.as_str() {
            TABS_UPDATE => {
                let payload: TabsUpdatePayload = serde_json::from_value(value).map_err(|source| {
                    ProtocolError::InvalidPayload {
                        kind: TABS_UPDATE,
                        source,
                    }
                })?;
                Ok(InboundMessage::TabsUpdate {
                    browser: payload.browser,
                    tabs: payload.tabs,
                })
            }
            ACTIVATE_TAB => {
                let payload: ActivateTabPayload = serde_json::from_value(value).map_err(|source| {
                    ProtocolError::InvalidPayload {
                        kind: ACTIVATE_TAB,
                        source,
                    }
                })?;
                Ok(InboundMessage::ActivateTab {
                    tab_id: payload.tab_id,
                    window_id: payload.window_id,
                })
            }
            _ => Err(ProtocolError::UnknownKind(kind)),
        }
    }
}

/// Frames the hub produces itself.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage<'a> {
    #[serde(rename = "tabs_update")]
    TabsUpdate {
        tabs: &'a [Tab],
        browsers: &'a [String],
    },
}

impl<'a> OutboundMessage<'a> {
    pub fn tabs_update(snapshot: &'a Snapshot) -> Self {
        OutboundMessage::TabsUpdate {
            tabs: &snapshot.tabs,
            browsers: &snapshot.browsers,
        }
    }

    pub fn encode(&self) -> String {
        // Only strings, integers and sequences of them; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}
