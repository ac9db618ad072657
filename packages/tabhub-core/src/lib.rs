pub mod error;
pub mod focus;
pub mod handler;
pub mod hub;
pub mod protocol;
pub mod registry;
pub mod tab;

pub use error::{FocusError, ProtocolError};
pub use focus::{platform_focuser, WindowFocuser};
pub use handler::Outcome;
pub use hub::{ConnectionId, Hub, Outbox};
pub use protocol::{InboundMessage, OutboundMessage};
pub use registry::SourceRegistry;
pub use tab::{OpaqueId, Snapshot, Tab};

/// Port the browser extensions dial (`ws://localhost:8765`)
pub const DEFAULT_HUB_PORT: u16 = 8765;

/// Source label used by extensions that could not detect their own browser
pub const UNKNOWN_BROWSER: &str = "Unknown";
