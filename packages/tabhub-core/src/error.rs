use thiserror::Error;

/// Why an inbound frame was dropped.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("message has no \"type\" field")]
    MissingKind,

    #[error("unknown message type: {0}")]
    UnknownKind(String),

    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure talking to the platform window manager.
///
/// Never crosses the `WindowFocuser` boundary; back ends log it and report `false`.
#[derive(Debug, Error)]
pub enum FocusError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("window manager call failed: {0}")]
    Platform(String),
}
