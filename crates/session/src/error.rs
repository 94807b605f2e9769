//! Session error taxonomy
//!
//! Nothing here is fatal to the process. Transport failures heal through the
//! reconnect policy, malformed inbound frames are dropped, and a failed
//! outbound send is surfaced to the caller as a failed operation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// An outbound send was attempted while the link is not open. The caller
    /// decides how to surface this; the session never retries on its behalf.
    #[error("not connected to the backend")]
    NotConnected,

    /// Socket-level failure. Recovered locally by the retry policy and only
    /// surfaced for diagnostics.
    #[error("transport error: {0}")]
    Transport(String),

    /// An inbound text frame that does not parse as an envelope.
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] serde_json::Error),

    /// The configured server URL cannot be turned into a socket endpoint.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
