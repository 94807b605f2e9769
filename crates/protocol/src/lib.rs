//! AgentDeck Protocol
//!
//! Shared types for communication between the workbench backend and clients.
//! These types are serialized as JSON over WebSocket.

pub mod envelope;
pub mod types;

pub use envelope::Envelope;
pub use types::*;
