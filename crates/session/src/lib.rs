//! AgentDeck session core
//!
//! Maintains a live session with the workbench backend over a single
//! persistent WebSocket and keeps independent slices of derived state (chat
//! transcript, file tree, active files, agent status, current file) in sync
//! via typed envelopes.
//!
//! Flow: UI intent → [`commands`] → [`MessageRouter::send`] →
//! [`ConnectionManager`] → backend. Backend → socket →
//! [`MessageRouter::dispatch`] → projections → UI reads snapshots.
//!
//! One [`Session`] per process lifetime; views share it by reference instead
//! of opening their own sockets.

pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod link;
pub mod projections;
pub mod router;

use std::sync::Arc;

use agentdeck_protocol::{ChatMessage, Envelope};

pub use crate::config::SessionConfig;
pub use crate::connection::ConnectionManager;
pub use crate::error::SessionError;
pub use crate::link::LinkState;
pub use crate::projections::{
    ActiveFilesProjection, ChatTranscript, CurrentFileProjection, FileTreeProjection,
    StatusProjection,
};
pub use crate::router::MessageRouter;

/// One client session: connection, router, and all projections, wired.
pub struct Session {
    connection: Arc<ConnectionManager>,
    router: Arc<MessageRouter>,
    chat: ChatTranscript,
    file_tree: FileTreeProjection,
    active_files: ActiveFilesProjection,
    status: StatusProjection,
    current_file: CurrentFileProjection,
}

impl Session {
    /// Wire the core and start connecting. Returns immediately; the
    /// connection opens (and re-opens) in the background.
    pub fn connect(config: SessionConfig) -> Result<Self, SessionError> {
        let ws_url = config.ws_url()?;

        let router = MessageRouter::new();
        let dispatch = {
            let router = router.clone();
            Arc::new(move |text: &str| router.dispatch(text))
        };
        let connection = Arc::new(ConnectionManager::spawn(ws_url, dispatch));
        router.bind(connection.clone());

        let chat = ChatTranscript::new(&router, &config.welcome_message);
        let file_tree = FileTreeProjection::new(&router);
        let active_files = ActiveFilesProjection::new(&router);
        let status = StatusProjection::new(&router);
        let current_file = CurrentFileProjection::new(&router);

        Ok(Self {
            connection,
            router,
            chat,
            file_tree,
            active_files,
            status,
            current_file,
        })
    }

    /// Send a chat message and optimistically append it to the transcript.
    ///
    /// Returns `Ok(false)` for empty input (nothing sent). A send while
    /// disconnected fails with [`SessionError::NotConnected`] and leaves the
    /// transcript untouched; the caller surfaces the failure and the user
    /// decides whether to retry.
    pub fn send_chat(&self, text: &str) -> Result<bool, SessionError> {
        let Some(envelope) = commands::chat(text) else {
            return Ok(false);
        };
        self.router.send(&envelope)?;
        if let Envelope::Chat {
            content,
            sender,
            timestamp,
        } = envelope
        {
            self.chat.append_local(ChatMessage {
                content,
                sender,
                timestamp,
            });
        }
        Ok(true)
    }

    /// Open `path` in the viewer and request its content.
    pub fn select_file(&self, path: &str) -> Result<(), SessionError> {
        self.current_file.select(path)
    }

    /// Ask the backend to rescan and re-push the workspace tree.
    pub fn refresh_file_tree(&self) -> Result<(), SessionError> {
        self.router.send(&commands::refresh_file_tree())
    }

    /// Truncate the transcript to the welcome entry.
    pub fn clear_chat(&self) {
        self.chat.clear();
    }

    pub fn chat(&self) -> &ChatTranscript {
        &self.chat
    }

    pub fn file_tree(&self) -> &FileTreeProjection {
        &self.file_tree
    }

    pub fn active_files(&self) -> &ActiveFilesProjection {
        &self.active_files
    }

    pub fn status(&self) -> &StatusProjection {
        &self.status
    }

    pub fn current_file(&self) -> &CurrentFileProjection {
        &self.current_file
    }

    /// The router, for collaborators that want their own envelope feed
    /// (e.g. a renderer subscribing alongside the projections).
    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    /// Observed connection state, for "disconnected" indicators.
    pub fn link_state(&self) -> LinkState {
        self.connection.state()
    }

    /// End the session: cancel any pending reconnect and close the socket.
    /// The projections keep their last state for the owner to read.
    pub fn teardown(&self) {
        self.connection.teardown();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.connection.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdeck_protocol::Sender;

    #[test]
    fn echoed_chat_appends_exactly_one_message() {
        // buildChat → wire text → dispatch back through the router.
        let router = MessageRouter::new();
        let chat = ChatTranscript::new(&router, "welcome");

        let envelope = commands::chat("hi").expect("non-empty");
        let wire = serde_json::to_string(&envelope).expect("serialize");
        router.dispatch(&wire);

        let messages = chat.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "hi");
        assert_eq!(messages[1].sender, Sender::User);
    }

    #[tokio::test]
    async fn send_while_disconnected_fails_and_leaves_state_untouched() {
        // Port 9 (discard) is never a workbench backend; the session sits in
        // Connecting/Disconnected and every send must fail cleanly.
        let config = SessionConfig::new("http://127.0.0.1:9").expect("config");
        let session = Session::connect(config).expect("wire session");

        let before = session.chat().len();
        let result = session.send_chat("hello?");
        assert!(matches!(result, Err(SessionError::NotConnected)));
        assert_eq!(session.chat().len(), before);

        let result = session.refresh_file_tree();
        assert!(matches!(result, Err(SessionError::NotConnected)));

        session.teardown();
    }

    #[tokio::test]
    async fn empty_chat_sends_nothing_even_while_disconnected() {
        let config = SessionConfig::new("http://127.0.0.1:9").expect("config");
        let session = Session::connect(config).expect("wire session");

        assert!(matches!(session.send_chat("   "), Ok(false)));
        session.teardown();
    }
}
