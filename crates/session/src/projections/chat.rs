//! Chat transcript projection

use std::sync::{Arc, Mutex};

use agentdeck_protocol::{ChatMessage, Envelope, Sender};

use crate::commands::now_iso;
use crate::router::{MessageRouter, Subscription};

struct Inner {
    /// `messages[0]` is the wholly-local welcome entry; it never came from
    /// the backend and never leaves the transcript.
    messages: Vec<ChatMessage>,
}

/// Append-only transcript in arrival order.
///
/// User messages appear via the optimistic local append in
/// [`crate::Session::send_chat`]; everything else appears on receipt.
pub struct ChatTranscript {
    inner: Arc<Mutex<Inner>>,
    _subscription: Subscription,
}

impl ChatTranscript {
    pub fn new(router: &Arc<MessageRouter>, welcome: &str) -> Self {
        let inner = Arc::new(Mutex::new(Inner {
            messages: vec![ChatMessage {
                content: welcome.to_string(),
                sender: Sender::System,
                timestamp: now_iso(),
            }],
        }));

        let state = inner.clone();
        let subscription = router.subscribe(Box::new(move |envelope| {
            let mut inner = state.lock().expect("chat transcript poisoned");
            match envelope {
                Envelope::Chat {
                    content,
                    sender,
                    timestamp,
                } => {
                    inner.messages.push(ChatMessage {
                        content: content.clone(),
                        sender: *sender,
                        timestamp: if timestamp.is_empty() {
                            now_iso()
                        } else {
                            timestamp.clone()
                        },
                    });
                }
                Envelope::Error { message } => {
                    inner.messages.push(ChatMessage {
                        content: format!("Error: {}", message),
                        sender: Sender::System,
                        timestamp: now_iso(),
                    });
                }
                _ => {}
            }
            Ok(())
        }));

        Self {
            inner,
            _subscription: subscription,
        }
    }

    /// Optimistic append of a locally sent message.
    pub fn append_local(&self, message: ChatMessage) {
        self.inner
            .lock()
            .expect("chat transcript poisoned")
            .messages
            .push(message);
    }

    /// Truncate to the welcome entry only.
    pub fn clear(&self) {
        self.inner
            .lock()
            .expect("chat transcript poisoned")
            .messages
            .truncate(1);
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner
            .lock()
            .expect("chat transcript poisoned")
            .messages
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("chat transcript poisoned")
            .messages
            .len()
    }

    pub fn is_empty(&self) -> bool {
        // Never true: the welcome entry is permanent.
        self.len() == 0
    }
}
