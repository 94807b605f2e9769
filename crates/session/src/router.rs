//! Message router
//!
//! Fans every inbound envelope out to the registered subscribers and owns
//! envelope framing for the outbound path. Transport concerns stay in the
//! connection manager; parse/serialize concerns stay here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use tracing::{debug, warn};

use agentdeck_protocol::Envelope;

use crate::connection::ConnectionManager;
use crate::error::SessionError;

/// Subscriber callback. Returning `Err` records a handler failure; it never
/// affects other subscribers or the transport.
pub type Handler = Box<dyn Fn(&Envelope) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_token: u64,
    entries: Vec<(u64, Handler)>,
}

/// Publish/subscribe registry over the envelope stream.
pub struct MessageRouter {
    registry: Mutex<Registry>,
    connection: OnceLock<Arc<ConnectionManager>>,
    malformed: AtomicU64,
    handler_failures: AtomicU64,
}

impl MessageRouter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(Registry::default()),
            connection: OnceLock::new(),
            malformed: AtomicU64::new(0),
            handler_failures: AtomicU64::new(0),
        })
    }

    /// Attach the transport used by [`MessageRouter::send`]. Called once at
    /// session wiring; later calls are ignored.
    pub fn bind(&self, connection: Arc<ConnectionManager>) {
        let _ = self.connection.set(connection);
    }

    /// Register a handler for every dispatched envelope. The returned
    /// [`Subscription`] removes exactly this registration when disposed or
    /// dropped.
    pub fn subscribe(self: &Arc<Self>, handler: Handler) -> Subscription {
        let mut registry = self.registry.lock().expect("router registry poisoned");
        registry.next_token += 1;
        let token = registry.next_token;
        registry.entries.push((token, handler));
        Subscription {
            router: Arc::downgrade(self),
            token: Some(token),
        }
    }

    /// Parse one inbound text frame and invoke every registered handler with
    /// it, synchronously, in registration order.
    ///
    /// Malformed input is dropped with a diagnostic; a failing handler is
    /// recorded and the remaining handlers still run. Never panics back into
    /// the transport.
    pub fn dispatch(&self, raw: &str) {
        let envelope: Envelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.malformed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    component = "router",
                    event = "dispatch.parse_failed",
                    error = %e,
                    payload_bytes = raw.len(),
                    payload_preview = %truncate_for_log(raw, 240),
                    "Dropping malformed inbound message"
                );
                return;
            }
        };

        debug!(
            component = "router",
            event = "dispatch.envelope",
            envelope = ?envelope,
            "Dispatching envelope"
        );

        let registry = self.registry.lock().expect("router registry poisoned");
        for (token, handler) in &registry.entries {
            if let Err(e) = handler(&envelope) {
                self.handler_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    component = "router",
                    event = "dispatch.handler_failed",
                    token = token,
                    error = %e,
                    "Subscriber failed while handling envelope"
                );
            }
        }
    }

    /// Serialize an envelope and hand it to the connection manager.
    pub fn send(&self, envelope: &Envelope) -> Result<(), SessionError> {
        let connection = self.connection.get().ok_or(SessionError::NotConnected)?;
        let text = serde_json::to_string(envelope)?;
        connection.send_text(text)
    }

    /// Count of inbound frames dropped as malformed.
    pub fn malformed_count(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    /// Count of handler invocations that returned an error.
    pub fn handler_failure_count(&self) -> u64 {
        self.handler_failures.load(Ordering::Relaxed)
    }

    fn unsubscribe(&self, token: u64) {
        let mut registry = self.registry.lock().expect("router registry poisoned");
        registry.entries.retain(|(t, _)| *t != token);
    }
}

/// Removes one registration when disposed; dropping it disposes too, so a
/// projection's registration cleans up with the projection.
pub struct Subscription {
    router: Weak<MessageRouter>,
    token: Option<u64>,
}

impl Subscription {
    /// Deregister. Calling this more than once is a no-op.
    pub fn dispose(&mut self) {
        if let Some(token) = self.token.take() {
            if let Some(router) = self.router.upgrade() {
                router.unsubscribe(token);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn truncate_for_log(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler(counter: Arc<AtomicUsize>) -> Handler {
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn dispatch_invokes_every_subscriber_once_per_envelope() {
        let router = MessageRouter::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let _sub_a = router.subscribe(counting_handler(a.clone()));
        let _sub_b = router.subscribe(counting_handler(b.clone()));

        for _ in 0..3 {
            router.dispatch(r#"{"type":"status","status":"idle","action":""}"#);
        }

        assert_eq!(a.load(Ordering::SeqCst), 3);
        assert_eq!(b.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn subscribers_run_in_registration_order() {
        let router = MessageRouter::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut subs = Vec::new();
        for label in ["first", "second", "third"] {
            let order = order.clone();
            subs.push(router.subscribe(Box::new(move |_| {
                order.lock().unwrap().push(label);
                Ok(())
            })));
        }

        router.dispatch(r#"{"type":"activeFiles","files":[]}"#);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn disposed_subscription_is_never_invoked() {
        let router = MessageRouter::new();
        let count = Arc::new(AtomicUsize::new(0));
        let mut sub = router.subscribe(counting_handler(count.clone()));

        sub.dispose();
        sub.dispose(); // second dispose is a no-op
        router.dispatch(r#"{"type":"activeFiles","files":[]}"#);

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let router = MessageRouter::new();
        let count = Arc::new(AtomicUsize::new(0));
        {
            let _sub = router.subscribe(counting_handler(count.clone()));
            router.dispatch(r#"{"type":"activeFiles","files":[]}"#);
        }
        router.dispatch(r#"{"type":"activeFiles","files":[]}"#);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn malformed_input_is_dropped_without_reaching_subscribers() {
        let router = MessageRouter::new();
        let count = Arc::new(AtomicUsize::new(0));
        let _sub = router.subscribe(counting_handler(count.clone()));

        router.dispatch("not json at all");
        router.dispatch(r#"{"type":"noSuchTag"}"#);
        router.dispatch(r#"{"content":"missing tag"}"#);

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(router.malformed_count(), 3);
    }

    #[test]
    fn failing_handler_does_not_stop_later_handlers() {
        let router = MessageRouter::new();
        let reached = Arc::new(AtomicUsize::new(0));
        let _failing = router.subscribe(Box::new(|_| anyhow::bail!("projection bug")));
        let _sub = router.subscribe(counting_handler(reached.clone()));

        router.dispatch(r#"{"type":"error","message":"boom"}"#);

        assert_eq!(reached.load(Ordering::SeqCst), 1);
        assert_eq!(router.handler_failure_count(), 1);
    }

    #[test]
    fn send_before_bind_fails_not_connected() {
        let router = MessageRouter::new();
        let result = router.send(&Envelope::RefreshFileTree);
        assert!(matches!(result, Err(SessionError::NotConnected)));
    }
}
