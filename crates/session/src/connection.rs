//! Connection manager
//!
//! Owns the single socket and the retry timer. A spawned task drives the pure
//! state machine in [`crate::link`] against the real transport: `OpenSocket`
//! becomes a `connect_async` handshake, `ScheduleRetry` an armed sleep, and
//! `CloseSocket` dropping the split halves. Inbound text frames are handed to
//! the injected `on_message` callback in exact arrival order.

use std::pin::pin;
use std::sync::{Arc, Mutex};

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::link::{self, LinkEvent, LinkState, RETRY_DELAY};

/// Callback invoked with every inbound text frame, in arrival order.
pub type OnMessage = Arc<dyn Fn(&str) + Send + Sync>;

enum Command {
    Connect,
    Teardown,
}

struct Shared {
    /// Mirror of the driver task's state, readable by callers.
    state: Mutex<LinkState>,
    /// Write path into the live socket. `Some` exactly while the link is open.
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
}

impl Shared {
    fn set_state(&self, state: LinkState) {
        *self.state.lock().expect("link state mutex poisoned") = state;
    }

    fn clear_outbound(&self) {
        self.outbound
            .lock()
            .expect("outbound mutex poisoned")
            .take();
    }
}

/// Owns the socket lifecycle for one session.
///
/// There is exactly one instance per session (spawned once, shared by
/// reference), never one per view.
pub struct ConnectionManager {
    shared: Arc<Shared>,
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl ConnectionManager {
    /// Spawn the driver task and begin connecting to `ws_url` immediately.
    pub fn spawn(ws_url: url::Url, on_message: OnMessage) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(LinkState::Disconnected),
            outbound: Mutex::new(None),
        });
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        tokio::spawn(run(shared.clone(), ws_url, on_message, cmd_rx));

        Self { shared, cmd_tx }
    }

    /// Observed link state.
    pub fn state(&self) -> LinkState {
        *self.shared.state.lock().expect("link state mutex poisoned")
    }

    /// Request a connect. No-op while already connecting or open; while
    /// waiting out a retry delay this skips the remainder of the wait.
    pub fn connect(&self) {
        let _ = self.cmd_tx.send(Command::Connect);
    }

    /// Write one already-framed text message to the socket.
    ///
    /// Fails with [`SessionError::NotConnected`] unless the link is open; no
    /// transport write happens on failure and nothing is queued for later.
    pub fn send_text(&self, text: String) -> Result<(), SessionError> {
        if self.state() != LinkState::Open {
            return Err(SessionError::NotConnected);
        }
        let guard = self.shared.outbound.lock().expect("outbound mutex poisoned");
        match guard.as_ref() {
            Some(tx) => tx
                .send(Message::Text(text.into()))
                .map_err(|_| SessionError::NotConnected),
            None => Err(SessionError::NotConnected),
        }
    }

    /// Cancel any pending retry and close the socket. Idempotent; the manager
    /// is inert afterwards and will never reconnect.
    pub fn teardown(&self) {
        let _ = self.cmd_tx.send(Command::Teardown);
    }
}

/// Apply one event to the state machine and publish the new state.
fn step(shared: &Shared, state: LinkState, event: LinkEvent) -> LinkState {
    let (next, effects) = link::transition(state, event);
    if next != state {
        debug!(
            component = "connection",
            event = "link.transition",
            from = ?state,
            to = ?next,
            input = ?event,
            effects = ?effects,
            "Link state changed"
        );
    }
    shared.set_state(next);
    next
}

/// Run teardown to completion: the socket (if any) was already released by
/// the caller's scope, so `Closed` follows immediately.
fn finish_teardown(shared: &Shared, state: LinkState) {
    let state = step(shared, state, LinkEvent::TeardownRequested);
    shared.clear_outbound();
    step(shared, state, LinkEvent::Closed);
    info!(
        component = "connection",
        event = "link.teardown",
        "Connection manager torn down"
    );
}

async fn run(
    shared: Arc<Shared>,
    ws_url: url::Url,
    on_message: OnMessage,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
) {
    let mut state = step(&shared, LinkState::Disconnected, LinkEvent::ConnectRequested);

    loop {
        match state {
            LinkState::Connecting => {
                let mut connect = pin!(connect_async(ws_url.as_str()));
                state = loop {
                    tokio::select! {
                        res = &mut connect => match res {
                            Ok((socket, _response)) => {
                                info!(
                                    component = "connection",
                                    event = "ws.connection.opened",
                                    url = %ws_url,
                                    "WebSocket connection opened"
                                );
                                let next = step(&shared, state, LinkEvent::Opened);
                                break pump(&shared, next, socket, &on_message, &mut cmd_rx).await;
                            }
                            Err(e) => {
                                warn!(
                                    component = "connection",
                                    event = "ws.connect.failed",
                                    url = %ws_url,
                                    error = %e,
                                    "WebSocket handshake failed"
                                );
                                break step(&shared, state, LinkEvent::Errored);
                            }
                        },
                        cmd = cmd_rx.recv() => match cmd {
                            Some(Command::Connect) => {
                                state = step(&shared, state, LinkEvent::ConnectRequested);
                            }
                            Some(Command::Teardown) | None => {
                                return finish_teardown(&shared, state);
                            }
                        },
                    }
                };
            }

            LinkState::Disconnected => {
                // Retry phase: the armed timer is this sleep.
                let mut retry = pin!(tokio::time::sleep(RETRY_DELAY));
                state = loop {
                    tokio::select! {
                        _ = &mut retry => {
                            info!(
                                component = "connection",
                                event = "ws.retry.elapsed",
                                delay_secs = RETRY_DELAY.as_secs(),
                                "Reconnecting after retry delay"
                            );
                            break step(&shared, state, LinkEvent::RetryElapsed);
                        }
                        cmd = cmd_rx.recv() => match cmd {
                            Some(Command::Connect) => {
                                break step(&shared, state, LinkEvent::ConnectRequested);
                            }
                            Some(Command::Teardown) | None => {
                                return finish_teardown(&shared, state);
                            }
                        },
                    }
                };
            }

            // `pump` and `finish_teardown` own these transitions; reaching
            // here means the driver is done.
            LinkState::Open | LinkState::Closing => return,
        }
    }
}

/// Service one open socket until it closes or teardown is requested.
/// Returns the post-close state (retry already scheduled by the machine).
async fn pump(
    shared: &Shared,
    state: LinkState,
    socket: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    on_message: &OnMessage,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
) -> LinkState {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
    *shared.outbound.lock().expect("outbound mutex poisoned") = Some(outbound_tx);

    let mut state = state;
    loop {
        tokio::select! {
            inbound = ws_rx.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    on_message(text.as_str());
                }
                Some(Ok(Message::Ping(data))) => {
                    if ws_tx.send(Message::Pong(data)).await.is_err() {
                        shared.clear_outbound();
                        break step(shared, state, LinkEvent::Errored);
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(
                        component = "connection",
                        event = "ws.connection.close_frame",
                        frame = ?frame,
                        "Server sent close frame"
                    );
                    shared.clear_outbound();
                    break step(shared, state, LinkEvent::Closed);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(
                        component = "connection",
                        event = "ws.connection.error",
                        error = %e,
                        "WebSocket error"
                    );
                    shared.clear_outbound();
                    break step(shared, state, LinkEvent::Errored);
                }
                None => {
                    info!(
                        component = "connection",
                        event = "ws.connection.closed",
                        "WebSocket connection closed"
                    );
                    shared.clear_outbound();
                    break step(shared, state, LinkEvent::Closed);
                }
            },

            Some(out) = outbound_rx.recv() => {
                if let Err(e) = ws_tx.send(out).await {
                    warn!(
                        component = "connection",
                        event = "ws.send.failed",
                        error = %e,
                        "WebSocket send failed"
                    );
                    shared.clear_outbound();
                    break step(shared, state, LinkEvent::Errored);
                }
            }

            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Connect) => {
                    state = step(shared, state, LinkEvent::ConnectRequested);
                }
                Some(Command::Teardown) | None => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    finish_teardown(shared, state);
                    return LinkState::Closing;
                }
            },
        }
    }
}
