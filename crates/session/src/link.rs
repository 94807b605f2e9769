//! Pure connection state machine
//!
//! All lifecycle and retry policy lives here as a pure, synchronous function:
//! `transition(state, event) -> (state, effects)`. No IO, no async, no
//! timers, so it is fully unit-testable. The connection manager interprets
//! the effects against real sockets and clocks.

use std::time::Duration;

/// Delay between reconnection attempts.
///
/// Retries are unbounded with a fixed delay: the client is long-lived and
/// backend restarts are expected to be brief. Swapping the policy (backoff,
/// jitter) means changing this module, not the transport code.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Where the link currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Open,
    /// Teardown requested; waiting for the socket to go away. No retry will
    /// ever be scheduled from here.
    Closing,
}

/// One lifecycle input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// `connect()` was called (initial or external).
    ConnectRequested,
    /// The socket handshake completed.
    Opened,
    /// The socket closed, for any reason including network failure.
    Closed,
    /// The connect attempt or the open socket reported an error.
    Errored,
    /// The retry timer fired.
    RetryElapsed,
    /// `teardown()` was called.
    TeardownRequested,
}

/// IO the interpreter must perform after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEffect {
    /// Start exactly one socket handshake.
    OpenSocket,
    /// Arm the single retry timer for `RETRY_DELAY`.
    ScheduleRetry,
    /// Disarm the retry timer if armed.
    CancelRetry,
    /// Close and release the socket if one exists.
    CloseSocket,
}

/// Pure, synchronous lifecycle transition.
///
/// Invariants encoded here: at most one live socket (only `OpenSocket` from a
/// non-connecting state opens one), at most one armed retry timer
/// (`ScheduleRetry` only fires on entry to `Disconnected`), and `Closing`
/// never schedules a retry.
pub fn transition(state: LinkState, event: LinkEvent) -> (LinkState, Vec<LinkEffect>) {
    use LinkEffect::*;
    use LinkEvent::*;
    use LinkState::*;

    match (state, event) {
        (Disconnected, ConnectRequested) | (Disconnected, RetryElapsed) => {
            (Connecting, vec![CancelRetry, OpenSocket])
        }
        // connect() while already underway or open is a no-op
        (Connecting, ConnectRequested) | (Open, ConnectRequested) => (state, vec![]),

        (Connecting, Opened) => (Open, vec![]),

        // A failed handshake and a dropped connection recover the same way.
        (Connecting, Closed) | (Connecting, Errored) | (Open, Closed) | (Open, Errored) => {
            (Disconnected, vec![ScheduleRetry])
        }

        (_, TeardownRequested) => (Closing, vec![CancelRetry, CloseSocket]),

        (Closing, Closed) => (Disconnected, vec![]),

        // Inert leftovers: a timer that fired after cancellation, duplicate
        // close notifications, events after teardown.
        _ => (state, vec![]),
    }
}
