//! Agent status projection

use std::sync::{Arc, Mutex};

use agentdeck_protocol::{Envelope, StatusRecord};

use crate::router::{MessageRouter, Subscription};

/// Single current value, overwritten on every `status` envelope. No history.
pub struct StatusProjection {
    inner: Arc<Mutex<StatusRecord>>,
    _subscription: Subscription,
}

impl StatusProjection {
    pub fn new(router: &Arc<MessageRouter>) -> Self {
        let inner = Arc::new(Mutex::new(StatusRecord::default()));

        let state = inner.clone();
        let subscription = router.subscribe(Box::new(move |envelope| {
            if let Envelope::Status { status, action } = envelope {
                *state.lock().expect("status poisoned") = StatusRecord {
                    status: *status,
                    action: action.clone(),
                };
            }
            Ok(())
        }));

        Self {
            inner,
            _subscription: subscription,
        }
    }

    pub fn current(&self) -> StatusRecord {
        self.inner.lock().expect("status poisoned").clone()
    }
}
