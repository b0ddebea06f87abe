//! Authorization event fan-out
//!
//! The gateway publishes `AuthEvent`s; the chat host subscribes to send a
//! confirmation back to the room a login started from, or to re-dispatch a
//! forwarded command once it is approved.
//!
//! ```ignore
//! let bus = EventBus::new();
//! let mut events = bus.subscribe();
//! bus.sender().emit(AuthEvent::LoggedOut { identity: "a@x.com".into() });
//! while let Some(event) = events.recv().await { ... }
//! ```

use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

use crate::AuthEvent;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast channel of `AuthEvent`s. Subscribers only see events emitted
/// after they subscribed.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AuthEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn sender(&self) -> EventSender {
        EventSender { tx: self.tx.clone() }
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Publishing handle held by the handshake and middleware
#[derive(Clone)]
pub struct EventSender {
    tx: broadcast::Sender<AuthEvent>,
}

impl EventSender {
    /// Publish `event`; returns how many subscribers got it. Having no
    /// subscribers is not an error.
    pub fn emit(&self, event: AuthEvent) -> usize {
        let kind = event.type_name();
        let delivered = self.tx.send(event).unwrap_or(0);
        debug!(event_type = kind, delivered, "[EventBus] Emitted");
        delivered
    }

    pub fn has_subscribers(&self) -> bool {
        self.tx.receiver_count() > 0
    }
}

/// Subscription held by the host
pub struct EventReceiver {
    rx: broadcast::Receiver<AuthEvent>,
}

impl EventReceiver {
    /// Next event, or `None` once every sender is gone. Events dropped
    /// because this subscriber fell behind are logged and skipped.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "[EventBus] Subscriber fell behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(missed, "[EventBus] Subscriber fell behind");
                }
                Err(_) => return None,
            }
        }
    }
}

pub type SharedEventBus = Arc<EventBus>;

pub fn create_shared_event_bus() -> SharedEventBus {
    Arc::new(EventBus::new())
}
