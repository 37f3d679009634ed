//! Auth event fan-out.
//!
//! Uses tokio::sync::broadcast so the session resolver and any embedding
//! application each get every sign-in, sign-out and refresh.

use tokio::sync::broadcast;

use crate::models::AuthEvent;

/// Default capacity for the broadcast channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 16;

#[derive(Clone)]
pub struct AuthEventBroadcaster {
    sender: broadcast::Sender<AuthEvent>,
}

impl AuthEventBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receiver for all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    /// Broadcast an event. Returns the number of receivers; 0 when nobody
    /// is listening.
    pub fn send(&self, event: AuthEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for AuthEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
