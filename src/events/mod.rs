use crate::models::{NotificationKind, Priority};
use futures::Stream;
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

/// Discrete state transitions of the notification feed
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    NotificationReceived {
        id: String,
        kind: NotificationKind,
        priority: Priority,
    },
    NotificationRead {
        id: String,
    },
    AllRead {
        count: usize,
    },
    NotificationRemoved {
        id: String,
    },
    Refreshed {
        generation: u64,
        count: usize,
        has_more: bool,
    },
    RefreshDiscarded {
        generation: u64,
    },
    PageLoaded {
        inserted: usize,
        has_more: bool,
    },
    FriendRequestResolved {
        id: String,
        accepted: bool,
    },
    SessionCleared,
}

/// Event bus for publishing and subscribing to sync events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    /// Create a new event bus with specified capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all subscribers (non-blocking, fire-and-forget)
    pub(crate) fn publish(&self, event: SyncEvent) {
        // No subscribers is the normal case for a headless client
        if self.tx.send(event).is_err() {
            tracing::trace!("Sync event dropped, no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Subscribe as a stream. Lagged receivers skip the missed events.
    pub fn stream(&self) -> impl Stream<Item = SyncEvent> + Send + 'static {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|item| match item {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!("Sync event subscriber lagging: {}", e);
                None
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
