use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Fan-out channel of one game, numbering every event it publishes.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
    sequence: AtomicU64,
}

impl SseHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Sequence number of the latest published event, `0` before the first one.
    pub fn last_event_id(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Stamp `data` with the next sequence number and send it to every subscriber.
    ///
    /// Numbers are consumed even when nobody listens.
    pub fn publish(&self, event: &'static str, data: String) -> u64 {
        let id = self.sequence.fetch_add(1, Ordering::AcqRel) + 1;
        let _ = self.sender.send(ServerEvent {
            id: Some(id),
            event,
            data,
        });
        id
    }
}
