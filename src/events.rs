//! Update notifications
//!
//! One [`UpdateEvent`] is published per committed write batch to every live
//! subscriber. Subscribers whose receiver has been dropped are pruned on the
//! next publish.

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

/// Published after a write batch commits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateEvent {
    /// The block number the batch committed under
    pub block_number: u64,
}

/// Fan-out of update events over unbounded channels
#[derive(Default)]
pub struct Notifier {
    subscribers: Mutex<Vec<Sender<UpdateEvent>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> Receiver<UpdateEvent> {
        let (tx, rx) = channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber
    pub fn publish(&self, event: UpdateEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event).is_ok());
        tracing::trace!(
            block_number = event.block_number,
            subscribers = subscribers.len(),
            "Update published"
        );
    }

    /// Number of registered subscribers (including ones not yet pruned)
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
