//! Broadcasting tracker events to subscribers.

use super::types::{DropReason, EventHandle, SubscriptionId, TrackerEvent};
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Fans events out to bounded subscriber channels.
pub struct EventBus {
    subscribers: RwLock<HashMap<SubscriptionId, Sender<TrackerEvent>>>,
    next_id: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe with room for `buffer_size` pending events.
    pub fn subscribe(&self, buffer_size: usize) -> EventHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        // One extra slot so the drop notice always fits.
        let (sender, receiver) = bounded(buffer_size.max(1) + 1);

        self.subscribers.write().insert(id, sender);

        EventHandle { id, receiver }
    }

    /// Unsubscribe and notify the subscriber.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(sender) = self.subscribers.write().remove(&id) {
            let _ = sender.try_send(TrackerEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Send `event` to every subscriber. Drops subscribers that are full
    /// or whose receiver is gone.
    pub fn broadcast(&self, event: TrackerEvent) {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscribers.read();
            for (id, sender) in subs.iter() {
                // Keep the last slot free for the drop notice.
                let full = sender
                    .capacity()
                    .is_some_and(|cap| sender.len() + 1 >= cap);
                if full {
                    to_remove.push((*id, true));
                    continue;
                }
                match sender.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => to_remove.push((*id, true)),
                    Err(TrySendError::Disconnected(_)) => to_remove.push((*id, false)),
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscribers.write();
            for (id, overflowed) in to_remove {
                if let Some(sender) = subs.remove(&id) {
                    debug!(subscription = id.0, overflowed, "Dropping subscriber");
                    if overflowed {
                        let _ = sender.try_send(TrackerEvent::Dropped {
                            reason: DropReason::BufferOverflow,
                        });
                    }
                }
            }
        }
    }
}
