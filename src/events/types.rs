//! Event types for tracker notifications.

use crate::types::{ProductRecord, Timestamp};
use serde::{Deserialize, Serialize};

/// Events published by the tracker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackerEvent {
    /// A scrape was reconciled and stored.
    Scraped {
        last_scraped: Timestamp,
        /// Products with a non-zero difference; new products count their full total.
        changed: Vec<ProductRecord>,
        has_changes: bool,
    },

    /// Changed products were appended to the spreadsheet.
    Exported { rows: usize },

    /// The stored snapshot was removed.
    Cleared,

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Receiving end of a subscription.
pub struct EventHandle {
    pub id: SubscriptionId,
    pub receiver: crossbeam_channel::Receiver<TrackerEvent>,
}

impl EventHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<TrackerEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<TrackerEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<TrackerEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently buffered.
    pub fn drain(&self) -> Vec<TrackerEvent> {
        self.receiver.try_iter().collect()
    }
}
