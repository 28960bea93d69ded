//! In-process notifications of tracker activity.
//!
//! A refresh publishes the products that changed, mirroring the "data
//! scraped" message a dashboard popup listens for. Subscribers get a
//! bounded channel; a subscriber that falls behind is dropped rather than
//! blocking the tracker.
//!
//! # Example
//!
//! ```ignore
//! // Buffer size comes from `TrackerConfig::event_buffer`.
//! let handle = tracker.subscribe();
//!
//! while let Ok(event) = handle.recv() {
//!     match event {
//!         TrackerEvent::Scraped { changed, .. } => println!("{} changed", changed.len()),
//!         TrackerEvent::Dropped { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

mod bus;
mod types;

pub use bus::EventBus;
pub use types::{DropReason, EventHandle, SubscriptionId, TrackerEvent};
