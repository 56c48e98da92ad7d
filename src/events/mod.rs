//! In-process publish/subscribe for cross-panel coordination.
//!
//! A mutating action (delete a document, rename a conversation, ...) publishes
//! an [`AppEvent`] after the API call succeeds; every panel that shows data
//! affected by it subscribes to the matching [`EventName`] and re-fetches.
//!
//! # Example
//!
//! ```rust
//! use docchat_client::events::{AppEvent, EventBus, EventName};
//! use std::sync::{Arc, Mutex};
//!
//! let bus = EventBus::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&seen);
//! let sub = bus.subscribe(EventName::DocumentDeleted, move |event| {
//!     sink.lock().unwrap().push(event.clone());
//! });
//!
//! bus.publish(&AppEvent::DocumentDeleted { document_id: 1 });
//! sub.unsubscribe();
//! bus.publish(&AppEvent::DocumentDeleted { document_id: 2 });
//!
//! assert_eq!(*seen.lock().unwrap(), vec![AppEvent::DocumentDeleted { document_id: 1 }]);
//! ```

mod bus;
mod taxonomy;

pub use bus::{EventBus, Subscription, SubscriptionId};
pub use taxonomy::{AppEvent, EventName};
