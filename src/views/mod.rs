//! Headless view models.
//!
//! Each view owns its state behind a `watch` channel and keeps itself fresh by
//! subscribing to the [`EventBus`](crate::events::EventBus): a mutation made by
//! one view is published as an [`AppEvent`](crate::events::AppEvent) and every
//! interested view re-fetches its own data. Nothing here caches server state
//! across views.

mod chat;
mod panel;
mod sources;
mod summary;

pub use chat::{ChatState, ChatView};
pub use panel::{PanelSource, PanelState, ResourcePanel};
pub use sources::{
    ConversationsPanel, ConversationsSource, DocumentsPanel, DocumentsSource, Statistics,
    StatisticsPanel, StatisticsSource,
};
pub use summary::SummaryHandler;
