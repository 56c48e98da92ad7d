//! Concrete panel sources.

use async_trait::async_trait;

use super::panel::{PanelSource, ResourcePanel};
use crate::api::ApiClient;
use crate::api::types::{Conversation, DocumentBrief, UserStatistics};
use crate::error::Result;
use crate::events::EventName;

/// Conversation list in the sidebar.
#[derive(Debug, Default)]
pub struct ConversationsSource;

#[async_trait]
impl PanelSource for ConversationsSource {
    type Item = Vec<Conversation>;
    const NAME: &'static str = "conversations";

    fn triggers(&self) -> &'static [EventName] {
        // Deleting a document removes its conversations server side.
        &[
            EventName::ConversationDeleted,
            EventName::DocumentDeleted,
            EventName::TitleUpdated,
            EventName::DataRefreshNeeded,
        ]
    }

    async fn load(&self, api: &ApiClient) -> Result<Self::Item> {
        api.conversations().list().await
    }
}

/// "My documents" list.
#[derive(Debug, Default)]
pub struct DocumentsSource;

#[async_trait]
impl PanelSource for DocumentsSource {
    type Item = Vec<DocumentBrief>;
    const NAME: &'static str = "documents";

    fn triggers(&self) -> &'static [EventName] {
        &[EventName::DocumentDeleted, EventName::DataRefreshNeeded]
    }

    async fn load(&self, api: &ApiClient) -> Result<Self::Item> {
        api.documents().list_mine().await
    }
}

/// Everything the statistics page shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub user: UserStatistics,
    pub latest_conversation: Option<Conversation>,
    pub recommended: Vec<DocumentBrief>,
}

/// Statistics page.
#[derive(Debug, Default)]
pub struct StatisticsSource;

#[async_trait]
impl PanelSource for StatisticsSource {
    type Item = Statistics;
    const NAME: &'static str = "statistics";

    fn triggers(&self) -> &'static [EventName] {
        // The latest-conversation card shows a title.
        &[
            EventName::DocumentDeleted,
            EventName::ConversationDeleted,
            EventName::TitleUpdated,
            EventName::DataRefreshNeeded,
        ]
    }

    async fn load(&self, api: &ApiClient) -> Result<Self::Item> {
        let stats = api.stats();
        let (user, latest_conversation, recommended) = futures::try_join!(
            stats.user_stats(),
            stats.latest_conversation(),
            stats.recommended_documents(),
        )?;
        Ok(Statistics {
            user,
            latest_conversation,
            recommended,
        })
    }
}

pub type ConversationsPanel = ResourcePanel<ConversationsSource>;
pub type DocumentsPanel = ResourcePanel<DocumentsSource>;
pub type StatisticsPanel = ResourcePanel<StatisticsSource>;
