//! Usage analytics.

use super::ApiClient;
use super::paths;
use super::types::{Conversation, DocumentBrief, UserStatistics};
use crate::error::Result;
use crate::transport::ApiRequest;

/// Analytics API client.
#[derive(Debug)]
pub struct StatsApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl StatsApi<'_> {
    pub async fn user_stats(&self) -> Result<UserStatistics> {
        self.client.fetch(ApiRequest::get(paths::USER_STATS)).await
    }

    /// Most recently active conversation; `None` for a new account.
    pub async fn latest_conversation(&self) -> Result<Option<Conversation>> {
        self.client
            .fetch(ApiRequest::get(paths::LATEST_CONVERSATION))
            .await
    }

    pub async fn recommended_documents(&self) -> Result<Vec<DocumentBrief>> {
        self.client
            .fetch(ApiRequest::get(paths::RECOMMENDED_DOCUMENTS))
            .await
    }
}
