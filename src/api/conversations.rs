//! Conversations resource.

use super::ApiClient;
use super::paths;
use super::types::{
    Conversation, ConversationId, CreateConversationRequest, DocumentId, Message,
    NewMessageRequest, Role, UpdateConversationRequest,
};
use crate::error::Result;
use crate::transport::ApiRequest;

/// Conversations API client.
#[derive(Debug)]
pub struct ConversationsApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl ConversationsApi<'_> {
    pub async fn create(&self, document_id: DocumentId, title: Option<&str>) -> Result<Conversation> {
        let request = ApiRequest::post(paths::CONVERSATIONS).json(&CreateConversationRequest {
            document_id,
            title,
        })?;
        self.client.fetch(request).await
    }

    pub async fn list(&self) -> Result<Vec<Conversation>> {
        self.client.fetch(ApiRequest::get(paths::CONVERSATIONS)).await
    }

    pub async fn get(&self, id: ConversationId) -> Result<Conversation> {
        self.client.fetch(ApiRequest::get(paths::conversation(id))).await
    }

    pub async fn messages(&self, id: ConversationId) -> Result<Vec<Message>> {
        self.client
            .fetch(ApiRequest::get(paths::conversation_messages(id)))
            .await
    }

    pub async fn add_message(
        &self,
        id: ConversationId,
        role: Role,
        content: &str,
    ) -> Result<Message> {
        let request = ApiRequest::post(paths::conversation_messages(id))
            .json(&NewMessageRequest { role, content })?;
        self.client.fetch(request).await
    }

    pub async fn delete(&self, id: ConversationId) -> Result<()> {
        self.client
            .send(ApiRequest::delete(paths::conversation(id)))
            .await?;
        Ok(())
    }

    /// Change a conversation's title.
    pub async fn rename(&self, id: ConversationId, title: &str) -> Result<Conversation> {
        let request = ApiRequest::patch(paths::conversation(id))
            .json(&UpdateConversationRequest { title })?;
        self.client.fetch(request).await
    }
}
