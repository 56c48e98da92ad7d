//! Question answering over a document.

use super::ApiClient;
use super::paths;
use super::types::{Answer, AskRequest, ConversationId, DocumentId};
use crate::error::Result;
use crate::transport::ApiRequest;

/// Chat API client.
#[derive(Debug)]
pub struct ChatApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl ChatApi<'_> {
    /// Ask a question about `document_id`, optionally within a conversation.
    pub async fn ask(
        &self,
        question: &str,
        document_id: DocumentId,
        conversation_id: Option<ConversationId>,
    ) -> Result<Answer> {
        let request = ApiRequest::post(paths::ASK).json(&AskRequest {
            question,
            file_id: document_id,
            conversation_id,
        })?;
        self.client.fetch(request).await
    }
}
