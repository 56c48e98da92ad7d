//! Endpoint paths, relative to the API base URL.

use super::types::{ConversationId, DocumentId};

pub const LOGIN: &str = "/auth/login";
pub const REGISTER: &str = "/auth/register";
pub const ME: &str = "/auth/me";
pub const REFRESH: &str = "/auth/refresh";
pub const CHANGE_PASSWORD: &str = "/auth/change_password";

pub const UPLOAD: &str = "/documents/upload";
pub const MY_FILES: &str = "/documents/my_files";

pub const CONVERSATIONS: &str = "/conversations/";

pub const ASK: &str = "/nlp/ask";

pub const USER_STATS: &str = "/analytics/user-stats";
pub const LATEST_CONVERSATION: &str = "/analytics/latest-conversation";
pub const RECOMMENDED_DOCUMENTS: &str = "/analytics/recommended-documents";

pub fn document(id: DocumentId) -> String {
    format!("/documents/{id}")
}

pub fn document_status(id: DocumentId) -> String {
    format!("/documents/{id}/status")
}

pub fn conversation(id: ConversationId) -> String {
    format!("/conversations/{id}")
}

pub fn conversation_messages(id: ConversationId) -> String {
    format!("/conversations/{id}/messages")
}

pub fn summary(id: DocumentId) -> String {
    format!("/nlp/summary/{id}")
}
