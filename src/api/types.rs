//! Wire types for the document-chat API.
//!
//! These mirror the backend's request and response bodies. Timestamps are
//! kept as the strings the server sends.

use serde::{Deserialize, Serialize};

/// Backend primary key of a document.
pub type DocumentId = i64;
/// Backend primary key of a conversation.
pub type ConversationId = i64;

// =============================================================================
// Auth
// =============================================================================

/// Credential pair returned by login and refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Profile returned by `/auth/me` and registration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub disabled: Option<bool>,
}

/// Registration payload.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChangePasswordRequest<'a> {
    pub old_password: &'a str,
    pub new_password: &'a str,
}

// =============================================================================
// Documents
// =============================================================================

/// A document as listed under "my files".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentBrief {
    pub id: DocumentId,
    pub filename: String,
}

/// Metadata returned by an upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedDocument {
    pub id: DocumentId,
    pub filename: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Ingestion status of a document.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentStatus {
    pub id: DocumentId,
    pub filename: String,
    #[serde(rename = "processingComplete")]
    pub processing_complete: bool,
    pub status: String,
}

impl DocumentStatus {
    /// Whether the backend gave up on this document.
    pub fn has_failed(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "failed" | "error"
        )
    }
}

// =============================================================================
// Conversations
// =============================================================================

/// Author of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A stored conversation message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// A conversation about one document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub document_id: DocumentId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Title to show, falling back to a generic label.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("Untitled conversation")
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateConversationRequest<'a> {
    pub document_id: DocumentId,
    pub title: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UpdateConversationRequest<'a> {
    pub title: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewMessageRequest<'a> {
    pub role: Role,
    pub content: &'a str,
}

// =============================================================================
// Chat
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AskRequest<'a> {
    pub question: &'a str,
    pub file_id: DocumentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
}

/// Chunk of the document an answer was grounded on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceInfo {
    pub chunk_id: i64,
    pub file_id: DocumentId,
    pub content_preview: String,
}

/// Answer to a question about a document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Answer {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<SourceInfo>,
    #[serde(default)]
    pub total_chunks_used: u32,
}

// =============================================================================
// Summaries
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SummaryMetrics {
    pub chunk_count: u32,
    pub processing_time_seconds: f64,
    pub cached: bool,
    #[serde(default)]
    pub generated_at: Option<String>,
}

/// Generated summary of a document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocumentSummary {
    pub document_id: DocumentId,
    pub document_title: String,
    pub summary: String,
    #[serde(default)]
    pub metrics: SummaryMetrics,
}

// =============================================================================
// Analytics
// =============================================================================

/// Per-document usage row on the statistics page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocumentUsage {
    #[serde(default)]
    pub document_id: Option<DocumentId>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, alias = "count")]
    pub conversation_count: u32,
}

/// Aggregate usage for the signed-in user.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserStatistics {
    pub documents_count: u32,
    pub conversations_count: u32,
    pub questions_count: u32,
    #[serde(default)]
    pub avg_response_time_ms: Option<f64>,
    #[serde(default)]
    pub most_active_day: Option<String>,
    #[serde(default)]
    pub document_usage: Vec<DocumentUsage>,
}
