//! The closed set of domain events panels exchange.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::types::{ConversationId, DocumentId, DocumentSummary};

/// Subscription key: the payload-free discriminant of [`AppEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventName {
    DocumentDeleted,
    ConversationDeleted,
    DataRefreshNeeded,
    TitleUpdated,
    SummaryRequest,
    SummarySuccess,
    SummaryError,
}

impl EventName {
    /// Every member of the taxonomy.
    pub const ALL: [EventName; 7] = [
        EventName::DocumentDeleted,
        EventName::ConversationDeleted,
        EventName::DataRefreshNeeded,
        EventName::TitleUpdated,
        EventName::SummaryRequest,
        EventName::SummarySuccess,
        EventName::SummaryError,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DocumentDeleted => "DOCUMENT_DELETED",
            Self::ConversationDeleted => "CONVERSATION_DELETED",
            Self::DataRefreshNeeded => "DATA_REFRESH_NEEDED",
            Self::TitleUpdated => "TITLE_UPDATED",
            Self::SummaryRequest => "SUMMARY_REQUEST",
            Self::SummarySuccess => "SUMMARY_SUCCESS",
            Self::SummaryError => "SUMMARY_ERROR",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A domain event together with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A document (and, server side, its conversations) was removed.
    DocumentDeleted { document_id: DocumentId },
    /// A conversation was removed.
    ConversationDeleted { conversation_id: ConversationId },
    /// Something changed that has no finer-grained event; refetch everything.
    DataRefreshNeeded,
    /// A conversation was renamed.
    TitleUpdated {
        conversation_id: ConversationId,
        new_title: String,
    },
    /// A view asked for a document summary.
    SummaryRequest { document_id: DocumentId },
    /// A summary finished.
    SummarySuccess(DocumentSummary),
    /// A summary request failed.
    SummaryError {
        document_id: DocumentId,
        message: String,
    },
}

impl AppEvent {
    pub fn name(&self) -> EventName {
        match self {
            Self::DocumentDeleted { .. } => EventName::DocumentDeleted,
            Self::ConversationDeleted { .. } => EventName::ConversationDeleted,
            Self::DataRefreshNeeded => EventName::DataRefreshNeeded,
            Self::TitleUpdated { .. } => EventName::TitleUpdated,
            Self::SummaryRequest { .. } => EventName::SummaryRequest,
            Self::SummarySuccess(_) => EventName::SummarySuccess,
            Self::SummaryError { .. } => EventName::SummaryError,
        }
    }

    /// Document the event refers to, if any.
    pub fn document_id(&self) -> Option<DocumentId> {
        match self {
            Self::DocumentDeleted { document_id }
            | Self::SummaryRequest { document_id }
            | Self::SummaryError { document_id, .. } => Some(*document_id),
            Self::SummarySuccess(summary) => Some(summary.document_id),
            _ => None,
        }
    }

    /// Conversation the event refers to, if any.
    pub fn conversation_id(&self) -> Option<ConversationId> {
        match self {
            Self::ConversationDeleted { conversation_id }
            | Self::TitleUpdated {
                conversation_id, ..
            } => Some(*conversation_id),
            _ => None,
        }
    }
}
