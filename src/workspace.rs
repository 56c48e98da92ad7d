//! Application context: the one bus, token store and API client every view
//! shares, plus the mutating actions that keep those views consistent.

use std::path::Path;

use tokio::sync::broadcast;

use crate::api::ApiClient;
use crate::api::types::{Conversation, ConversationId, DocumentId, DocumentStatus, NewUser, User};
use crate::config::AppConfig;
use crate::error::{ApiError, Result};
use crate::events::{AppEvent, EventBus};
use crate::feedback::Notice;
use crate::session::{Profile, TokenStore};
use crate::transport::ProgressFn;
use crate::views::{
    ChatView, ConversationsPanel, ConversationsSource, DocumentsPanel, DocumentsSource,
    StatisticsPanel, StatisticsSource, SummaryHandler,
};

const NOTICE_CAPACITY: usize = 64;

/// Everything a front end needs, constructed once and passed around.
///
/// Actions follow one rule: call the API, publish the matching event only on
/// success, and on failure emit a [`Notice`] and return the error without
/// publishing anything.
#[derive(Debug, Clone)]
pub struct Workspace {
    config: AppConfig,
    bus: EventBus,
    api: ApiClient,
    notices: broadcast::Sender<Notice>,
}

impl Workspace {
    /// HTTP-backed workspace.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let api = ApiClient::from_config(&config, TokenStore::new())?;
        Ok(Self::with_client(config, api))
    }

    /// Workspace over an existing client (tests, custom transports).
    pub fn with_client(config: AppConfig, api: ApiClient) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            config,
            bus: EventBus::new(),
            api,
            notices,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn tokens(&self) -> &TokenStore {
        self.api.tokens()
    }

    /// Stream of user-facing notices. Slow receivers may miss old ones.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    fn notify(&self, notice: Notice) {
        // No receivers is fine.
        let _ = self.notices.send(notice);
    }

    fn report<T>(&self, action: &str, result: Result<T>) -> Result<T> {
        result.inspect_err(|err| {
            tracing::warn!(name: "workspace.action.failed", action, error = %err);
            self.notify(Notice::from_error(action, err));
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn login(&self, username: &str, password: &str) -> Result<Profile> {
        let result = self.api.auth().login(username, password).await;
        let profile = self.report("log in", result)?;
        self.notify(Notice::success(format!(
            "Welcome, {}!",
            if profile.full_name.is_empty() {
                username
            } else {
                profile.full_name.as_str()
            }
        )));
        Ok(profile)
    }

    pub async fn register(&self, user: &NewUser) -> Result<User> {
        let result = self.api.auth().register(user).await;
        let created = self.report("register", result)?;
        self.notify(Notice::success("Account created. You can log in now."));
        Ok(created)
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<()> {
        let result = self
            .api
            .auth()
            .change_password(old_password, new_password)
            .await;
        self.report("change password", result)?;
        self.notify(Notice::success("Password changed."));
        Ok(())
    }

    pub fn logout(&self) {
        self.api.auth().logout();
        self.notify(Notice::info("Logged out."));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Upload, wait for ingestion, then ask every view to refresh.
    pub async fn upload_document(
        &self,
        path: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<DocumentStatus> {
        let documents = self.api.documents();
        let result = async {
            let uploaded = documents.upload_path(path, progress).await?;
            documents.wait_until_processed(uploaded.id).await
        }
        .await;
        let status = self.report("upload document", result)?;

        self.bus.publish(&AppEvent::DataRefreshNeeded);
        self.notify(Notice::success(format!("{} is ready.", status.filename)));
        Ok(status)
    }

    pub async fn delete_document(&self, document_id: DocumentId) -> Result<()> {
        let result = self.api.documents().delete(document_id).await;
        self.report("delete document", result)?;
        self.bus.publish(&AppEvent::DocumentDeleted { document_id });
        self.notify(Notice::success("Document deleted."));
        Ok(())
    }

    /// Create a conversation about `document_id`.
    pub async fn start_conversation(
        &self,
        document_id: DocumentId,
        title: Option<&str>,
    ) -> Result<Conversation> {
        let result = self.api.conversations().create(document_id, title).await;
        let conversation = self.report("start conversation", result)?;
        self.bus.publish(&AppEvent::DataRefreshNeeded);
        Ok(conversation)
    }

    pub async fn delete_conversation(&self, conversation_id: ConversationId) -> Result<()> {
        let result = self.api.conversations().delete(conversation_id).await;
        self.report("delete conversation", result)?;
        self.bus
            .publish(&AppEvent::ConversationDeleted { conversation_id });
        self.notify(Notice::success("Conversation deleted."));
        Ok(())
    }

    /// Rename a conversation. Blank titles are rejected without a request.
    pub async fn rename_conversation(
        &self,
        conversation_id: ConversationId,
        title: &str,
    ) -> Result<Conversation> {
        let title = title.trim();
        let result = if title.is_empty() {
            Err(ApiError::InvalidInput("title cannot be empty".to_string()))
        } else {
            self.api.conversations().rename(conversation_id, title).await
        };
        let conversation = self.report("rename conversation", result)?;

        self.bus.publish(&AppEvent::TitleUpdated {
            conversation_id,
            new_title: conversation
                .title
                .clone()
                .unwrap_or_else(|| title.to_string()),
        });
        Ok(conversation)
    }

    /// Ask the running [`SummaryHandler`] for a summary.
    ///
    /// Returns whether anyone was listening.
    pub fn request_summary(&self, document_id: DocumentId) -> bool {
        self.bus.publish(&AppEvent::SummaryRequest { document_id }) > 0
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Views
    // ─────────────────────────────────────────────────────────────────────────

    /// Sidebar conversation list, mounted on this workspace's bus.
    pub fn conversations_panel(&self) -> ConversationsPanel {
        let panel =
            ConversationsPanel::with_notices(ConversationsSource, self.api.clone(), self.notices.clone());
        panel.mount(&self.bus);
        panel
    }

    pub fn documents_panel(&self) -> DocumentsPanel {
        let panel =
            DocumentsPanel::with_notices(DocumentsSource, self.api.clone(), self.notices.clone());
        panel.mount(&self.bus);
        panel
    }

    pub fn statistics_panel(&self) -> StatisticsPanel {
        let panel =
            StatisticsPanel::with_notices(StatisticsSource, self.api.clone(), self.notices.clone());
        panel.mount(&self.bus);
        panel
    }

    pub fn chat_view(&self) -> ChatView {
        let view = ChatView::new(self.api.clone(), Some(self.notices.clone()));
        view.mount(&self.bus);
        view
    }

    /// Started summary handler; it stays registered until stopped.
    pub fn summary_handler(&self) -> SummaryHandler {
        let handler =
            SummaryHandler::new(self.api.clone(), self.bus.clone(), Some(self.notices.clone()));
        handler.start();
        handler
    }
}
