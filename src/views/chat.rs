//! Chat view: one open conversation and its transcript.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{broadcast, watch};

use crate::api::ApiClient;
use crate::api::types::{Answer, Conversation, ConversationId, Message, Role};
use crate::error::{ApiError, ErrorKind, Result};
use crate::events::{AppEvent, EventBus, EventName, Subscription};
use crate::feedback::Notice;

/// What the chat view shows. `conversation == None` is the "new chat" screen.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub conversation: Option<Conversation>,
    pub messages: Vec<Message>,
    /// A question is awaiting its answer.
    pub waiting: bool,
}

struct ChatInner {
    api: ApiClient,
    notices: Option<broadcast::Sender<Notice>>,
    state: watch::Sender<ChatState>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl ChatInner {
    fn notify(&self, notice: Notice) {
        if let Some(notices) = &self.notices {
            let _ = notices.send(notice);
        }
    }

    fn open_id(&self) -> Option<ConversationId> {
        self.state.borrow().conversation.as_ref().map(|c| c.id)
    }

    fn handle(&self, event: &AppEvent) {
        match event {
            AppEvent::ConversationDeleted { conversation_id }
                if self.open_id() == Some(*conversation_id) =>
            {
                self.state.send_replace(ChatState::default());
                self.notify(Notice::info("This conversation was deleted."));
            }
            AppEvent::DocumentDeleted { document_id } => {
                let affected = self
                    .state
                    .borrow()
                    .conversation
                    .as_ref()
                    .is_some_and(|c| c.document_id == *document_id);
                if affected {
                    self.state.send_replace(ChatState::default());
                    self.notify(Notice::info("The document for this chat was deleted."));
                }
            }
            AppEvent::TitleUpdated {
                conversation_id,
                new_title,
            } => {
                self.state.send_if_modified(|state| match &mut state.conversation {
                    Some(conv) if conv.id == *conversation_id => {
                        conv.title = Some(new_title.clone());
                        true
                    }
                    _ => false,
                });
            }
            _ => {}
        }
    }

    fn unmount(&self) {
        let subscriptions: Vec<Subscription> = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for subscription in subscriptions {
            subscription.unsubscribe();
        }
    }
}

impl Drop for ChatInner {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Headless chat screen.
#[derive(Clone)]
pub struct ChatView {
    inner: Arc<ChatInner>,
}

impl std::fmt::Debug for ChatView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatView")
            .field("conversation", &self.inner.open_id())
            .finish_non_exhaustive()
    }
}

impl ChatView {
    pub fn new(api: ApiClient, notices: Option<broadcast::Sender<Notice>>) -> Self {
        let (state, _) = watch::channel(ChatState::default());
        Self {
            inner: Arc::new(ChatInner {
                api,
                notices,
                state,
                subscriptions: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn state(&self) -> ChatState {
        self.inner.state.borrow().clone()
    }

    pub fn changed(&self) -> watch::Receiver<ChatState> {
        self.inner.state.subscribe()
    }

    /// Listen for deletions and renames affecting the open conversation.
    pub fn mount(&self, bus: &EventBus) {
        self.inner.unmount();
        let subscriptions = [
            EventName::ConversationDeleted,
            EventName::DocumentDeleted,
            EventName::TitleUpdated,
        ]
        .into_iter()
        .map(|event| {
            let weak: Weak<ChatInner> = Arc::downgrade(&self.inner);
            bus.subscribe(event, move |payload| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle(payload);
                }
            })
        })
        .collect();
        *self
            .inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = subscriptions;
    }

    pub fn unmount(&self) {
        self.inner.unmount();
    }

    /// Back to the "new chat" screen.
    pub fn reset(&self) {
        self.inner.state.send_replace(ChatState::default());
    }

    /// Load a conversation and its messages.
    ///
    /// A conversation that no longer exists sends the view back to "new chat"
    /// with a notice instead of failing.
    pub async fn open(&self, id: ConversationId) -> Result<()> {
        let conversations = self.inner.api.conversations();
        let loaded = futures::try_join!(conversations.get(id), conversations.messages(id));

        match loaded {
            Ok((conversation, messages)) => {
                self.inner.state.send_replace(ChatState {
                    conversation: Some(conversation),
                    messages,
                    waiting: false,
                });
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::info!(name: "chat.open.not_found", conversation_id = id);
                self.reset();
                self.inner
                    .notify(Notice::warning("Conversation not found. Starting a new chat."));
                Ok(())
            }
            Err(err) => {
                self.inner.notify(Notice::from_error("load conversation", &err));
                Err(err)
            }
        }
    }

    /// Ask about the open conversation's document.
    ///
    /// The question and the answer are both persisted to the conversation.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ApiError::InvalidInput("question is empty".to_string()));
        }
        let Some(conversation) = self.inner.state.borrow().conversation.clone() else {
            return Err(ApiError::InvalidInput(
                "open or start a conversation first".to_string(),
            ));
        };

        self.inner.state.send_modify(|s| s.waiting = true);
        let result = self.exchange(&conversation, question).await;
        self.inner.state.send_modify(|s| s.waiting = false);

        result.inspect_err(|err| self.inner.notify(Notice::from_error("send message", err)))
    }

    async fn exchange(&self, conversation: &Conversation, question: &str) -> Result<Answer> {
        let api = &self.inner.api;
        let id = conversation.id;

        let asked = api.conversations().add_message(id, Role::User, question).await?;
        self.push(id, asked);

        let answer = api
            .chat()
            .ask(question, conversation.document_id, Some(id))
            .await?;

        let replied = api
            .conversations()
            .add_message(id, Role::Assistant, &answer.answer)
            .await?;
        self.push(id, replied);

        Ok(answer)
    }

    /// Append unless the user switched conversations meanwhile.
    fn push(&self, id: ConversationId, message: Message) {
        self.inner.state.send_if_modified(|state| {
            if state.conversation.as_ref().is_some_and(|c| c.id == id) {
                state.messages.push(message);
                true
            } else {
                false
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::session::TokenStore;
    use crate::transport::{ApiRequest, ApiResponse, Transport};

    #[derive(Debug)]
    struct Offline;

    #[async_trait]
    impl Transport for Offline {
        async fn send(&self, _: &ApiRequest, _: Option<&str>) -> Result<ApiResponse> {
            Err(ApiError::Network("offline".into()))
        }
    }

    fn view_with(conversation_id: ConversationId, document_id: i64) -> ChatView {
        let view = ChatView::new(ApiClient::new(Arc::new(Offline), TokenStore::new()), None);
        view.inner.state.send_replace(ChatState {
            conversation: Some(Conversation {
                id: conversation_id,
                document_id,
                title: Some("Old".into()),
                user_id: None,
                created_at: None,
                messages: Vec::new(),
            }),
            messages: Vec::new(),
            waiting: false,
        });
        view
    }

    #[test]
    fn rename_of_open_conversation_updates_title() {
        let bus = EventBus::new();
        let view = view_with(4, 1);
        view.mount(&bus);

        bus.publish(&AppEvent::TitleUpdated {
            conversation_id: 5,
            new_title: "Other".into(),
        });
        bus.publish(&AppEvent::TitleUpdated {
            conversation_id: 4,
            new_title: "New".into(),
        });

        let state = view.state();
        assert_eq!(state.conversation.unwrap().title.as_deref(), Some("New"));
    }

    #[test]
    fn deleting_open_conversation_resets_view() {
        let bus = EventBus::new();
        let view = view_with(4, 1);
        view.mount(&bus);

        bus.publish(&AppEvent::ConversationDeleted { conversation_id: 9 });
        assert!(view.state().conversation.is_some());

        bus.publish(&AppEvent::ConversationDeleted { conversation_id: 4 });
        assert!(view.state().conversation.is_none());
    }

    #[test]
    fn deleting_the_document_resets_view() {
        let bus = EventBus::new();
        let view = view_with(4, 7);
        view.mount(&bus);

        bus.publish(&AppEvent::DocumentDeleted { document_id: 7 });
        assert!(view.state().conversation.is_none());
    }

    #[tokio::test]
    async fn ask_requires_open_conversation() {
        let view = ChatView::new(ApiClient::new(Arc::new(Offline), TokenStore::new()), None);
        assert!(matches!(
            view.ask("what is this?").await,
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn failed_open_emits_notice_and_keeps_state() {
        let (tx, mut rx) = broadcast::channel(4);
        let api = ApiClient::new(Arc::new(Offline), TokenStore::new());
        api.tokens().set_session("a", "r", Default::default());
        let view = ChatView::new(api, Some(tx));

        assert!(view.open(3).await.is_err());
        assert!(view.state().conversation.is_none());
        assert!(rx.recv().await.unwrap().retryable);
    }
}
