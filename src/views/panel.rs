//! Generic list/detail panel that reloads on bus events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

use crate::api::ApiClient;
use crate::error::Result;
use crate::events::{AppEvent, EventBus, EventName, Subscription};
use crate::feedback::Notice;

/// What a panel shows and when it must be refetched.
#[async_trait]
pub trait PanelSource: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    /// Label used in logs and notices.
    const NAME: &'static str;

    /// Events after which the panel's data is stale.
    fn triggers(&self) -> &'static [EventName];

    /// Narrow a trigger further; all triggers reload by default.
    fn should_reload(&self, _event: &AppEvent) -> bool {
        true
    }

    async fn load(&self, api: &ApiClient) -> Result<Self::Item>;
}

/// Observable state of a [`ResourcePanel`].
#[derive(Debug, Clone)]
pub struct PanelState<T> {
    /// Last successfully loaded data; kept when a later load fails.
    pub data: Option<T>,
    pub loading: bool,
    /// Feedback from the most recent failed load, cleared on success.
    pub notice: Option<Notice>,
    /// Completed loads, successful or not.
    pub loads: u64,
    /// Event that caused the most recent reload, if any.
    pub last_trigger: Option<AppEvent>,
}

impl<T> Default for PanelState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            notice: None,
            loads: 0,
            last_trigger: None,
        }
    }
}

struct PanelInner<S: PanelSource> {
    source: S,
    api: ApiClient,
    notices: Option<broadcast::Sender<Notice>>,
    state: watch::Sender<PanelState<S::Item>>,
    generation: AtomicU64,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl<S: PanelSource> PanelInner<S> {
    async fn reload(&self, trigger: Option<AppEvent>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| {
            state.loading = true;
            if trigger.is_some() {
                state.last_trigger = trigger;
            }
        });

        let result = self.source.load(&self.api).await;

        // A newer reload started meanwhile; its result wins.
        let latest = self.generation.load(Ordering::SeqCst) == generation;
        match result {
            Ok(data) => {
                tracing::debug!(name: "panel.reloaded", panel = S::NAME, latest);
                self.state.send_modify(|state| {
                    if latest {
                        state.data = Some(data);
                        state.notice = None;
                        state.loading = false;
                    }
                    state.loads += 1;
                });
            }
            Err(err) => {
                tracing::warn!(name: "panel.reload_failed", panel = S::NAME, error = %err);
                let notice = Notice::from_error(&format!("load {}", S::NAME), &err);
                if latest {
                    if let Some(notices) = &self.notices {
                        let _ = notices.send(notice.clone());
                    }
                }
                self.state.send_modify(|state| {
                    if latest {
                        state.notice = Some(notice);
                        state.loading = false;
                    }
                    state.loads += 1;
                });
            }
        }
    }

    fn subscriptions(&self) -> std::sync::MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn unmount(&self) {
        for subscription in self.subscriptions().drain(..) {
            subscription.unsubscribe();
        }
    }
}

impl<S: PanelSource> Drop for PanelInner<S> {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// A panel backed by one [`PanelSource`].
///
/// Clones share state. Subscriptions made by [`mount`](Self::mount) hold only a
/// weak reference, and are removed when the last clone is dropped.
pub struct ResourcePanel<S: PanelSource> {
    inner: Arc<PanelInner<S>>,
}

impl<S: PanelSource> Clone for ResourcePanel<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: PanelSource> std::fmt::Debug for ResourcePanel<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePanel")
            .field("panel", &S::NAME)
            .field("mounted", &!self.inner.subscriptions().is_empty())
            .finish_non_exhaustive()
    }
}

impl<S: PanelSource> ResourcePanel<S> {
    pub fn new(source: S, api: ApiClient) -> Self {
        Self::build(source, api, None)
    }

    /// Also forward load failures to `notices`.
    pub fn with_notices(source: S, api: ApiClient, notices: broadcast::Sender<Notice>) -> Self {
        Self::build(source, api, Some(notices))
    }

    fn build(source: S, api: ApiClient, notices: Option<broadcast::Sender<Notice>>) -> Self {
        let (state, _) = watch::channel(PanelState::default());
        Self {
            inner: Arc::new(PanelInner {
                source,
                api,
                notices,
                state,
                generation: AtomicU64::new(0),
                subscriptions: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Fetch now. Failures end up in [`PanelState::notice`].
    pub async fn reload(&self) {
        self.inner.reload(None).await;
    }

    pub fn state(&self) -> PanelState<S::Item> {
        self.inner.state.borrow().clone()
    }

    pub fn data(&self) -> Option<S::Item> {
        self.inner.state.borrow().data.clone()
    }

    /// Receiver that is notified after every state change.
    pub fn changed(&self) -> watch::Receiver<PanelState<S::Item>> {
        self.inner.state.subscribe()
    }

    /// Subscribe to the source's triggers.
    ///
    /// Each trigger spawns a reload on the ambient tokio runtime; outside a
    /// runtime the trigger is logged and dropped. Mounting twice replaces the
    /// earlier subscriptions.
    pub fn mount(&self, bus: &EventBus) {
        self.inner.unmount();
        let subscriptions = self
            .inner
            .source
            .triggers()
            .iter()
            .map(|&event| {
                let weak: Weak<PanelInner<S>> = Arc::downgrade(&self.inner);
                bus.subscribe(event, move |payload| {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    if !inner.source.should_reload(payload) {
                        return;
                    }
                    let payload = payload.clone();
                    match tokio::runtime::Handle::try_current() {
                        Ok(handle) => {
                            handle.spawn(async move { inner.reload(Some(payload)).await });
                        }
                        Err(_) => tracing::warn!(
                            name: "panel.reload_skipped",
                            panel = S::NAME,
                            event = %payload.name(),
                            "No async runtime; trigger ignored"
                        ),
                    }
                })
            })
            .collect();
        *self.inner.subscriptions() = subscriptions;
    }

    pub fn unmount(&self) {
        self.inner.unmount();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::error::ApiError;
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

    /// Counts loads; fails when told to.
    struct Counter {
        loads: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl PanelSource for Counter {
        type Item = usize;
        const NAME: &'static str = "counter";

        fn triggers(&self) -> &'static [EventName] {
            &[EventName::DocumentDeleted, EventName::DataRefreshNeeded]
        }

        fn should_reload(&self, event: &AppEvent) -> bool {
            event.document_id() != Some(13)
        }

        async fn load(&self, _api: &ApiClient) -> Result<usize> {
            let n = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                Err(ApiError::Network("offline".into()))
            } else {
                Ok(n)
            }
        }
    }

    fn panel(fail: bool) -> (ResourcePanel<Counter>, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let api = ApiClient::new(Arc::new(Offline), TokenStore::new());
        let source = Counter {
            loads: Arc::clone(&loads),
            fail,
        };
        (ResourcePanel::new(source, api), loads)
    }

    #[tokio::test]
    async fn reload_publishes_data() {
        let (panel, _) = panel(false);
        panel.reload().await;
        let state = panel.state();
        assert_eq!(state.data, Some(1));
        assert_eq!(state.loads, 1);
        assert!(!state.loading);
        assert!(state.notice.is_none());
    }

    #[tokio::test]
    async fn failed_load_sets_retryable_notice() {
        let (panel, _) = panel(true);
        panel.reload().await;
        let state = panel.state();
        assert!(state.data.is_none());
        assert!(state.notice.as_ref().is_some_and(|n| n.retryable));
    }

    #[tokio::test]
    async fn trigger_reloads_once_with_payload() {
        let bus = EventBus::new();
        let (panel, loads) = panel(false);
        panel.mount(&bus);
        let mut changed = panel.changed();

        bus.publish(&AppEvent::DocumentDeleted { document_id: 1 });
        let state = changed.wait_for(|s| s.loads == 1).await.unwrap().clone();

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(
            state.last_trigger,
            Some(AppEvent::DocumentDeleted { document_id: 1 })
        );
    }

    #[tokio::test]
    async fn filtered_and_unrelated_events_do_not_reload() {
        let bus = EventBus::new();
        let (panel, loads) = panel(false);
        panel.mount(&bus);

        bus.publish(&AppEvent::DocumentDeleted { document_id: 13 });
        bus.publish(&AppEvent::ConversationDeleted { conversation_id: 1 });
        tokio::task::yield_now().await;

        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unmount_and_drop_remove_subscriptions() {
        let bus = EventBus::new();
        let (panel, _) = panel(false);
        panel.mount(&bus);
        assert_eq!(bus.subscriber_count(EventName::DocumentDeleted), 1);

        panel.mount(&bus);
        assert_eq!(bus.subscriber_count(EventName::DocumentDeleted), 1);

        panel.unmount();
        assert_eq!(bus.subscriber_count(EventName::DocumentDeleted), 0);

        panel.mount(&bus);
        drop(panel);
        assert_eq!(bus.subscriber_count(EventName::DataRefreshNeeded), 0);
    }
}
