//! Background handler turning `SummaryRequest` events into summaries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::broadcast;

use crate::api::ApiClient;
use crate::api::types::DocumentId;
use crate::events::{AppEvent, EventBus, EventName, Subscription};
use crate::feedback::Notice;

struct SummaryInner {
    api: ApiClient,
    bus: EventBus,
    notices: Option<broadcast::Sender<Notice>>,
    busy: AtomicBool,
    subscription: Mutex<Option<Subscription>>,
}

impl SummaryInner {
    fn stop(&self) {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
    }
}

impl Drop for SummaryInner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Holds the busy flag for one run; releasing it on drop covers cancellation.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        (!flag.swap(true, Ordering::SeqCst)).then_some(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Generates one summary at a time and publishes the outcome.
///
/// Requests arriving while a summary is running are dropped with a warning
/// notice. Results go out as `SummarySuccess` or `SummaryError`. The bus only
/// holds the handler weakly; dropping the last clone unregisters it.
#[derive(Clone)]
pub struct SummaryHandler {
    inner: Arc<SummaryInner>,
}

impl std::fmt::Debug for SummaryHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryHandler")
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

impl SummaryHandler {
    pub fn new(api: ApiClient, bus: EventBus, notices: Option<broadcast::Sender<Notice>>) -> Self {
        Self {
            inner: Arc::new(SummaryInner {
                api,
                bus,
                notices,
                busy: AtomicBool::new(false),
                subscription: Mutex::new(None),
            }),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::SeqCst)
    }

    /// Become the listener for `SummaryRequest`.
    ///
    /// Any earlier registrations for that event are removed first, so
    /// restarting the handler never leaves two generators running.
    pub fn start(&self) {
        self.inner.bus.unsubscribe_all(EventName::SummaryRequest);
        let weak: Weak<SummaryInner> = Arc::downgrade(&self.inner);
        let subscription = self
            .inner
            .bus
            .subscribe(EventName::SummaryRequest, move |event| {
                let (Some(inner), AppEvent::SummaryRequest { document_id }) =
                    (weak.upgrade(), event)
                else {
                    return;
                };
                SummaryHandler { inner }.dispatch(*document_id);
            });
        *self
            .inner
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);
    }

    pub fn stop(&self) {
        self.inner.stop();
    }

    fn dispatch(&self, document_id: DocumentId) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(name: "summary.no_runtime", document_id, "Summary request ignored");
            return;
        };
        let handler = self.clone();
        runtime.spawn(async move { handler.run(document_id).await });
    }

    /// Generate the summary for `document_id` and publish the outcome.
    ///
    /// Returns `false` without doing anything when another summary is running.
    pub async fn run(&self, document_id: DocumentId) -> bool {
        let Some(guard) = BusyGuard::acquire(&self.inner.busy) else {
            tracing::info!(name: "summary.busy", document_id);
            self.notify(Notice::warning("Another summary is already being generated."));
            return false;
        };

        tracing::info!(name: "summary.started", document_id);
        let result = self.inner.api.summary().generate(document_id).await;
        drop(guard);

        match result {
            Ok(summary) => {
                tracing::info!(
                    name: "summary.completed",
                    document_id,
                    cached = summary.metrics.cached
                );
                self.inner.bus.publish(&AppEvent::SummarySuccess(summary));
            }
            Err(err) => {
                tracing::warn!(name: "summary.failed", document_id, error = %err);
                self.notify(Notice::from_error("generate summary", &err));
                self.inner.bus.publish(&AppEvent::SummaryError {
                    document_id,
                    message: err.to_string(),
                });
            }
        }
        true
    }

    fn notify(&self, notice: Notice) {
        if let Some(notices) = &self.inner.notices {
            let _ = notices.send(notice);
        }
    }
}
