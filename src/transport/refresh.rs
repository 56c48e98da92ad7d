//! Transparent access-token renewal.
//!
//! A refresh episode runs Idle → Refreshing → (Succeeded | Failed) → Idle.
//! The first authenticated call that sees a 401 stores a shared renewal future
//! in a single slot; every other call that sees a 401 while the slot is full
//! awaits the same future instead of issuing its own renewal. When the future
//! settles each waiter replays its request once with the new credential, and
//! that replay can never open another episode.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::instrument;

use super::{ApiRequest, ApiResponse, Transport};
use crate::api::paths;
use crate::api::types::{RefreshRequest, TokenPair};
use crate::error::{ApiError, Result};
use crate::session::TokenStore;

type Renewal = Shared<BoxFuture<'static, Result<String>>>;

/// Whether a renewal is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

/// Wraps a [`Transport`] with bearer attachment and coalesced renewal.
#[derive(Clone)]
pub struct AuthInterceptor {
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    inflight: Arc<Mutex<Option<Renewal>>>,
    episodes: Arc<AtomicU64>,
}

impl std::fmt::Debug for AuthInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthInterceptor")
            .field("transport", &self.transport)
            .field("state", &self.state())
            .field("episodes", &self.episodes())
            .finish()
    }
}

/// Endpoints whose 401 means "bad credentials", never "renew and retry".
fn is_exempt(path: &str) -> bool {
    let path = path.trim_end_matches('/');
    [paths::LOGIN, paths::REGISTER, paths::REFRESH]
        .iter()
        .any(|exempt| path == *exempt)
}

impl AuthInterceptor {
    pub fn new(transport: Arc<dyn Transport>, tokens: TokenStore) -> Self {
        Self {
            transport,
            tokens,
            inflight: Arc::new(Mutex::new(None)),
            episodes: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn state(&self) -> RefreshState {
        if lock(&self.inflight).is_some() {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// Number of renewal requests issued so far.
    pub fn episodes(&self) -> u64 {
        self.episodes.load(Ordering::Relaxed)
    }

    /// Send `request`, renewing the credential once if it is rejected.
    ///
    /// Public requests go straight to the transport. Non-401 statuses are
    /// returned untouched for the caller to classify.
    #[instrument(level = "debug", skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        if !request.authenticated {
            return self.transport.send(request, None).await;
        }

        let token = self.tokens.access_token().ok_or(ApiError::NotAuthenticated)?;
        let response = self.transport.send(request, Some(&token)).await?;
        if response.status != 401 || is_exempt(&request.path) {
            return Ok(response);
        }

        tracing::info!(name: "auth.token.rejected", "Access token rejected; renewing");
        let fresh = self.renewed_token(&token).await?;

        let retried = self.transport.send(request, Some(&fresh)).await?;
        if retried.status == 401 {
            tracing::warn!(
                name: "auth.retry.rejected",
                "Renewed token rejected; ending session"
            );
            self.tokens.expire();
            return Err(ApiError::SessionExpired {
                reason: "credential rejected after renewal".to_string(),
            });
        }
        Ok(retried)
    }

    /// Join the in-flight renewal or start one.
    ///
    /// `stale` is the token the failed request carried. If the store already
    /// holds a different one, an episode finished after that request left, and
    /// the current token is returned without renewing again.
    async fn renewed_token(&self, stale: &str) -> Result<String> {
        let renewal = {
            let mut slot = lock(&self.inflight);
            if let Some(pending) = slot.as_ref() {
                tracing::debug!(name: "auth.refresh.joined", "Waiting on in-flight renewal");
                pending.clone()
            } else {
                let Some(session) = self.tokens.snapshot() else {
                    return Err(ApiError::SessionExpired {
                        reason: "session was cleared".to_string(),
                    });
                };
                if session.access_token != stale {
                    tracing::debug!(name: "auth.refresh.skipped", "Token already renewed");
                    return Ok(session.access_token);
                }

                self.episodes.fetch_add(1, Ordering::Relaxed);
                let renewal = renew(
                    Arc::clone(&self.transport),
                    self.tokens.clone(),
                    Arc::clone(&self.inflight),
                    session.refresh_token,
                )
                .boxed()
                .shared();
                *slot = Some(renewal.clone());
                renewal
            }
        };
        renewal.await
    }
}

async fn renew(
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    slot: Arc<Mutex<Option<Renewal>>>,
    refresh_token: String,
) -> Result<String> {
    tracing::info!(name: "auth.refresh.started", "Renewing access token");

    let outcome = async {
        let request = ApiRequest::post(paths::REFRESH)
            .public()
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })?;
        transport.send(&request, None).await?.json::<TokenPair>()
    }
    .await;

    let result = match outcome {
        Ok(pair)
            if tokens.replace_tokens(&refresh_token, &pair.access_token, &pair.refresh_token) =>
        {
            tracing::info!(name: "auth.refresh.succeeded", "Access token renewed");
            Ok(pair.access_token)
        }
        Ok(_) => {
            tracing::info!(
                name: "auth.refresh.discarded",
                "Session ended or was replaced during renewal; discarding new tokens"
            );
            Err(ApiError::SessionExpired {
                reason: "session ended during renewal".to_string(),
            })
        }
        Err(err) => {
            tracing::warn!(
                name: "auth.refresh.failed",
                error = %err,
                "Token renewal failed; ending session"
            );
            // A session installed meanwhile is not ours to end.
            tokens.expire_if(&refresh_token);
            Err(ApiError::SessionExpired {
                reason: err.to_string(),
            })
        }
    };

    // Store is updated before the slot empties, so a late 401 either joins
    // this episode or sees the new token.
    lock(&slot).take();
    result
}

fn lock(slot: &Mutex<Option<Renewal>>) -> MutexGuard<'_, Option<Renewal>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
