//! Typed API Client Layer.
//!
//! One accessor per backend resource, in the style of
//! `client.documents().list_mine()`. Every call goes through the
//! [`AuthInterceptor`], which reads the credential from the [`TokenStore`] at
//! send time and handles renewal; resource functions only build requests and
//! decode responses.
//!
//! ```rust,no_run
//! use docchat_client::api::ApiClient;
//! use docchat_client::config::AppConfig;
//! use docchat_client::session::TokenStore;
//!
//! # async fn example() -> Result<(), docchat_client::ApiError> {
//! let client = ApiClient::from_config(&AppConfig::default(), TokenStore::new())?;
//! client.auth().login("alice", "secret").await?;
//!
//! for doc in client.documents().list_mine().await? {
//!     println!("{}: {}", doc.id, doc.filename);
//! }
//! # Ok(())
//! # }
//! ```

mod auth;
mod chat;
mod conversations;
mod documents;
pub mod paths;
mod stats;
mod summary;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::AppConfig;
use crate::error::Result;
use crate::session::TokenStore;
use crate::transport::{ApiRequest, ApiResponse, AuthInterceptor, HttpTransport, Transport};

pub use auth::AuthApi;
pub use chat::ChatApi;
pub use conversations::ConversationsApi;
pub use documents::{DocumentsApi, SUPPORTED_EXTENSIONS};
pub use stats::StatsApi;
pub use summary::SummaryApi;

/// Tunables that are not part of the transport.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Deadline for summary generation, which runs far longer than other calls.
    pub summary_timeout: Duration,
    /// Pause between ingestion status checks.
    pub poll_interval: Duration,
    /// Status checks before giving up on ingestion.
    pub max_poll_attempts: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ClientSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            summary_timeout: cfg.api.summary_timeout(),
            poll_interval: cfg.ingestion.poll_interval(),
            max_poll_attempts: cfg.ingestion.max_attempts,
        }
    }
}

/// Client for the document-chat API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    interceptor: AuthInterceptor,
    settings: ClientSettings,
}

impl ApiClient {
    /// Client over an arbitrary transport.
    pub fn new(transport: Arc<dyn Transport>, tokens: TokenStore) -> Self {
        Self {
            interceptor: AuthInterceptor::new(transport, tokens),
            settings: ClientSettings::default(),
        }
    }

    /// HTTP client configured from `cfg`.
    pub fn from_config(cfg: &AppConfig, tokens: TokenStore) -> Result<Self> {
        let transport = HttpTransport::new(&cfg.api.base_url, cfg.api.request_timeout())?;
        Ok(Self::new(Arc::new(transport), tokens).with_settings(ClientSettings::from(cfg)))
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ClientSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn tokens(&self) -> &TokenStore {
        self.interceptor.tokens()
    }

    pub fn interceptor(&self) -> &AuthInterceptor {
        &self.interceptor
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi { client: self }
    }

    pub fn documents(&self) -> DocumentsApi<'_> {
        DocumentsApi { client: self }
    }

    pub fn conversations(&self) -> ConversationsApi<'_> {
        ConversationsApi { client: self }
    }

    pub fn chat(&self) -> ChatApi<'_> {
        ChatApi { client: self }
    }

    pub fn summary(&self) -> SummaryApi<'_> {
        SummaryApi { client: self }
    }

    pub fn stats(&self) -> StatsApi<'_> {
        StatsApi { client: self }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Send and fail on any non-success status.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.interceptor.execute(&request).await?.error_for_status()
    }

    /// Send and decode the success body.
    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.interceptor.execute(&request).await?.json()
    }
}
