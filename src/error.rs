//! Normalized error taxonomy for every API call.
//!
//! Transport failures and non-success HTTP statuses are folded into
//! [`ApiError`] so callers can branch on [`ErrorKind`] instead of raw codes.

use thiserror::Error;

/// Coarse classification used by view code to pick a user-facing reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credential missing, rejected or expired beyond renewal.
    Unauthorized,
    /// The referenced resource does not exist (or is not ours).
    NotFound,
    /// The request was rejected because of its input.
    Validation,
    /// The server could not be reached.
    Network,
    /// The call exceeded its deadline.
    Timeout,
    /// Anything else the server reported, including unknown statuses.
    Server,
}

/// Client error type.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// No session is active, so there is no credential to send.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The server rejected the credential (401).
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Detail reported by the server.
        message: String,
    },

    /// The session could not be renewed and has been cleared.
    #[error("Session expired: {reason}")]
    SessionExpired {
        /// Why the renewal failed.
        reason: String,
    },

    /// HTTP 404.
    #[error("Not found: {message}")]
    NotFound {
        /// Detail reported by the server.
        message: String,
    },

    /// HTTP 400, 409 or 422.
    #[error("Invalid request ({status}): {message}")]
    Validation {
        /// HTTP status code.
        status: u16,
        /// Detail reported by the server.
        message: String,
    },

    /// HTTP 5xx or any other unexpected status.
    #[error("API error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Detail reported by the server.
        message: String,
    },

    /// Connection refused, DNS failure, broken stream.
    #[error("Network error: {0}")]
    Network(String),

    /// The request hit its fixed deadline.
    #[error("Request timed out")]
    Timeout,

    /// A success response carried a body we could not decode.
    #[error("Unexpected response body: {0}")]
    Decode(String),

    /// Base URL or path could not be joined into a URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Rejected locally before anything was sent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Local I/O failed while preparing a request (e.g. reading an upload).
    #[error("I/O error: {0}")]
    Io(String),

    /// The document never reached a processed state within the allowed attempts.
    #[error("Document {document_id} was not processed after {attempts} attempts")]
    IngestionTimeout {
        /// Document being polled.
        document_id: i64,
        /// Number of status checks performed.
        attempts: u32,
    },

    /// The backend reported that ingestion failed.
    #[error("Processing of document {document_id} failed: {status}")]
    IngestionFailed {
        /// Document being polled.
        document_id: i64,
        /// Status string reported by the backend.
        status: String,
    },
}

impl ApiError {
    /// Build an error from a non-success HTTP status and its raw body.
    ///
    /// FastAPI-style `{"detail": ...}` bodies are unwrapped; anything else is
    /// used verbatim.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let message = extract_detail(body).unwrap_or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            if text.is_empty() {
                "Unknown error".to_string()
            } else {
                text
            }
        });

        match status {
            401 => Self::Unauthorized { message },
            404 => Self::NotFound { message },
            400 | 409 | 422 => Self::Validation { status, message },
            _ => Self::Server { status, message },
        }
    }

    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAuthenticated | Self::Unauthorized { .. } | Self::SessionExpired { .. } => {
                ErrorKind::Unauthorized
            }
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation { .. }
            | Self::InvalidInput(_)
            | Self::InvalidUrl(_)
            | Self::Io(_) => ErrorKind::Validation,
            Self::Network(_) => ErrorKind::Network,
            Self::Timeout | Self::IngestionTimeout { .. } => ErrorKind::Timeout,
            Self::Server { .. } | Self::Decode(_) | Self::IngestionFailed { .. } => {
                ErrorKind::Server
            }
        }
    }

    /// HTTP status that produced this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::NotFound { .. } => Some(404),
            Self::Validation { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether offering the user a retry makes sense.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::Timeout)
            || matches!(self, Self::Server { status, .. } if *status >= 500)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;

fn extract_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        // Pydantic validation errors arrive as a list of {loc, msg, type}.
        serde_json::Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        other => Some(other.to_string()),
    }
}
