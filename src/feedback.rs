//! User-facing notices derived from [`ApiError`].
//!
//! Views never propagate errors past their boundary; they turn them into a
//! [`Notice`] and leave their own state unchanged.

use std::fmt;

use crate::error::{ApiError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A non-blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// Whether the front end should offer to retry the action.
    pub retryable: bool,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            retryable: false,
        }
    }

    /// Notice for a failed `action` ("delete document", "rename conversation").
    pub fn from_error(action: &str, err: &ApiError) -> Self {
        let message = match (err.kind(), err) {
            (_, ApiError::SessionExpired { .. }) => {
                "Your session has expired. Please log in again.".to_string()
            }
            (ErrorKind::Unauthorized, _) => "Please log in to continue.".to_string(),
            (ErrorKind::NotFound, _) => format!("Could not {action}: it no longer exists."),
            (ErrorKind::Validation, _) => format!("Could not {action}: {err}"),
            (ErrorKind::Network, _) => {
                format!("Could not {action}: the server is unreachable.")
            }
            (ErrorKind::Timeout, _) => format!("Could not {action}: the request timed out."),
            (ErrorKind::Server, _) => format!("Could not {action}. Please try again later."),
        };

        Self {
            level: NoticeLevel::Error,
            message,
            retryable: err.is_retryable(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_session_asks_for_login() {
        let notice = Notice::from_error(
            "delete document",
            &ApiError::SessionExpired {
                reason: "refresh rejected".into(),
            },
        );
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.message.contains("session has expired"));
        assert!(!notice.retryable);
    }

    #[test]
    fn network_failures_offer_retry() {
        let notice = Notice::from_error("load documents", &ApiError::Network("refused".into()));
        assert!(notice.retryable);
        assert_eq!(
            notice.message,
            "Could not load documents: the server is unreachable."
        );
    }

    #[test]
    fn validation_keeps_server_detail() {
        let err = ApiError::from_status(400, br#"{"detail":"Title cannot be empty"}"#);
        let notice = Notice::from_error("rename conversation", &err);
        assert!(notice.message.contains("Title cannot be empty"));
        assert!(!notice.retryable);
    }
}
