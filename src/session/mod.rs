//! Authentication state for the lifetime of the client.
//!
//! The [`TokenStore`] is the only place the access credential lives. Every
//! request reads it at send time, so a renewal is visible to the next call
//! without anything being handed around.
//!
//! # Example
//!
//! ```rust
//! use docchat_client::session::{Profile, SessionStatus, TokenStore};
//!
//! let store = TokenStore::new();
//! store.set_session("access", "refresh", Profile::default());
//! assert_eq!(store.access_token().as_deref(), Some("access"));
//! assert_eq!(store.status(), SessionStatus::Active);
//!
//! store.clear();
//! assert!(store.access_token().is_none());
//! ```

mod store;

pub use store::{Profile, Session, SessionStatus, TokenStore};
