//! Session record and its store.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;

/// Identity fields shown in the header and profile page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub full_name: String,
    pub email: String,
}

/// One complete authentication state.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub profile: Profile,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("profile", &self.profile)
            .finish()
    }
}

/// Coarse state for views that gate on authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Never logged in, or logged out on purpose.
    SignedOut,
    /// A session is present.
    Active,
    /// The session was dropped because it could not be renewed.
    Expired,
}

struct StoreInner {
    session: RwLock<Option<Session>>,
    status: watch::Sender<SessionStatus>,
}

/// Holder of the current [`Session`].
///
/// Writes replace the whole record under one lock, so readers see either the
/// previous or the next session, never a mix of the two. Clones share state.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("status", &self.status())
            .finish()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore {
    pub fn new() -> Self {
        let (status, _) = watch::channel(SessionStatus::SignedOut);
        Self {
            inner: Arc::new(StoreInner {
                session: RwLock::new(None),
                status,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Install a new session, replacing whatever was there.
    pub fn set_session(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        profile: Profile,
    ) {
        let session = Session {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            profile,
        };
        *self.write() = Some(session);
        self.inner.status.send_replace(SessionStatus::Active);
    }

    /// Swap both credentials after a renewal, keeping the profile.
    ///
    /// `spent_refresh` is the refresh token the renewal was issued for. The
    /// pair is installed only if the current session still holds it; returns
    /// `false` otherwise. A logout, or a logout followed by a new login, must
    /// not pick up a late renewal of the old session.
    pub fn replace_tokens(
        &self,
        spent_refresh: &str,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> bool {
        let mut guard = self.write();
        match guard.as_mut() {
            Some(session) if session.refresh_token == spent_refresh => {
                *session = Session {
                    access_token: access_token.into(),
                    refresh_token: refresh_token.into(),
                    profile: session.profile.clone(),
                };
                true
            }
            _ => false,
        }
    }

    /// Replace the identity fields of the current session.
    pub fn update_profile(&self, profile: Profile) {
        if let Some(session) = self.write().as_mut() {
            session.profile = profile;
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.refresh_token.clone())
    }

    pub fn profile(&self) -> Option<Profile> {
        self.read().as_ref().map(|s| s.profile.clone())
    }

    /// Copy of the complete current session.
    pub fn snapshot(&self) -> Option<Session> {
        self.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Drop the session after a deliberate logout.
    pub fn clear(&self) {
        *self.write() = None;
        self.inner.status.send_replace(SessionStatus::SignedOut);
    }

    /// Drop the session because it can no longer be renewed.
    pub fn expire(&self) {
        *self.write() = None;
        self.inner.status.send_replace(SessionStatus::Expired);
    }

    /// [`expire`](Self::expire), but only while the session still holds
    /// `refresh_token`. Returns whether it did.
    pub fn expire_if(&self, refresh_token: &str) -> bool {
        let mut guard = self.write();
        if guard
            .as_ref()
            .is_some_and(|s| s.refresh_token == refresh_token)
        {
            *guard = None;
            drop(guard);
            self.inner.status.send_replace(SessionStatus::Expired);
            true
        } else {
            false
        }
    }

    pub fn status(&self) -> SessionStatus {
        *self.inner.status.borrow()
    }

    /// Receiver that observes every status change.
    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            full_name: "Alice Doe".into(),
            email: "alice@example.com".into(),
        }
    }

    #[test]
    fn empty_store_has_no_credentials() {
        let store = TokenStore::new();
        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
        assert!(!store.is_authenticated());
        assert_eq!(store.status(), SessionStatus::SignedOut);
    }

    #[test]
    fn replace_tokens_keeps_profile() {
        let store = TokenStore::new();
        store.set_session("a1", "r1", profile());
        assert!(store.replace_tokens("r1", "a2", "r2"));

        let session = store.snapshot().unwrap();
        assert_eq!(session.access_token, "a2");
        assert_eq!(session.refresh_token, "r2");
        assert_eq!(session.profile, profile());
    }

    #[test]
    fn replace_tokens_after_clear_does_not_resurrect() {
        let store = TokenStore::new();
        store.set_session("a1", "r1", profile());
        store.clear();
        assert!(!store.replace_tokens("r1", "a2", "r2"));
        assert!(store.access_token().is_none());
    }

    #[test]
    fn expire_and_clear_report_different_status() {
        let store = TokenStore::new();
        let mut rx = store.watch_status();

        store.set_session("a", "r", Profile::default());
        assert_eq!(*rx.borrow_and_update(), SessionStatus::Active);

        store.expire();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SessionStatus::Expired);
        assert!(store.refresh_token().is_none());

        store.clear();
        assert_eq!(store.status(), SessionStatus::SignedOut);
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let store = TokenStore::new();
        store.set_session("secret-access", "secret-refresh", profile());
        let rendered = format!("{:?}", store.snapshot().unwrap());
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn replace_tokens_refuses_a_different_session() {
        let store = TokenStore::new();
        store.set_session("alice-a1", "alice-r1", profile());
        store.clear();
        let bob = Profile {
            full_name: "Bob".into(),
            email: "bob@example.com".into(),
        };
        store.set_session("bob-a1", "bob-r1", bob.clone());

        assert!(!store.replace_tokens("alice-r1", "alice-a2", "alice-r2"));

        let session = store.snapshot().unwrap();
        assert_eq!(session.access_token, "bob-a1");
        assert_eq!(session.refresh_token, "bob-r1");
        assert_eq!(session.profile, bob);
    }

    #[test]
    fn expire_if_only_drops_the_matching_session() {
        let store = TokenStore::new();
        store.set_session("a", "r-new", profile());

        assert!(!store.expire_if("r-old"));
        assert_eq!(store.status(), SessionStatus::Active);

        assert!(store.expire_if("r-new"));
        assert_eq!(store.status(), SessionStatus::Expired);
        assert!(store.access_token().is_none());
    }

    #[test]
    fn readers_never_observe_mixed_pairs() {
        let store = TokenStore::new();
        store.set_session("a0", "r0", Profile::default());

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 1..500 {
                    store.replace_tokens(&format!("r{}", i - 1), format!("a{i}"), format!("r{i}"));
                }
            })
        };

        for _ in 0..500 {
            let s = store.snapshot().unwrap();
            assert_eq!(s.access_token[1..], s.refresh_token[1..]);
        }
        writer.join().unwrap();
    }
}
