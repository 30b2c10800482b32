use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::models::PublicUser;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<PublicUser>,
    pub token: Option<String>,
}

impl Session {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }
}

/// Current user and bearer token. Cloning shares the same session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Session::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn login(&self, user: PublicUser, token: String) {
        debug!(user_id = user.id, "Session started");
        self.tx.send_replace(Session {
            user: Some(user),
            token: Some(token),
        });
    }

    pub fn logout(&self) {
        let was_authenticated = self.tx.send_if_modified(|session| {
            let changed = session.token.is_some() || session.user.is_some();
            *session = Session::default();
            changed
        });
        if was_authenticated {
            debug!("Session cleared");
        }
    }

    /// Replaces the stored user, keeping the token. No-op when logged out.
    pub fn set_user(&self, user: PublicUser) {
        self.tx.send_if_modified(|session| {
            if session.token.is_none() {
                return false;
            }
            session.user = Some(user);
            true
        });
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.tx.borrow().token.clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<PublicUser> {
        self.tx.borrow().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated()
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> PublicUser {
        PublicUser {
            id: 7,
            email: "a@b.com".to_string(),
            name: "A".to_string(),
            favorite_genres: vec![],
            created_at: "2025-03-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_login_and_logout() {
        let store = SessionStore::new();
        assert!(!store.is_authenticated());
        assert!(store.token().is_none());

        store.login(user(), "tok".to_string());
        assert!(store.is_authenticated());
        assert_eq!(store.token().as_deref(), Some("tok"));
        assert_eq!(store.current_user().map(|u| u.id), Some(7));

        store.logout();
        assert!(!store.is_authenticated());
        assert!(store.current_user().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let store = SessionStore::new();
        let other = store.clone();
        store.login(user(), "tok".to_string());
        assert!(other.is_authenticated());
    }

    #[test]
    fn test_set_user_requires_session() {
        let store = SessionStore::new();
        store.set_user(user());
        assert!(store.current_user().is_none());

        store.login(user(), "tok".to_string());
        let mut renamed = user();
        renamed.name = "B".to_string();
        store.set_user(renamed);
        assert_eq!(store.current_user().map(|u| u.name).as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_subscribers_observe_logout() {
        let store = SessionStore::new();
        store.login(user(), "tok".to_string());

        let mut rx = store.subscribe();
        rx.borrow_and_update();

        store.logout();
        rx.changed().await.unwrap();
        assert!(!rx.borrow().is_authenticated());
    }

    #[tokio::test]
    async fn test_repeated_logout_does_not_notify() {
        let store = SessionStore::new();
        let rx = store.subscribe();
        store.logout();
        assert!(!rx.has_changed().unwrap());
    }
}
