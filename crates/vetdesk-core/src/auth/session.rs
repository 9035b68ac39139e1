use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, MutexGuard};
use tracing::{debug, info, warn};

use super::storage::{StorageError, TokenStorage};

/// Storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "token";

/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Route the application shell should navigate to once the session is gone
pub const LOGIN_ROUTE: &str = "/login";

/// Buffer size for each session event subscriber.
/// Events are rare (login, refresh, expiry), a small buffer is plenty.
const EVENT_BUFFER_SIZE: usize = 16;

/// Access/refresh token pair as returned by `/auth/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Session lifecycle notifications for the application shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Tokens stored after a successful login
    LoggedIn,
    /// Tokens rotated through the refresh endpoint
    Refreshed,
    /// Session could not be recovered; the user must log in again
    Expired { redirect_to: String, reason: String },
    /// Tokens cleared on request
    LoggedOut,
}

struct SessionInner {
    storage: Arc<dyn TokenStorage>,
    refresh_lock: tokio::sync::Mutex<()>,
    subscribers: Mutex<Vec<mpsc::Sender<SessionEvent>>>,
}

/// Explicit session handle shared between the API client and the shell.
/// Clone is cheap - all clones share the same storage and subscribers.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                storage,
                refresh_lock: tokio::sync::Mutex::new(()),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Get the stored access token, if any
    pub fn access_token(&self) -> Result<Option<String>, StorageError> {
        self.inner.storage.get(ACCESS_TOKEN_KEY)
    }

    /// Get the stored refresh token, if any
    pub fn refresh_token(&self) -> Result<Option<String>, StorageError> {
        self.inner.storage.get(REFRESH_TOKEN_KEY)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.access_token(), Ok(Some(_)))
    }

    /// Persist a rotated token pair
    pub fn store(&self, pair: &TokenPair) -> Result<(), StorageError> {
        self.inner.storage.set(ACCESS_TOKEN_KEY, &pair.access_token)?;
        self.inner.storage.set(REFRESH_TOKEN_KEY, &pair.refresh_token)?;
        Ok(())
    }

    /// Persist tokens from a login response. The backend may not hand out a
    /// refresh token; any stale one is dropped so it cannot be replayed.
    pub fn start(&self, access_token: &str, refresh_token: Option<&str>) -> Result<(), StorageError> {
        self.inner.storage.set(ACCESS_TOKEN_KEY, access_token)?;
        match refresh_token {
            Some(token) => self.inner.storage.set(REFRESH_TOKEN_KEY, token)?,
            None => self.inner.storage.remove(REFRESH_TOKEN_KEY)?,
        }
        info!(has_refresh_token = refresh_token.is_some(), "Session started");
        self.emit(SessionEvent::LoggedIn);
        Ok(())
    }

    /// Remove both tokens
    pub fn clear(&self) -> Result<(), StorageError> {
        self.inner.storage.remove(ACCESS_TOKEN_KEY)?;
        self.inner.storage.remove(REFRESH_TOKEN_KEY)?;
        Ok(())
    }

    /// Clear the session and tell the shell to send the user to the login route
    pub fn expire(&self, reason: impl Into<String>) {
        let reason = reason.into();
        if let Err(e) = self.clear() {
            warn!(error = %e, "Failed to clear tokens on session expiry");
        }
        warn!(reason = %reason, "Session expired");
        self.emit(SessionEvent::Expired {
            redirect_to: LOGIN_ROUTE.to_string(),
            reason,
        });
    }

    /// Clear the session at the user's request
    pub fn logout(&self) -> Result<(), StorageError> {
        self.clear()?;
        info!("Logged out");
        self.emit(SessionEvent::LoggedOut);
        Ok(())
    }

    /// Register a new listener for session events
    pub fn subscribe(&self) -> mpsc::Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER_SIZE);
        self.subscribers().push(tx);
        rx
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        let mut subscribers = self.subscribers();
        subscribers.retain(|tx| !tx.is_closed());
        for tx in subscribers.iter() {
            if let Err(e) = tx.try_send(event.clone()) {
                warn!(error = %e, "Dropped session event - subscriber not keeping up");
            }
        }
        debug!(?event, subscribers = subscribers.len(), "Session event emitted");
    }

    /// Serializes token refreshes across every clone of this session
    pub(crate) async fn lock_refresh(&self) -> MutexGuard<'_, ()> {
        self.inner.refresh_lock.lock().await
    }

    fn subscribers(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::Sender<SessionEvent>>> {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStorage;

    fn session() -> Session {
        Session::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_store_and_clear() {
        let session = session();
        assert!(!session.is_authenticated());

        session
            .store(&TokenPair {
                access_token: "A1".to_string(),
                refresh_token: "R1".to_string(),
            })
            .unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.access_token().unwrap().as_deref(), Some("A1"));
        assert_eq!(session.refresh_token().unwrap().as_deref(), Some("R1"));

        session.clear().unwrap();
        assert_eq!(session.access_token().unwrap(), None);
        assert_eq!(session.refresh_token().unwrap(), None);
    }

    #[test]
    fn test_start_without_refresh_token_drops_stale_one() {
        let session = session();
        session
            .store(&TokenPair {
                access_token: "old".to_string(),
                refresh_token: "stale".to_string(),
            })
            .unwrap();

        session.start("fresh", None).unwrap();
        assert_eq!(session.access_token().unwrap().as_deref(), Some("fresh"));
        assert_eq!(session.refresh_token().unwrap(), None);
    }

    #[tokio::test]
    async fn test_expire_clears_and_notifies() {
        let session = session();
        let mut events = session.subscribe();
        session.start("A1", Some("R1")).unwrap();
        session.expire("refresh rejected");

        assert_eq!(events.recv().await, Some(SessionEvent::LoggedIn));
        assert_eq!(
            events.recv().await,
            Some(SessionEvent::Expired {
                redirect_to: "/login".to_string(),
                reason: "refresh rejected".to_string(),
            })
        );
        assert!(!session.is_authenticated());
        assert_eq!(session.refresh_token().unwrap(), None);
    }

    #[tokio::test]
    async fn test_clones_share_state_and_subscribers() {
        let session = session();
        let clone = session.clone();
        let mut events = session.subscribe();

        clone.start("A1", Some("R1")).unwrap();
        assert_eq!(session.access_token().unwrap().as_deref(), Some("A1"));

        clone.logout().unwrap();
        assert_eq!(events.recv().await, Some(SessionEvent::LoggedIn));
        assert_eq!(events.recv().await, Some(SessionEvent::LoggedOut));
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let session = session();
        drop(session.subscribe());
        session.emit(SessionEvent::LoggedOut);
        assert!(session.subscribers().is_empty());
    }
}
