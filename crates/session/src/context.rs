//! Session context: who is logged in, and whether we know yet

use medport_core::TokenPair;
use medport_http::{ApiClient, ClientError};
use tokio::sync::watch;

/// Lifecycle of a session within one process run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Stored credentials have not been looked at yet
    Unchecked,
    /// Stored credentials are being validated
    Checking,
    Authenticated,
    Unauthenticated,
}

/// Authentication state as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub is_authenticated: bool,
    pub loading: bool,
}

impl From<SessionPhase> for SessionState {
    fn from(phase: SessionPhase) -> Self {
        Self {
            is_authenticated: phase == SessionPhase::Authenticated,
            loading: phase == SessionPhase::Checking,
        }
    }
}

/// Authentication session owned by the application root
pub struct Session {
    client: ApiClient,
    phase: watch::Sender<SessionPhase>,
}

impl Session {
    pub fn new(client: ApiClient) -> Self {
        let (phase, _) = watch::channel(SessionPhase::Unchecked);
        Self { client, phase }
    }

    /// Client whose token store backs this session
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    pub fn state(&self) -> SessionState {
        self.phase().into()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated
    }

    /// Receive every phase change, e.g. to re-render on logout
    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    /// Id of the logged-in user, decoded from the current access token
    pub fn user_id(&self) -> Option<u64> {
        self.client.store().user_id()
    }

    pub(crate) fn set_phase(&self, phase: SessionPhase) {
        let previous = self.phase.send_replace(phase);
        if previous != phase {
            tracing::debug!(?previous, current = ?phase, "Session phase changed");
        }
    }

    /// Validate stored credentials once at startup
    ///
    /// A stored pair is checked by refreshing its access token. Only the
    /// first caller validates; others, including ones racing it, return the
    /// current state without touching the network.
    pub async fn initialize(&self) -> SessionState {
        let claimed = self.phase.send_if_modified(|phase| {
            if *phase == SessionPhase::Unchecked {
                *phase = SessionPhase::Checking;
                true
            } else {
                false
            }
        });
        if !claimed {
            return self.state();
        }
        tracing::debug!("Validating stored session");

        let store = self.client.store();
        let Some(tokens) = store.get().filter(|t| !t.access.is_empty()) else {
            tracing::debug!("No stored session");
            self.set_phase(SessionPhase::Unauthenticated);
            return self.state();
        };

        let phase = match self.client.refresh(&tokens.refresh).await {
            Ok(access) => match store.set(&tokens.with_access(access)) {
                Ok(()) => {
                    tracing::info!("Restored session for user {:?}", self.user_id());
                    SessionPhase::Authenticated
                }
                Err(e) => {
                    tracing::warn!("Failed to persist refreshed token: {e}");
                    store.remove();
                    SessionPhase::Unauthenticated
                }
            },
            Err(e) => {
                tracing::warn!("Stored session is no longer valid: {e}");
                store.remove();
                SessionPhase::Unauthenticated
            }
        };

        self.set_phase(phase);
        self.state()
    }

    /// Exchange credentials for tokens and start an authenticated session
    ///
    /// On failure the phase is left as it was and the error is returned.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ClientError> {
        let tokens = match self.client.obtain_tokens(username, password).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!("Login failed for {username}: {e}");
                return Err(e);
            }
        };

        self.client.store().set(&tokens)?;
        self.set_phase(SessionPhase::Authenticated);
        tracing::info!("Logged in as {username}");
        Ok(tokens)
    }

    /// Forget the session, whatever state it was in
    pub fn logout(&self) {
        self.client.store().remove();
        self.set_phase(SessionPhase::Unauthenticated);
        tracing::info!("Logged out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medport_core::MemoryTokenStore;
    use std::sync::Arc;

    fn session_with(tokens: Option<TokenPair>) -> Session {
        let store = Arc::new(tokens.map_or_else(MemoryTokenStore::new, MemoryTokenStore::with_tokens));
        let client = ApiClient::builder()
            .base_url("http://localhost:8000/api")
            .token_store(store)
            .build()
            .unwrap();
        Session::new(client)
    }

    #[test]
    fn test_state_follows_phase() {
        assert_eq!(
            SessionState::from(SessionPhase::Checking),
            SessionState {
                is_authenticated: false,
                loading: true
            }
        );
        assert!(SessionState::from(SessionPhase::Authenticated).is_authenticated);
        assert!(!SessionState::from(SessionPhase::Unchecked).loading);
    }

    #[tokio::test]
    async fn test_initialize_without_tokens() {
        let session = session_with(None);
        assert_eq!(session.phase(), SessionPhase::Unchecked);

        let state = session.initialize().await;
        assert!(!state.is_authenticated);
        assert!(!state.loading);
        assert_eq!(session.phase(), SessionPhase::Unauthenticated);
    }

    #[test]
    fn test_logout_is_unconditional() {
        let session = session_with(Some(TokenPair::new("A", "R")));
        session.logout();
        assert_eq!(session.phase(), SessionPhase::Unauthenticated);
        assert!(session.client().store().get().is_none());

        // Logging out twice is harmless
        session.logout();
        assert_eq!(session.phase(), SessionPhase::Unauthenticated);
    }

    #[test]
    fn test_subscribers_see_changes() {
        let session = session_with(None);
        let mut phases = session.subscribe();
        session.logout();
        assert!(phases.has_changed().unwrap());
        assert_eq!(*phases.borrow_and_update(), SessionPhase::Unauthenticated);
    }
}
