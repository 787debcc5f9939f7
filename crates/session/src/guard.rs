//! Reacting to expired sessions
//!
//! The HTTP layer reports an unrecoverable refresh failure as
//! [`ClientError::AuthExpired`]; these helpers let the session observe it and
//! drop to [`SessionPhase::Unauthenticated`] so the shell can send the user
//! back to the login step.

use crate::context::{Session, SessionPhase};
use medport_http::ClientError;
use std::future::Future;

impl Session {
    /// Inspect the outcome of an API call for an expired session
    pub fn observe<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Some(error) = result.as_ref().err().filter(|e| e.is_auth_expired()) {
            tracing::warn!("Session expired: {error}");
            self.client().store().remove();
            self.set_phase(SessionPhase::Unauthenticated);
        }
        result
    }

    /// Await an API call and observe its outcome
    pub async fn guard<T, F>(&self, call: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        self.observe(call.await)
    }
}
