//! Authentication API client methods

use super::{ApiClient, ClientError};
use medport_core::{Registration, ServerMessage, TokenPair};
use reqwest::Method;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct CredentialsRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

impl ApiClient {
    /// Exchange credentials for a token pair
    ///
    /// The pair is returned, not stored; persisting it is the session's job.
    pub async fn obtain_tokens(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenPair, ClientError> {
        let request = self
            .request(Method::POST, "/token/")
            .json(&CredentialsRequest { username, password });
        self.execute_public(request).await
    }

    /// Trade a refresh token for a new access token
    ///
    /// Any failure means the session cannot be renewed: stored tokens are
    /// cleared and [`ClientError::AuthExpired`] is returned.
    pub async fn refresh(&self, refresh: &str) -> Result<String, ClientError> {
        let request = self
            .request(Method::POST, "/token/refresh/")
            .json(&RefreshRequest { refresh });

        match self.execute_public::<RefreshResponse>(request).await {
            Ok(response) => {
                tracing::info!("Access token refreshed");
                Ok(response.access)
            }
            Err(e) => {
                tracing::warn!("Token refresh failed, clearing session: {e}");
                self.store().remove();
                Err(ClientError::AuthExpired(e.to_string()))
            }
        }
    }

    /// Create a user account
    pub async fn register(&self, registration: &Registration) -> Result<ServerMessage, ClientError> {
        self.post("/register/", registration).await
    }
}
