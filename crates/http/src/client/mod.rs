//! MedPort API client

pub mod appointments;
pub mod auth;
pub mod error;
pub mod messages;
pub mod profiles;
pub mod records;

use error::ClientError;
use medport_core::{ClientConfig, MemoryTokenStore, TokenStore};
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = concat!("medport-client/", env!("CARGO_PKG_VERSION"));

/// Which dispatch of a request is being made
///
/// Passed by value into each send so the retry decision never depends on
/// state stored on the request itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// First dispatch; a 401 may trigger one refresh
    Initial,
    /// Replay after a successful refresh; its outcome is final
    Replay,
}

impl Attempt {
    /// Whether a 401 on this attempt may be recovered by refreshing
    pub const fn may_refresh(self) -> bool {
        self.next().is_some()
    }

    /// The attempt that follows a successful refresh
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Initial => Some(Self::Replay),
            Self::Replay => None,
        }
    }
}

/// MedPort API client
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Create a new client with default configuration and in-memory token storage
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a client from loaded configuration
    pub fn from_config(
        config: &ClientConfig,
        store: Arc<dyn TokenStore>,
    ) -> Result<Self, ClientError> {
        let mut builder = Self::builder().base_url(&config.base_url).token_store(store);
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        builder.build()
    }

    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Token storage backing this client
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Create a request builder for a path relative to the base URL
    ///
    /// Authorization is added when the request is executed, not here.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url)
    }

    /// GET `path` and decode the response body
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(self.request(Method::GET, path)).await
    }

    /// POST a JSON body to `path` and decode the response body
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(self.request(Method::POST, path).json(body))
            .await
    }

    /// PUT a JSON body to `path` and decode the response body
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(self.request(Method::PUT, path).json(body))
            .await
    }

    /// Execute a request with bearer authentication and one-shot refresh
    ///
    /// A 401 on the first attempt refreshes the access token and replays the
    /// request once. The replay's outcome is returned unchanged, so a second
    /// 401 is final.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let mut attempt = Attempt::Initial;
        loop {
            let outcome = self.send_attempt(&request, attempt).await;
            match (outcome, attempt.next()) {
                (Err(error), Some(next)) if error.is_unauthorized() => {
                    self.refresh_for_replay(error).await?;
                    attempt = next;
                }
                (outcome, _) => return outcome,
            }
        }
    }

    /// Execute a request without authorization or refresh handling
    pub async fn execute_public<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let request = request.build()?;
        tracing::debug!(method = %request.method(), url = %request.url(), "Sending public request");
        let response = self.client.execute(request).await?;
        decode_response(response).await
    }

    async fn send_attempt<T: DeserializeOwned>(
        &self,
        request: &RequestBuilder,
        attempt: Attempt,
    ) -> Result<T, ClientError> {
        let mut builder = request.try_clone().ok_or_else(|| {
            ClientError::Configuration("request body cannot be replayed".to_string())
        })?;

        if let Some(tokens) = self.store.get().filter(|t| !t.access.is_empty()) {
            builder = builder.bearer_auth(&tokens.access);
        }

        let request = builder.build()?;
        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            ?attempt,
            "Sending request"
        );

        let response = self.client.execute(request).await?;
        if !attempt.may_refresh() && response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("Request rejected again after token refresh");
        }
        decode_response(response).await
    }

    /// Renew the access token so a rejected request can be replayed
    ///
    /// Without a refresh token there is nothing to renew: the store is cleared
    /// and the original 401 is returned.
    async fn refresh_for_replay(&self, rejected: ClientError) -> Result<(), ClientError> {
        let tokens = match self.store.get() {
            Some(tokens) if !tokens.refresh.is_empty() => tokens,
            _ => {
                tracing::debug!("Request unauthorized and no refresh token is stored");
                self.store.remove();
                return Err(rejected);
            }
        };

        let access = self.refresh(&tokens.refresh).await?;
        self.store.set(&tokens.with_access(access))?;
        Ok(())
    }
}

/// Decode a successful body or turn a failed one into a [`ClientError`]
async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();

    if status.is_success() {
        let bytes = response.bytes().await?;
        // 204 and other empty bodies decode as JSON null
        let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
        Ok(serde_json::from_slice(body)?)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::from_body(status, &body))
    }
}

/// Builder for ApiClient
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    store: Option<Arc<dyn TokenStore>>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ApiClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set where tokens are read from and persisted to
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        url::Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url {base_url:?}: {e}")))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new();

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        client_builder =
            client_builder.user_agent(self.user_agent.unwrap_or_else(|| USER_AGENT.to_string()));

        let client = client_builder.build()?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryTokenStore::new()));

        Ok(ApiClient {
            client,
            base_url,
            store,
        })
    }
}
