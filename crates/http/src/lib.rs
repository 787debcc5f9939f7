//! MedPort HTTP client
//!
//! A single [`ApiClient`] talks to the portal's REST API. It attaches the
//! stored access token to outgoing requests and, when the server answers
//! `401 Unauthorized`, refreshes the access token and replays the request
//! once. A refresh that fails surfaces as [`ClientError::AuthExpired`] for the
//! application shell to act on.

pub mod client;

pub use client::error::ClientError;
pub use client::{ApiClient, ApiClientBuilder, Attempt};
