use medport_http::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("User ID not found. Please log in again.")]
    MissingUserId,

    #[error("Profile not found. Please create one.")]
    ProfileNotFound,
}

impl SessionError {
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Client(e) if e.is_auth_expired())
    }
}
