//! MedPort core types and utilities

pub mod config;
pub mod error;
pub mod store;
pub mod token;
pub mod types;

pub use config::ClientConfig;
pub use error::{CoreError, CoreResult};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use token::{AccessClaims, TokenPair};
pub use types::*;
