//! Authentication session for MedPort clients
//!
//! The application root constructs one [`Session`] and hands it to whatever
//! needs to know who is logged in. There is no global session.

pub mod context;
pub mod dashboard;
pub mod error;
pub mod guard;

pub use context::{Session, SessionPhase, SessionState};
pub use dashboard::{Dashboard, PortalRole};
pub use error::SessionError;
