//! Durable storage for the session's token pair
//!
//! A store holds at most one [`TokenPair`]. Reads fail soft: unreadable or
//! malformed state is reported as "no tokens" so a corrupted store never
//! blocks the user from logging in again. The user id is not stored at all;
//! it is decoded from whatever access token is current.

use crate::error::CoreResult;
use crate::token::TokenPair;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// File name used by [`FileTokenStore`] inside the data directory
pub const TOKENS_FILE: &str = "tokens.json";

/// Key-value storage for the current session's credentials
pub trait TokenStore: Send + Sync {
    /// Current token pair, or `None` when absent or unreadable
    fn get(&self) -> Option<TokenPair>;

    /// Replace the stored token pair
    fn set(&self, tokens: &TokenPair) -> CoreResult<()>;

    /// Forget all session state
    fn remove(&self);

    /// Id of the logged-in user, decoded from the current access token
    fn user_id(&self) -> Option<u64> {
        let tokens = self.get()?;
        match tokens.claims() {
            Ok(claims) => Some(claims.user_id),
            Err(e) => {
                tracing::warn!("Stored access token has no readable user id: {e}");
                None
            }
        }
    }

    /// Merge a freshly issued access token into the stored pair
    ///
    /// Returns the updated pair, or `None` if nothing was stored to merge into.
    fn set_access(&self, access: &str) -> CoreResult<Option<TokenPair>> {
        let Some(tokens) = self.get() else {
            return Ok(None);
        };
        let updated = tokens.with_access(access);
        self.set(&updated)?;
        Ok(Some(updated))
    }
}

/// In-process token store
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a pair
    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<TokenPair>> {
        // A poisoned lock still holds a consistent Option
        self.tokens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<TokenPair> {
        self.slot().clone()
    }

    fn set(&self, tokens: &TokenPair) -> CoreResult<()> {
        *self.slot() = Some(tokens.clone());
        Ok(())
    }

    fn remove(&self) {
        *self.slot() = None;
    }
}

/// Token store persisted as JSON on disk
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    /// Store tokens in `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store tokens in the standard file inside `data_dir`
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(TOKENS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<TokenPair> {
        let _guard = self.guard();
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read tokens from {}: {e}", self.path.display());
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                tracing::warn!("Failed to parse tokens from {}: {e}", self.path.display());
                None
            }
        }
    }

    fn set(&self, tokens: &TokenPair) -> CoreResult<()> {
        let _guard = self.guard();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(tokens)?;

        // Readers see either the old pair or the new one, never a partial write
        let staging = self.path.with_extension("json.tmp");
        write_private(&staging, content.as_bytes())?;
        if let Err(e) = std::fs::rename(&staging, &self.path) {
            let _ = std::fs::remove_file(&staging);
            return Err(e.into());
        }
        tracing::debug!("Stored tokens in {}", self.path.display());
        Ok(())
    }

    fn remove(&self) {
        let _guard = self.guard();
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed tokens from {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {}: {e}", self.path.display()),
        }
    }
}

/// Write `content` to a fresh file only the current user can read
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;

    // The mode above only applies when the file is created
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(content)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::test_support::token_with_payload;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get(), None);

        let tokens = TokenPair::new("A", "R");
        store.set(&tokens).unwrap();
        assert_eq!(store.get(), Some(tokens));

        store.remove();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::in_dir(dir.path().join("nested"));

        let tokens = TokenPair::new("A", "R");
        store.set(&tokens).unwrap();
        assert_eq!(store.get(), Some(tokens.clone()));

        // A second handle on the same file sees the persisted pair
        let reopened = FileTokenStore::in_dir(dir.path().join("nested"));
        assert_eq!(reopened.get(), Some(tokens));

        reopened.remove();
        assert_eq!(store.get(), None);
        // Removing twice is harmless
        store.remove();
    }

    #[cfg(unix)]
    #[test]
    fn test_token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::in_dir(dir.path());

        // A pre-existing world-readable file is tightened on the next write
        std::fs::write(store.path(), "{}").unwrap();
        std::fs::set_permissions(store.path(), std::fs::Permissions::from_mode(0o644)).unwrap();

        store.set(&TokenPair::new("A", "R")).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0, "token file mode {:o}", mode & 0o777);
        assert_eq!(store.get(), Some(TokenPair::new("A", "R")));
        assert!(!dir.path().join("tokens.json.tmp").exists());
    }

    #[test]
    fn test_file_store_fails_soft_on_corruption() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::in_dir(dir.path());
        std::fs::write(store.path(), "{ not json").unwrap();

        assert_eq!(store.get(), None);
        assert_eq!(store.user_id(), None);
    }

    #[test]
    fn test_user_id_follows_current_access_token() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.user_id(), None);

        let first = token_with_payload(&json!({ "user_id": 3 }));
        store.set(&TokenPair::new(first, "R")).unwrap();
        assert_eq!(store.user_id(), Some(3));

        let second = token_with_payload(&json!({ "user_id": 9 }));
        store.set_access(&second).unwrap();
        assert_eq!(store.user_id(), Some(9));
    }

    #[test]
    fn test_set_access_requires_existing_pair() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.set_access("new").unwrap(), None);
        assert_eq!(store.get(), None);

        store.set(&TokenPair::new("old", "R")).unwrap();
        let updated = store.set_access("new").unwrap();
        assert_eq!(updated, Some(TokenPair::new("new", "R")));
        assert_eq!(store.get(), updated);
    }

    #[test]
    fn test_opaque_access_token_has_no_user_id() {
        let store = MemoryTokenStore::with_tokens(TokenPair::new("opaque", "R"));
        assert_eq!(store.user_id(), None);
    }
}
