//! Credential storage.
//!
//! The client only talks to storage through [`CredentialStore`]; it never
//! touches files or other persistence directly.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

/// Access/refresh token pair as returned by the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: u64,
}

/// Durable home of the credential pair.
pub trait CredentialStore: Send + Sync {
    /// Current access token, if any.
    fn access_token(&self) -> Option<String>;

    /// Current refresh token, if any.
    fn refresh_token(&self) -> Option<String>;

    /// Overwrite both tokens.
    fn store(&self, pair: &CredentialPair) -> std::io::Result<()>;

    /// Forget all credentials.
    fn clear(&self);

    /// Called after a successful refresh so credential-derived state elsewhere
    /// can be dropped.
    fn invalidate_derived(&self) {}
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Default)]
struct StoredTokens {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Process-local credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tokens: RwLock<StoredTokens>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: &CredentialPair) -> Self {
        Self {
            tokens: RwLock::new(StoredTokens {
                access_token: Some(pair.access_token.clone()),
                refresh_token: Some(pair.refresh_token.clone()),
            }),
        }
    }

    /// Store only an access token (e.g. one handed over by a login page).
    pub fn with_access_token(token: impl Into<String>) -> Self {
        Self {
            tokens: RwLock::new(StoredTokens {
                access_token: Some(token.into()),
                refresh_token: None,
            }),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn access_token(&self) -> Option<String> {
        read_lock(&self.tokens).access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        read_lock(&self.tokens).refresh_token.clone()
    }

    fn store(&self, pair: &CredentialPair) -> std::io::Result<()> {
        let mut tokens = write_lock(&self.tokens);
        tokens.access_token = Some(pair.access_token.clone());
        tokens.refresh_token = Some(pair.refresh_token.clone());
        Ok(())
    }

    fn clear(&self) {
        *write_lock(&self.tokens) = StoredTokens::default();
    }
}

/// Credential store persisted as JSON on disk.
///
/// The in-memory copy stays authoritative when a write fails.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    current: RwLock<Option<CredentialPair>>,
}

impl FileCredentialStore {
    /// Load from file if exists.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let current = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let pair: CredentialPair = serde_json::from_reader(reader)?;
            tracing::debug!(path = ?path, "Loaded stored credentials");
            Some(pair)
        } else {
            None
        };

        Ok(Self {
            path,
            current: RwLock::new(current),
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn access_token(&self) -> Option<String> {
        read_lock(&self.current).as_ref().map(|p| p.access_token.clone())
    }

    fn refresh_token(&self) -> Option<String> {
        read_lock(&self.current).as_ref().map(|p| p.refresh_token.clone())
    }

    fn store(&self, pair: &CredentialPair) -> std::io::Result<()> {
        *write_lock(&self.current) = Some(pair.clone());
        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer(writer, pair)?;
        Ok(())
    }

    fn clear(&self) {
        *write_lock(&self.current) = None;
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = ?self.path, error = %e, "Failed to remove credentials file");
            }
        }
    }
}
