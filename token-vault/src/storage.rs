// token-vault/src/storage.rs
use crate::cipher::TokenCipher;
use crate::error::{Result, VaultError};
use crate::fingerprint::FingerprintProvider;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Encrypted token blob
pub const TOKEN_KEY: &str = "zenow_secure_auth";
/// Fingerprint the blob was written under
pub const SESSION_KEY: &str = "zenow_session";

/// String key/value persistence, shaped like browser local storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Process-lifetime store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object on disk
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn modify<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| VaultError::Storage("file store lock poisoned".into()))?;
        let mut entries = self.read_all()?;
        f(&mut entries);
        self.write_all(&entries)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| VaultError::Storage("file store lock poisoned".into()))?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.modify(|entries| {
            entries.remove(key);
        })
    }
}

/// Result of looking up the cached token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredToken {
    Present(String),
    /// Nothing stored, or only half of the pair
    Missing,
    /// Stored under a different fingerprint; state has been purged
    FingerprintMismatch,
    /// Fingerprint matched but the blob would not decrypt; state has been purged
    Undecryptable,
}

impl StoredToken {
    pub fn into_token(self) -> Option<String> {
        match self {
            StoredToken::Present(token) => Some(token),
            _ => None,
        }
    }
}

/// Encrypted token cache bound to the current environment fingerprint.
///
/// The blob and the fingerprint it was written under are stored side by side
/// so a mismatch can be detected without attempting decryption.
pub struct SecureTokenStorage<S, P> {
    store: S,
    provider: P,
    cipher: TokenCipher,
}

impl<S: KeyValueStore, P: FingerprintProvider> SecureTokenStorage<S, P> {
    pub fn new(store: S, provider: P) -> Self {
        Self::with_cipher(store, provider, TokenCipher::new())
    }

    pub fn with_cipher(store: S, provider: P, cipher: TokenCipher) -> Self {
        Self {
            store,
            provider,
            cipher,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        let fingerprint = self.provider.session_id();
        let blob = self.cipher.encrypt(token, &fingerprint)?;

        self.store.set(TOKEN_KEY, &blob)?;
        self.store.set(SESSION_KEY, &fingerprint)?;

        tracing::info!("Stored encrypted auth token");
        Ok(())
    }

    pub fn lookup(&self) -> Result<StoredToken> {
        let session = self.store.get(SESSION_KEY)?;
        let blob = self.store.get(TOKEN_KEY)?;

        let (session, blob) = match (session, blob) {
            (Some(session), Some(blob)) => (session, blob),
            (None, None) => return Ok(StoredToken::Missing),
            _ => {
                tracing::debug!("Found half of the token pair, clearing it");
                self.clear_token()?;
                return Ok(StoredToken::Missing);
            }
        };

        let current = self.provider.session_id();
        if session != current {
            tracing::warn!("Session fingerprint changed, discarding cached token");
            self.clear_token()?;
            return Ok(StoredToken::FingerprintMismatch);
        }

        match self.cipher.decrypt(&blob, &current) {
            Ok(token) => Ok(StoredToken::Present(token)),
            Err(e) => {
                tracing::warn!("Cached token could not be decrypted: {}", e);
                self.clear_token()?;
                Ok(StoredToken::Undecryptable)
            }
        }
    }

    /// The decrypted token, or `None` for any failure
    pub fn get_token(&self) -> Option<String> {
        match self.lookup() {
            Ok(found) => found.into_token(),
            Err(e) => {
                tracing::error!("Error reading cached token: {}", e);
                None
            }
        }
    }

    /// Whether a token is stored for the current fingerprint. Does not decrypt.
    pub fn has_token(&self) -> bool {
        self.stored_for_current().unwrap_or_else(|e| {
            tracing::error!("Error checking cached token: {}", e);
            false
        })
    }

    fn stored_for_current(&self) -> Result<bool> {
        let session = match self.store.get(SESSION_KEY)? {
            Some(session) => session,
            None => return Ok(false),
        };
        if self.store.get(TOKEN_KEY)?.is_none() {
            return Ok(false);
        }
        Ok(session == self.provider.session_id())
    }

    pub fn clear_token(&self) -> Result<()> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(SESSION_KEY)?;
        tracing::debug!("Cleared cached auth token");
        Ok(())
    }
}
