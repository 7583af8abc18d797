//! Fingerprint-bound encrypted cache for the admin auth token.
//!
//! The authoritative credential is the httpOnly `token` cookie handled by the
//! web server. This crate keeps a locally readable copy that only decrypts in
//! the environment it was written from.

pub mod cipher;
pub mod error;
pub mod fingerprint;
pub mod storage;

pub use cipher::{KeyCache, KeyDeriver, TokenCipher};
pub use error::{Result, VaultError};
pub use fingerprint::{
    Environment, FingerprintProvider, HostEnvironment, SessionValidator, StaticEnvironment,
};
pub use storage::{
    FileStore, KeyValueStore, MemoryStore, SecureTokenStorage, StoredToken, SESSION_KEY,
    TOKEN_KEY,
};
