// token-vault/src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Wrong fingerprint, tampered blob or truncated tag
    #[error("decryption failed: authentication tag mismatch")]
    Decryption,

    #[error("malformed token blob: {0}")]
    Encoding(String),

    #[error("decrypted token is not valid UTF-8")]
    Utf8,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VaultError>;
