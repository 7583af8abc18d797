// token-vault/src/cipher.rs
//! Fingerprint-derived AES-256-GCM encryption of the auth token.
//!
//! Blob format: `base64(nonce (12 bytes) || ciphertext || tag (16 bytes))`.

use crate::error::{Result, VaultError};
use crate::fingerprint::simple_hash;
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use ring::aead;
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const KEY_LEN: usize = 32;

pub const DEFAULT_ITERATIONS: u32 = 100_000;
pub const DEFAULT_SALT: &[u8] = b"zenow-token-vault-salt-v1";

const KEY_MATERIAL_LEN: usize = 32;
const KEY_MATERIAL_ROUNDS: usize = 5;

/// Stretch a short fingerprint into 32 characters of PBKDF2 input.
///
/// Five rounds of appending the hash of everything so far, truncated to 32
/// characters and right-padded with `'0'` if still short.
pub fn derive_key_material(fingerprint: &str) -> String {
    let mut material = fingerprint.to_string();
    for _ in 0..KEY_MATERIAL_ROUNDS {
        let round = simple_hash(&material);
        material.push_str(&round);
    }

    let mut truncated: String = material.chars().take(KEY_MATERIAL_LEN).collect();
    let short_by = KEY_MATERIAL_LEN.saturating_sub(truncated.chars().count());
    truncated.extend(std::iter::repeat('0').take(short_by));
    truncated
}

/// AES-256-GCM key bound to one fingerprint
pub struct TokenKey {
    key: aead::LessSafeKey,
}

impl fmt::Debug for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenKey(***)")
    }
}

/// PBKDF2-HMAC-SHA256 parameters
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    iterations: u32,
    salt: Vec<u8>,
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            salt: DEFAULT_SALT.to_vec(),
        }
    }
}

impl KeyDeriver {
    pub fn new(iterations: u32, salt: impl Into<Vec<u8>>) -> Self {
        Self {
            iterations: iterations.max(1),
            salt: salt.into(),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn derive(&self, fingerprint: &str) -> Result<TokenKey> {
        let material = Zeroizing::new(derive_key_material(fingerprint));
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2::pbkdf2_hmac::<Sha256>(
            material.as_bytes(),
            &self.salt,
            self.iterations,
            &mut bytes[..],
        );

        let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, &bytes[..])
            .map_err(|_| VaultError::KeyDerivation("failed to create AES-256-GCM key".into()))?;

        Ok(TokenKey {
            key: aead::LessSafeKey::new(unbound),
        })
    }
}

/// Derived keys by fingerprint, so PBKDF2 runs once per fingerprint
#[derive(Debug, Default)]
pub struct KeyCache {
    keys: DashMap<String, Arc<TokenKey>>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_derive(&self, fingerprint: &str, deriver: &KeyDeriver) -> Result<Arc<TokenKey>> {
        if let Some(key) = self.keys.get(fingerprint) {
            return Ok(Arc::clone(key.value()));
        }

        tracing::debug!(
            "Deriving token key ({} PBKDF2 iterations)",
            deriver.iterations()
        );
        let key = Arc::new(deriver.derive(fingerprint)?);
        self.keys.insert(fingerprint.to_string(), Arc::clone(&key));
        Ok(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&self) {
        self.keys.clear();
    }
}

#[derive(Debug, Default)]
pub struct TokenCipher {
    deriver: KeyDeriver,
    cache: KeyCache,
}

impl TokenCipher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deriver(deriver: KeyDeriver) -> Self {
        Self {
            deriver,
            cache: KeyCache::new(),
        }
    }

    pub fn cache(&self) -> &KeyCache {
        &self.cache
    }

    /// Encrypt `token` under the key for `fingerprint`. Every call uses a fresh nonce.
    pub fn encrypt(&self, token: &str, fingerprint: &str) -> Result<String> {
        let key = self.cache.get_or_derive(fingerprint, &self.deriver)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = aead::Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = token.as_bytes().to_vec();
        key.key
            .seal_in_place_append_tag(nonce, aead::Aad::empty(), &mut in_out)
            .map_err(|_| VaultError::Encryption("AES-256-GCM encryption failed".into()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + in_out.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&in_out);

        Ok(base64::encode(blob))
    }

    /// Decrypt a blob produced by [`TokenCipher::encrypt`] with the same fingerprint.
    pub fn decrypt(&self, blob: &str, fingerprint: &str) -> Result<String> {
        let bytes = base64::decode(blob.trim())
            .map_err(|e| VaultError::Encoding(format!("invalid base64: {}", e)))?;

        if bytes.len() < NONCE_LEN + TAG_LEN {
            return Err(VaultError::Encoding(format!(
                "blob too short: {} bytes (minimum {})",
                bytes.len(),
                NONCE_LEN + TAG_LEN
            )));
        }

        let (nonce_bytes, sealed) = bytes.split_at(NONCE_LEN);
        let nonce = aead::Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| VaultError::Encoding("invalid nonce".into()))?;

        let key = self.cache.get_or_derive(fingerprint, &self.deriver)?;

        let mut in_out = Zeroizing::new(sealed.to_vec());
        let plaintext = key
            .key
            .open_in_place(nonce, aead::Aad::empty(), &mut in_out[..])
            .map_err(|_| VaultError::Decryption)?;

        String::from_utf8(plaintext.to_vec()).map_err(|_| VaultError::Utf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiJhZG1pbiIsImV4cCI6NDEwMjQ0NDgwMH0.sig";

    // Keeps the suite fast; the default iteration count has its own test
    fn fast_cipher() -> TokenCipher {
        TokenCipher::with_deriver(KeyDeriver::new(1_000, DEFAULT_SALT))
    }

    #[test]
    fn test_key_material_is_32_chars() {
        for fp in ["", "a", "k3x9p2", "a-much-longer-fingerprint-than-usual-0123456789"] {
            assert_eq!(derive_key_material(fp).chars().count(), 32, "fingerprint {:?}", fp);
        }
    }

    #[test]
    fn test_key_material_is_deterministic() {
        assert_eq!(derive_key_material("k3x9p2"), derive_key_material("k3x9p2"));
        assert_ne!(derive_key_material("k3x9p2"), derive_key_material("k3x9p3"));
        assert!(derive_key_material("k3x9p2").starts_with("k3x9p2"));
    }

    #[test]
    fn test_roundtrip_same_fingerprint() {
        let cipher = fast_cipher();
        let blob = cipher.encrypt(TOKEN, "k3x9p2").unwrap();
        assert_eq!(cipher.decrypt(&blob, "k3x9p2").unwrap(), TOKEN);
    }

    #[test]
    fn test_roundtrip_with_default_iterations() {
        let cipher = TokenCipher::new();
        let blob = cipher.encrypt(TOKEN, "1ab2cd").unwrap();
        assert_eq!(cipher.decrypt(&blob, "1ab2cd").unwrap(), TOKEN);
    }

    #[test]
    fn test_other_fingerprint_cannot_decrypt() {
        let cipher = fast_cipher();
        let blob = cipher.encrypt(TOKEN, "k3x9p2").unwrap();
        let result = cipher.decrypt(&blob, "zz81qa");
        assert!(matches!(result, Err(VaultError::Decryption)));
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let cipher = fast_cipher();
        let a = cipher.encrypt(TOKEN, "k3x9p2").unwrap();
        let b = cipher.encrypt(TOKEN, "k3x9p2").unwrap();
        assert_ne!(a, b);

        let raw = base64::decode(&a).unwrap();
        assert_eq!(raw.len(), NONCE_LEN + TOKEN.len() + TAG_LEN);
    }

    #[test]
    fn test_tampered_blob_fails() {
        let cipher = fast_cipher();
        let blob = cipher.encrypt(TOKEN, "k3x9p2").unwrap();
        let mut raw = base64::decode(&blob).unwrap();
        raw[NONCE_LEN] ^= 0x01;
        let tampered = base64::encode(raw);
        assert!(matches!(
            cipher.decrypt(&tampered, "k3x9p2"),
            Err(VaultError::Decryption)
        ));
    }

    #[test]
    fn test_garbage_blob_is_encoding_error() {
        let cipher = fast_cipher();
        assert!(matches!(
            cipher.decrypt("not base64 at all!", "k3x9p2"),
            Err(VaultError::Encoding(_))
        ));
        assert!(matches!(
            cipher.decrypt(&base64::encode([0u8; 20]), "k3x9p2"),
            Err(VaultError::Encoding(_))
        ));
    }

    #[test]
    fn test_empty_token_roundtrips() {
        let cipher = fast_cipher();
        let blob = cipher.encrypt("", "k3x9p2").unwrap();
        assert_eq!(cipher.decrypt(&blob, "k3x9p2").unwrap(), "");
    }

    #[test]
    fn test_keys_cached_per_fingerprint() {
        let cipher = fast_cipher();
        assert!(cipher.cache().is_empty());

        cipher.encrypt(TOKEN, "k3x9p2").unwrap();
        cipher.encrypt(TOKEN, "k3x9p2").unwrap();
        assert_eq!(cipher.cache().len(), 1);

        cipher.encrypt(TOKEN, "zz81qa").unwrap();
        assert_eq!(cipher.cache().len(), 2);

        cipher.cache().clear();
        assert!(cipher.cache().is_empty());
    }

    #[test]
    fn test_different_salt_cannot_decrypt() {
        let a = fast_cipher();
        let b = TokenCipher::with_deriver(KeyDeriver::new(1_000, b"another-salt".to_vec()));
        let blob = a.encrypt(TOKEN, "k3x9p2").unwrap();
        assert!(matches!(b.decrypt(&blob, "k3x9p2"), Err(VaultError::Decryption)));
    }

    #[test]
    fn test_key_debug_is_masked() {
        let key = KeyDeriver::new(1, DEFAULT_SALT).derive("k3x9p2").unwrap();
        assert_eq!(format!("{:?}", key), "TokenKey(***)");
    }
}
