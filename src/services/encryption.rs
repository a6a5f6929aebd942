use std::fs;
use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::AppError;

/// AES-256-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;
/// GCM authentication tag length in bytes.
const TAG_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    #[error("invalid base64 payload")]
    InvalidEncoding(#[from] base64::DecodeError),
    #[error("payload too short to contain nonce and tag")]
    TooShort,
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("decrypted payload is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Seals and opens message bodies at rest.
///
/// Wire format: base64(nonce || ciphertext || tag), a fresh random nonce
/// per seal. Reads tolerate rows written before encryption was enabled.
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl EncryptionService {
    pub fn new(key: &[u8; 32]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypt a plaintext body for storage.
    pub fn seal(&self, plaintext: &str) -> Result<String, AppError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| AppError::Encryption("message encryption failed".into()))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(payload))
    }

    /// Decrypt a stored body. Fails on anything that is not a well-formed
    /// sealed payload under the current key.
    pub fn open(&self, stored: &str) -> Result<String, EncryptionError> {
        let payload = BASE64.decode(stored)?;
        if payload.len() < NONCE_LEN + TAG_LEN {
            return Err(EncryptionError::TooShort);
        }

        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| EncryptionError::DecryptionFailed)?;

        Ok(String::from_utf8(plaintext)?)
    }

    /// Decrypt a stored body, falling back to the stored text unchanged
    /// when it does not decrypt. Legacy plaintext rows and rows sealed
    /// under a rotated-away key stay readable as-is.
    pub fn open_tolerant(&self, stored: &str) -> String {
        match self.open(stored) {
            Ok(plaintext) => plaintext,
            Err(_) => stored.to_string(),
        }
    }
}

/// Load the message key from `path`, generating and persisting a new one
/// when the file does not exist yet. The file holds the base64 of 32
/// random bytes.
pub fn load_or_generate_key(path: &Path) -> anyhow::Result<[u8; 32]> {
    if path.exists() {
        let encoded = fs::read_to_string(path)?;
        let bytes = BASE64.decode(encoded.trim())?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("key file {} is not 32 bytes", path.display()))?;
        return Ok(key);
    }

    let mut key = [0u8; 32];
    use rand::RngCore;
    rand::rngs::OsRng.fill_bytes(&mut key);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, BASE64.encode(key))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    tracing::info!(path = %path.display(), "generated new message encryption key");

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> EncryptionService {
        EncryptionService::new(&[7u8; 32])
    }

    #[test]
    fn seal_then_open_round_trips() {
        let svc = service();
        let sealed = svc.seal("salut tout le monde").unwrap();
        assert_ne!(sealed, "salut tout le monde");
        assert_eq!(svc.open(&sealed).unwrap(), "salut tout le monde");
    }

    #[test]
    fn each_seal_uses_a_fresh_nonce() {
        let svc = service();
        let a = svc.seal("same body").unwrap();
        let b = svc.seal("same body").unwrap();
        assert_ne!(a, b);
        assert_eq!(svc.open(&a).unwrap(), "same body");
        assert_eq!(svc.open(&b).unwrap(), "same body");
    }

    #[test]
    fn tolerant_open_passes_plaintext_through() {
        let svc = service();
        assert_eq!(svc.open_tolerant("hello"), "hello");
        assert_eq!(svc.open_tolerant(""), "");
    }

    #[test]
    fn corrupted_payload_fails_strict_open_but_not_tolerant() {
        let svc = service();
        let sealed = svc.seal("fragile").unwrap();
        let mut bytes = BASE64.decode(&sealed).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let corrupted = BASE64.encode(bytes);

        assert!(matches!(
            svc.open(&corrupted),
            Err(EncryptionError::DecryptionFailed)
        ));
        assert_eq!(svc.open_tolerant(&corrupted), corrupted);
    }

    #[test]
    fn short_payload_is_rejected() {
        let svc = service();
        let short = BASE64.encode([0u8; 10]);
        assert!(matches!(svc.open(&short), Err(EncryptionError::TooShort)));
    }

    #[test]
    fn other_key_cannot_open() {
        let sealed = service().seal("secret").unwrap();
        let other = EncryptionService::new(&[9u8; 32]);
        assert!(other.open(&sealed).is_err());
        assert_eq!(other.open_tolerant(&sealed), sealed);
    }

    #[test]
    fn key_file_is_generated_once_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("message.key");

        let first = load_or_generate_key(&path).unwrap();
        assert!(path.exists());
        let second = load_or_generate_key(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn wrong_length_key_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("message.key");
        fs::write(&path, BASE64.encode([1u8; 16])).unwrap();

        assert!(load_or_generate_key(&path).is_err());
    }
}
