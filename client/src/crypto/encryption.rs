//! # AES-256-GCM Encryption
//!
//! Authenticated encryption for database records and keyring payloads.
//!
//! We use AES-256-GCM because it's an AEAD cipher: authentication and
//! encryption in one operation, no "encrypt-then-MAC" debates, hardware
//! acceleration everywhere that matters.
//!
//! ## Nonce management
//!
//! GCM is notoriously unforgiving about nonce reuse. Our strategy: random
//! 96-bit nonces from the OS CSPRNG. The birthday bound for 96-bit nonces
//! is ~2^48 messages per key; per-database keys keep any single key far
//! below that.
//!
//! ## Wire format
//!
//! [`encrypt`] returns `nonce || ciphertext` as a single `Vec<u8>`: the
//! first 12 bytes are the nonce, the rest is ciphertext plus the 16-byte
//! auth tag. [`decrypt`] expects the same layout.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use thiserror::Error;

use crate::config::{AES_NONCE_LENGTH, SYM_KEY_LENGTH};

/// Errors that can occur during encryption/decryption.
///
/// Intentionally vague. The difference between "wrong key" and "corrupted
/// ciphertext" is none of the caller's business, and certainly none of an
/// attacker's.
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("encryption failed")]
    EncryptFailed,

    #[error("decryption failed: wrong key or corrupted ciphertext")]
    DecryptFailed,

    #[error("ciphertext too short: must be at least {AES_NONCE_LENGTH} bytes")]
    CiphertextTooShort,
}

/// Encrypt plaintext with AES-256-GCM under a random nonce.
///
/// Returns `nonce || ciphertext` so the caller never has to manage the
/// nonce separately.
pub fn encrypt(key: &[u8; SYM_KEY_LENGTH], plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::EncryptFailed)?;

    let mut nonce_bytes = [0u8; AES_NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| EncryptionError::EncryptFailed)?;

    let mut out = Vec::with_capacity(AES_NONCE_LENGTH + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt data previously produced by [`encrypt`].
///
/// Fails if the key is wrong or the ciphertext has been modified in any
/// way. We don't distinguish between those cases on purpose.
pub fn decrypt(key: &[u8; SYM_KEY_LENGTH], data: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    if data.len() < AES_NONCE_LENGTH {
        return Err(EncryptionError::CiphertextTooShort);
    }

    let (nonce_bytes, ciphertext) = data.split_at(AES_NONCE_LENGTH);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::DecryptFailed)?;
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| EncryptionError::DecryptFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; SYM_KEY_LENGTH] {
        // A fixed key for testing. Never use a predictable key in
        // production. But you knew that. Right?
        let mut key = [0u8; SYM_KEY_LENGTH];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        key
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = test_key();
        let plaintext = b"the quick brown fox jumps over the lazy dog";
        let sealed = encrypt(&key, plaintext).unwrap();
        let recovered = decrypt(&key, &sealed).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn empty_plaintext_is_valid() {
        // Encrypting nothing yields just nonce + auth tag.
        let key = test_key();
        let sealed = encrypt(&key, b"").unwrap();
        assert_eq!(sealed.len(), AES_NONCE_LENGTH + 16);
        assert!(decrypt(&key, &sealed).unwrap().is_empty());
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let key = test_key();
        let sealed = encrypt(&key, b"secret").unwrap();

        let mut wrong_key = test_key();
        wrong_key[0] ^= 0xFF;
        assert!(decrypt(&wrong_key, &sealed).is_err());
    }

    #[test]
    fn modified_ciphertext_fails_decryption() {
        let key = test_key();
        let mut sealed = encrypt(&key, b"secret").unwrap();
        sealed[AES_NONCE_LENGTH] ^= 0xFF;
        assert!(decrypt(&key, &sealed).is_err());
    }

    #[test]
    fn nonces_are_unique() {
        // Two encryptions of the same message must differ in their nonce
        // prefix. If this fails, the RNG is broken and we need to burn
        // everything down.
        let key = test_key();
        let a = encrypt(&key, b"message").unwrap();
        let b = encrypt(&key, b"message").unwrap();
        assert_ne!(&a[..AES_NONCE_LENGTH], &b[..AES_NONCE_LENGTH]);
    }

    #[test]
    fn truncated_input_rejected() {
        let key = test_key();
        assert!(matches!(
            decrypt(&key, &[0u8; 4]),
            Err(EncryptionError::CiphertextTooShort)
        ));
    }
}
