//! # Keyring
//!
//! The deterministic key-derivation and signing/encryption facility bound
//! to one seed. A [`Keyring`] is what an application context actually
//! holds: its published public keys, its record-signing key, its database
//! encryption keys, and its half of any shared-secret handshake.
//!
//! All of it flows from [`KeyMaterial::derive`]: same seed, same keys,
//! always, on every platform. The only nondeterministic operation is
//! [`Keyring::asym_encrypt`], which generates a fresh ephemeral sender key
//! per message, as it must.
//!
//! Keyrings are pure and stateless per call; share them across tasks
//! freely, no synchronization required.

pub mod derivation;

pub use derivation::KeyMaterial;

use ed25519_dalek::{Signature, Signer, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::config::{
    ASYM_BOX_KDF, ASYM_KEY_LENGTH, DATABASE_KEY_KDF, SHARED_KEY_KDF, SIGNATURE_LENGTH,
    SYM_KEY_LENGTH,
};
use crate::crypto::{decrypt, derive_domain_key, encrypt, raw_address, EncryptionError};

/// Errors from keyring operations that consume untrusted input.
///
/// Signing itself cannot fail; these cover malformed counterparty material.
#[derive(Debug, Error)]
pub enum KeyringError {
    #[error("asymmetric payload too short to carry an ephemeral key")]
    PayloadTooShort,

    #[error(transparent)]
    Encryption(#[from] EncryptionError),
}

/// A public key in the two encodings the document layer publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyInfo {
    /// `0x`-prefixed hex, as embedded in verification methods.
    pub hex: String,
    /// Base58, as used in compact wire formats.
    pub base58: String,
}

impl PublicKeyInfo {
    fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            hex: format!("0x{}", hex::encode(bytes)),
            base58: bs58::encode(bytes).into_string(),
        }
    }
}

/// The published half of a keyring: sign and asym public keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyringPublicKeys {
    pub sign: PublicKeyInfo,
    pub asym: PublicKeyInfo,
}

/// The deterministic signing/encryption facility bound to one seed.
pub struct Keyring {
    seed: String,
    material: KeyMaterial,
}

impl Keyring {
    /// Build a keyring from a seed string.
    pub fn new(seed: impl Into<String>) -> Self {
        let seed = seed.into();
        let material = KeyMaterial::derive(&seed);
        Self { seed, material }
    }

    /// The published sign + asym public keys, hex and base58 encoded.
    pub fn public_keys(&self) -> KeyringPublicKeys {
        KeyringPublicKeys {
            sign: PublicKeyInfo::from_bytes(&self.material.sign_public()),
            asym: PublicKeyInfo::from_bytes(&self.material.asym_public()),
        }
    }

    /// The Ethereum-style address of the sign public key: last 20 bytes of
    /// its Keccak-256, lower-cased `0x` hex. This is the form bound into
    /// context ownership proofs.
    pub fn sign_public_address(&self) -> String {
        format!("0x{}", hex::encode(raw_address(&self.material.sign_public())))
    }

    // -- Signing ------------------------------------------------------------

    /// Sign arbitrary bytes with the Ed25519 sign key. Returns the 64-byte
    /// signature as `0x` hex. Deterministic per (key, message) pair.
    pub fn sign(&self, data: &[u8]) -> String {
        let signature = self.material.sign.sign(data);
        format!("0x{}", hex::encode(signature.to_bytes()))
    }

    /// Verify a signature produced by this keyring's sign key.
    pub fn verify(&self, data: &[u8], signature_hex: &str) -> bool {
        let public = PublicKeyInfo::from_bytes(&self.material.sign_public());
        verify_signature(&public.hex, data, signature_hex)
    }

    // -- Symmetric encryption ----------------------------------------------

    /// Encrypt with this keyring's symmetric key. `nonce || ciphertext`.
    pub fn sym_encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        encrypt(&self.material.sym, plaintext)
    }

    /// Decrypt data sealed by [`sym_encrypt`](Self::sym_encrypt).
    pub fn sym_decrypt(&self, data: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        decrypt(&self.material.sym, data)
    }

    /// Derive the symmetric key for a named database. Each database gets an
    /// independent key with no derivation table to store: the name is the
    /// KDF domain, the seed is the material.
    pub fn database_key(&self, database_name: &str) -> [u8; SYM_KEY_LENGTH] {
        let context = format!("{DATABASE_KEY_KDF}/{database_name}");
        derive_domain_key(&context, self.seed.as_bytes())
    }

    // -- Asymmetric encryption ---------------------------------------------

    /// Encrypt for a counterparty's X25519 public key.
    ///
    /// Ephemeral-static: a fresh sender keypair per message, Diffie-Hellman
    /// against the recipient, KDF, then AES-256-GCM. Wire format:
    /// `ephemeral_pub (32) || nonce || ciphertext`.
    pub fn asym_encrypt(
        &self,
        plaintext: &[u8],
        recipient_public: &[u8; ASYM_KEY_LENGTH],
    ) -> Result<Vec<u8>, EncryptionError> {
        let ephemeral = StaticSecret::random_from_rng(OsRng);
        let ephemeral_public = PublicKey::from(&ephemeral).to_bytes();
        let shared = ephemeral.diffie_hellman(&PublicKey::from(*recipient_public));

        let key = box_key(shared.as_bytes(), &ephemeral_public, recipient_public);
        let sealed = encrypt(&key, plaintext)?;

        let mut out = Vec::with_capacity(ASYM_KEY_LENGTH + sealed.len());
        out.extend_from_slice(&ephemeral_public);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Decrypt a payload produced by a counterparty's
    /// [`asym_encrypt`](Self::asym_encrypt) against our asym public key.
    pub fn asym_decrypt(&self, data: &[u8]) -> Result<Vec<u8>, KeyringError> {
        if data.len() < ASYM_KEY_LENGTH {
            return Err(KeyringError::PayloadTooShort);
        }
        let (ephemeral_bytes, sealed) = data.split_at(ASYM_KEY_LENGTH);
        let mut ephemeral_public = [0u8; ASYM_KEY_LENGTH];
        ephemeral_public.copy_from_slice(ephemeral_bytes);

        let shared = self
            .material
            .asym
            .diffie_hellman(&PublicKey::from(ephemeral_public));
        let key = box_key(shared.as_bytes(), &ephemeral_public, &self.material.asym_public());

        Ok(decrypt(&key, sealed)?)
    }

    // -- Shared-key precomputation -----------------------------------------

    /// The initiator's half of a shared-key precomputation against a
    /// counterparty's asym public key. `a.build_shared_key_start(b_pub)`
    /// equals `b.build_shared_key_end(a_pub)`.
    pub fn build_shared_key_start(
        &self,
        counterparty_public: &[u8; ASYM_KEY_LENGTH],
    ) -> [u8; SYM_KEY_LENGTH] {
        let shared = self
            .material
            .asym
            .diffie_hellman(&PublicKey::from(*counterparty_public));
        shared_key(shared.as_bytes(), &self.material.asym_public(), counterparty_public)
    }

    /// The responder's half. See
    /// [`build_shared_key_start`](Self::build_shared_key_start).
    pub fn build_shared_key_end(
        &self,
        counterparty_public: &[u8; ASYM_KEY_LENGTH],
    ) -> [u8; SYM_KEY_LENGTH] {
        let shared = self
            .material
            .asym
            .diffie_hellman(&PublicKey::from(*counterparty_public));
        shared_key(shared.as_bytes(), counterparty_public, &self.material.asym_public())
    }
}

impl std::fmt::Debug for Keyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The seed IS the account. It does not appear in logs, ever.
        write!(f, "Keyring({:?})", self.material)
    }
}

/// Verify a hex signature against a hex-encoded Ed25519 public key.
///
/// Returns `false` for any malformed input: the caller asked "is this
/// signature valid" and malformed is a species of invalid.
pub fn verify_signature(public_key_hex: &str, data: &[u8], signature_hex: &str) -> bool {
    let Some(public) = decode_fixed::<32>(public_key_hex) else {
        return false;
    };
    let Some(sig_bytes) = decode_fixed::<SIGNATURE_LENGTH>(signature_hex) else {
        return false;
    };
    let Ok(verifying) = VerifyingKey::from_bytes(&public) else {
        return false;
    };
    verifying
        .verify(data, &Signature::from_bytes(&sig_bytes))
        .is_ok()
}

/// Decode `0x`-optional hex into a fixed-size array.
pub(crate) fn decode_fixed<const N: usize>(input: &str) -> Option<[u8; N]> {
    let stripped = input.strip_prefix("0x").unwrap_or(input);
    let bytes = hex::decode(stripped).ok()?;
    if bytes.len() != N {
        return None;
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Some(out)
}

/// KDF for the ephemeral-static box: binds the shared point to both public
/// keys so transplanting a ciphertext between key pairs breaks the key.
fn box_key(shared: &[u8], ephemeral_public: &[u8; 32], recipient_public: &[u8; 32]) -> [u8; 32] {
    let mut material = Vec::with_capacity(96);
    material.extend_from_slice(shared);
    material.extend_from_slice(ephemeral_public);
    material.extend_from_slice(recipient_public);
    derive_domain_key(ASYM_BOX_KDF, &material)
}

/// KDF for the precomputed shared key. The (initiator, responder) public
/// key ordering is fixed so both halves agree.
fn shared_key(shared: &[u8], initiator_public: &[u8; 32], responder_public: &[u8; 32]) -> [u8; 32] {
    let mut material = Vec::with_capacity(96);
    material.extend_from_slice(shared);
    material.extend_from_slice(initiator_public);
    material.extend_from_slice(responder_public);
    derive_domain_key(SHARED_KEY_KDF, &material)
}
