//! # Deterministic Key Derivation
//!
//! One seed string in, three keys out, the same three keys every time on
//! every platform. There is no randomness anywhere in this module: accounts
//! are recovered from nothing but their seed, so a single flipped bit of
//! nondeterminism here means someone's data is gone.
//!
//! For each key type `t` in `sign`, `asym`, `sym`:
//!
//! ```text
//! digest = SHA-256("{seed}-{t}")
//! ```
//!
//! The digest feeds Ed25519 keypair generation for `sign`, becomes the
//! X25519 static secret for `asym`, and the `sym` derivation's X25519
//! secret bytes are used directly as the AES-256 key. The three digests are
//! independent by construction; compromising one key type tells you nothing
//! about the others.

use ed25519_dalek::SigningKey;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::config::{KEY_TYPE_ASYM, KEY_TYPE_SIGN, KEY_TYPE_SYM, SYM_KEY_LENGTH};
use crate::crypto::sha256;

/// The full set of keys derived from one seed: an Ed25519 signing keypair,
/// an X25519 box keypair, and a 32-byte symmetric key.
///
/// Holds secret material. The `Debug` impl prints public halves only.
pub struct KeyMaterial {
    pub(crate) sign: SigningKey,
    pub(crate) asym: StaticSecret,
    pub(crate) sym: [u8; SYM_KEY_LENGTH],
}

impl KeyMaterial {
    /// Derive all three keys from a seed string. Bit-for-bit deterministic:
    /// same seed, same keys, always.
    pub fn derive(seed: &str) -> Self {
        let sign = SigningKey::from_bytes(&type_digest(seed, KEY_TYPE_SIGN));
        let asym = StaticSecret::from(type_digest(seed, KEY_TYPE_ASYM));
        let sym = StaticSecret::from(type_digest(seed, KEY_TYPE_SYM)).to_bytes();
        Self { sign, asym, sym }
    }

    /// The Ed25519 verifying (public) key bytes.
    pub fn sign_public(&self) -> [u8; 32] {
        self.sign.verifying_key().to_bytes()
    }

    /// The X25519 public key bytes.
    pub fn asym_public(&self) -> [u8; 32] {
        PublicKey::from(&self.asym).to_bytes()
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print secret key material in debug output. Not even
        // "partially" -- a partial leak is still a leak.
        write!(
            f,
            "KeyMaterial(sign_pub={}, asym_pub={})",
            hex::encode(self.sign_public()),
            hex::encode(self.asym_public())
        )
    }
}

/// The per-type derivation digest: `SHA-256("{seed}-{key_type}")`.
fn type_digest(seed: &str, key_type: &str) -> [u8; 32] {
    sha256(format!("{seed}-{key_type}").as_bytes())
}
