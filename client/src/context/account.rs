//! # Account
//!
//! A connected account: one seed, the controller key derived from it, and
//! a deterministic keyring per application context. The seed is the single
//! recovery artifact; everything else re-derives from it.
//!
//! Per-context keyring seeds are domain-separated from the master seed and
//! the context hash, so:
//!
//! - the same context always re-derives the same keyring, and
//! - no context's keys reveal anything about another's, or about the
//!   controller key.

use crate::config::{Network, CONTEXT_KEYRING_KDF};
use crate::crypto::derive_domain_key;
use crate::identity::{ControllerKey, Did};
use crate::keyring::Keyring;

/// An authenticated account bound to one DID.
pub struct Account {
    seed: String,
    controller: ControllerKey,
    did: Did,
}

impl Account {
    /// Create an account from its seed. The controller key and DID are
    /// derived, not stored, so the seed alone recovers everything.
    pub fn new(seed: impl Into<String>, network: Option<Network>) -> Self {
        let seed = seed.into();
        let controller = ControllerKey::from_seed(&seed);
        let did = controller.did(network);
        Self {
            seed,
            controller,
            did,
        }
    }

    /// The DID this account controls.
    pub fn did(&self) -> &Did {
        &self.did
    }

    /// The controller key. Signs registry submissions and context proofs.
    pub fn controller_key(&self) -> &ControllerKey {
        &self.controller
    }

    /// The controller's uncompressed public key hex.
    pub fn public_key_hex(&self) -> String {
        self.controller.public_key_hex()
    }

    /// The deterministic keyring for an application context.
    ///
    /// The keyring seed is `derive_key(master_seed || context_hash)` under
    /// the context-keyring domain, hex-encoded. Deterministic per
    /// (account, context), independent across contexts.
    pub fn context_keyring(&self, context_name: &str) -> Keyring {
        let context_hash = self.did.context_hash(context_name);
        let mut material = Vec::with_capacity(self.seed.len() + context_hash.len());
        material.extend_from_slice(self.seed.as_bytes());
        material.extend_from_slice(context_hash.as_bytes());
        let derived = derive_domain_key(CONTEXT_KEYRING_KDF, &material);
        Keyring::new(hex::encode(derived))
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The seed recovers the whole identity; it stays out of logs.
        write!(f, "Account(did={})", self.did)
    }
}
