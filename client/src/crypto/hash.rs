//! # Hashing Utilities
//!
//! The hash functions the identity layer is built on. We support three and
//! refuse to support more without a very good reason:
//!
//! - **SHA-256** — key-derivation digests. The keyring derives every key
//!   from `SHA-256("{seed}-{type}")`, and that construction is frozen:
//!   changing it re-keys every account in existence.
//! - **Keccak-256** — everything that faces the chain: context hashes,
//!   account addresses, controller-signature digests. The registry speaks
//!   EVM, so we speak Keccak (the original, not the NIST-padded SHA-3).
//! - **BLAKE3 `derive_key`** — local domain-separated key derivation
//!   (per-database keys, per-context seeds). Purpose-built for exactly this;
//!   don't prepend tags manually, that's what amateurs do.

use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::config::ADDRESS_LENGTH;

/// Compute the SHA-256 hash of the input data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Compute the Keccak-256 hash of the input data.
///
/// Keccak-256, not SHA3-256. The two differ in padding, and the chain uses
/// Keccak. Mixing them up produces hashes that are wrong everywhere and
/// obvious nowhere.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Derive a 32-byte key from `material`, domain-separated by `context`.
///
/// Uses BLAKE3's `derive_key` mode: the context string selects a distinct
/// internal IV, so keys derived for different purposes can never collide
/// even when the material is identical.
pub fn derive_domain_key(context: &str, material: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(material);
    *hasher.finalize().as_bytes()
}

/// Compute the 20-byte account address for a raw (untagged) public key:
/// the last 20 bytes of `Keccak-256(key_bytes)`.
pub fn raw_address(public_key: &[u8]) -> [u8; ADDRESS_LENGTH] {
    let digest = keccak256(public_key);
    let mut addr = [0u8; ADDRESS_LENGTH];
    addr.copy_from_slice(&digest[32 - ADDRESS_LENGTH..]);
    addr
}

/// Render a 20-byte address as EIP-55 checksummed hex (`0x`-prefixed).
///
/// The mixed-case checksum encodes a second Keccak pass over the lowercase
/// hex: a nibble of that digest >= 8 upper-cases the corresponding hex
/// character. Wallets and explorers verify it, so we produce it.
pub fn to_checksum_address(address: &[u8; ADDRESS_LENGTH]) -> String {
    let lower = hex::encode(address);
    let digest = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(2 + lower.len());
    out.push_str("0x");
    for (i, ch) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            digest[i / 2] >> 4
        } else {
            digest[i / 2] & 0x0f
        };
        if nibble >= 8 {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Serialize a JSON value with all object keys recursively sorted.
///
/// Signing inputs must be byte-stable across processes and languages, and
/// plain `serde_json::to_string` preserves insertion order. Sorting keys
/// before serializing gives every implementation the same bytes.
pub fn canonical_json(value: &serde_json::Value) -> String {
    fn sort(value: &serde_json::Value) -> serde_json::Value {
        match value {
            serde_json::Value::Object(map) => {
                let sorted: std::collections::BTreeMap<_, _> =
                    map.iter().map(|(k, v)| (k.clone(), sort(v))).collect();
                serde_json::to_value(sorted).expect("sorted map serializes")
            }
            serde_json::Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(sort).collect())
            }
            other => other.clone(),
        }
    }
    serde_json::to_string(&sort(value)).expect("canonical value serializes")
}
