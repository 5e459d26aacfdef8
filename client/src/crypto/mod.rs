//! # Cryptographic Primitives
//!
//! The foundation of everything security-related in the client. Every
//! derivation digest, every context hash, every encrypted record flows
//! through here.
//!
//! We deliberately chose boring, well-audited cryptography:
//!
//! - **SHA-256** for key-derivation digests.
//! - **Keccak-256** for chain-facing hashes and addresses.
//! - **BLAKE3** for local domain-separated key derivation.
//! - **AES-256-GCM** for symmetric encryption.
//!
//! Everything here is a thin, type-safe wrapper around audited
//! implementations. If you're tempted to optimize these functions, please
//! reconsider. Then reconsider again.

pub mod encryption;
pub mod hash;

pub use encryption::{decrypt, encrypt, EncryptionError};
pub use hash::{
    canonical_json, derive_domain_key, keccak256, raw_address, sha256, to_checksum_address,
};
