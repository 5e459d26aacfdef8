//! # Identity Module
//!
//! Sovereign identity for the VDA network. Every participant is a
//! secp256k1 controller key, from which we derive an EIP-55 checksummed
//! address and a `did:vda` identifier.
//!
//! The identity stack is layered:
//!
//! 1. **ControllerKey** — Raw secp256k1 key material. Owns the registry
//!    entry, signs proofs, proves ownership.
//! 2. **Did** — The `did:vda:<network>:<address>` identifier users share.
//!    Lower-cased canonical form is what every hash and lookup uses.
//! 3. **DidDocument** — The versioned, context-partitioned key/service
//!    registry: base identity keys plus per-application context entries
//!    addressed only by their hash.
//! 4. **DidClient / DidRegistry** — The fetch-diff-submit persistence
//!    path. Only minimal add/revoke change-sets ever reach the chain.

pub mod client;
pub mod did;
pub mod diff;
pub mod document;
pub mod registry;

pub use client::DidClient;
pub use did::{
    address_from_public_key, validate_uncompressed_public_key, verify_controller_signature,
    ControllerKey, Did,
};
pub use diff::{DocumentDelta, DocumentDiff};
pub use document::{
    ContextEndpoints, ContextKeyType, DidDocument, DocumentAttributes, DocumentProof, Service,
    ServiceType, VerificationMethod,
};
pub use registry::{DidRegistry, MemoryRegistry, RegistryError};
