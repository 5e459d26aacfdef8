// Copyright (c) 2026 VDA Network. MIT License.
// See LICENSE for details.

//! # VDA Client SDK
//!
//! The identity-and-access-control core of the VDA network: resolve a DID
//! into per-application secure contexts, each with its own keys, service
//! endpoints, and data-access permissions, and open permission-appropriate
//! databases against them.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual layers of the
//! problem:
//!
//! - **crypto** — Low-level hash and AEAD primitives. Don't roll your own.
//! - **keyring** — One seed in, a deterministic signing key, box key, and
//!   symmetric key out. Your seed, your data.
//! - **identity** — DIDs, the versioned DID document, the diff engine, and
//!   the registry client that submits minimal change-sets.
//! - **context** — Accounts, secure context configs, and the cached
//!   single-flight context resolver.
//! - **storage** — Permission routing and the database CRUD façade over an
//!   external document store.
//! - **config** — Protocol constants and identifier formats.
//!
//! ## Design Philosophy
//!
//! 1. Deterministic where possible: same seed, same keys, same hashes,
//!    on every platform.
//! 2. The permission tuple fully determines database routing. No silent
//!    fallbacks, no string-matching chains.
//! 3. Chain-facing identifiers are bit-exact. A context hash computed here
//!    matches one computed by any other implementation, or interop breaks.
//! 4. Transport concerns (retry, timeout, authentication) belong to the
//!    registry and store implementations behind the traits, never here.

pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod keyring;
pub mod storage;

pub use config::Network;
pub use context::{Account, ContextResolver, SecureContextConfig};
pub use error::{Error, Result};
pub use identity::{Did, DidClient, DidDocument, DidRegistry};
pub use keyring::Keyring;
pub use storage::{Database, DatabaseOptions, DatabasePermission, PermissionsConfig, StorageEngine};
