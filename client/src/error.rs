//! # Error Taxonomy
//!
//! One crate-wide error enum with a variant per failure class, so callers
//! can match on *what kind* of thing went wrong instead of grepping message
//! strings:
//!
//! - [`Error::Validation`] — malformed input (bad DID, bad key, bad
//!   permission tuple). Local, never retried.
//! - [`Error::NotFound`] — a context, document, or record is absent.
//!   Distinguishable so callers can create-on-demand.
//! - [`Error::Unauthorized`] — wrong DID, missing account, or a write
//!   against a read-only database. Fatal to the operation, never downgraded.
//! - [`Error::Unsupported`] — a declared-but-unimplemented path (users-scoped
//!   sharing). Explicit, not a generic panic.
//! - [`Error::Conflict`] — revision mismatch on save. Propagated distinctly
//!   so callers can implement their own merge strategy; this crate never
//!   retries on their behalf.
//! - [`Error::Registry`] / [`Error::Store`] — upstream transport failures
//!   with the original cause attached as `source()`.
//!
//! No operation in this crate performs automatic retries. Retry policy
//! belongs to the transport implementations behind the registry and store
//! traits.

use thiserror::Error;

use crate::crypto::EncryptionError;
use crate::identity::RegistryError;
use crate::keyring::KeyringError;
use crate::storage::StoreError;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The crate-wide error type. See the module docs for the taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input: bad DID string, bad public key, invalid permission
    /// configuration. Always a caller bug, never transient.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested context, document, or record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The connected account (or lack of one) is not allowed to perform
    /// this operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A declared extension point that is intentionally not implemented.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Revision mismatch on save. The caller's copy of the record is stale.
    #[error("revision conflict: {0}")]
    Conflict(String),

    /// Key derivation or signing failed inside a keyring.
    #[error("keyring failure: {0}")]
    Keyring(#[from] KeyringError),

    /// Symmetric or asymmetric encryption failed.
    #[error("encryption failure: {0}")]
    Encryption(#[from] EncryptionError),

    /// The DID registry transport failed. The original cause is attached.
    #[error("registry failure: {0}")]
    Registry(#[from] RegistryError),

    /// The document store transport failed. The original cause is attached.
    /// NotFound and Conflict store results are mapped to their own variants
    /// before this one is reached.
    #[error("document store failure: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for Error {
    /// NotFound and Conflict carry semantic meaning for callers and are
    /// promoted to their taxonomy variants; everything else stays an
    /// upstream store failure.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Error::NotFound(what),
            StoreError::Conflict(what) => Error::Conflict(what),
            other => Error::Store(other),
        }
    }
}
