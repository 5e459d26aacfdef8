//! # DID Registry
//!
//! The on-chain registry that persists DID documents, seen from the client
//! side: resolve a document by DID, or submit a minimal add/revoke
//! change-set. Transport, gas, and retry policy all live behind the trait;
//! this crate never retries on its own.
//!
//! [`MemoryRegistry`] is an in-process implementation for tests and local
//! development. It applies submitted deltas to its stored documents the
//! same way the chain does, which makes it a real exercise of the diff
//! path rather than a blob store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

use super::did::Did;
use super::diff::DocumentDiff;
use super::document::{now_timestamp, DidDocument};

/// A registry transport failure, with the original cause attached.
#[derive(Debug, Error)]
#[error("{context}")]
pub struct RegistryError {
    context: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RegistryError {
    /// A failure with a description only.
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            source: None,
        }
    }

    /// A failure wrapping an underlying transport error.
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Client-side view of the DID registry.
#[async_trait]
pub trait DidRegistry: Send + Sync {
    /// Resolve the registered document for a DID. `None` when the DID has
    /// never been registered; `Err` only for transport failures.
    async fn lookup(&self, did: &Did) -> Result<Option<DidDocument>, RegistryError>;

    /// Apply a minimal change-set to a DID's registered document, creating
    /// it if absent.
    async fn submit(&self, did: &Did, diff: &DocumentDiff) -> Result<(), RegistryError>;
}

// ---------------------------------------------------------------------------
// MemoryRegistry
// ---------------------------------------------------------------------------

/// An in-process registry. Ideal for unit tests: no chain, no keys to
/// fund, no cleanup.
#[derive(Default)]
pub struct MemoryRegistry {
    documents: RwLock<HashMap<String, DidDocument>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered documents.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait]
impl DidRegistry for MemoryRegistry {
    async fn lookup(&self, did: &Did) -> Result<Option<DidDocument>, RegistryError> {
        Ok(self.documents.read().get(&did.canonical()).cloned())
    }

    async fn submit(&self, did: &Did, diff: &DocumentDiff) -> Result<(), RegistryError> {
        let canonical = did.canonical();
        let mut documents = self.documents.write();
        let document = documents.entry(canonical.clone()).or_insert_with(|| {
            let mut blank = DidDocument::blank(did);
            // authentication rows are not part of the delta wire format;
            // the registry derives them from the base identity entries.
            blank.authentication = vec![format!("{canonical}#controller"), canonical.clone()];
            blank
        });

        if let Some(controller) = &diff.controller {
            document.controller = controller.clone();
        }

        document
            .verification_method
            .retain(|vm| !diff.remove.verification_method.contains(vm));
        document
            .assertion_method
            .retain(|entry| !diff.remove.assertion_method.contains(entry));
        document
            .key_agreement
            .retain(|entry| !diff.remove.key_agreement.contains(entry));
        document
            .service
            .retain(|service| !diff.remove.service.contains(service));

        for vm in &diff.add.verification_method {
            if !document.verification_method.contains(vm) {
                document.verification_method.push(vm.clone());
            }
        }
        for entry in &diff.add.assertion_method {
            if !document.assertion_method.contains(entry) {
                document.assertion_method.push(entry.clone());
            }
        }
        for entry in &diff.add.key_agreement {
            if !document.key_agreement.contains(entry) {
                document.key_agreement.push(entry.clone());
            }
        }
        for service in &diff.add.service {
            if !document.service.contains(service) {
                document.service.push(service.clone());
            }
        }

        document.version_id += 1;
        document.updated = now_timestamp();
        Ok(())
    }
}
