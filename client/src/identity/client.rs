//! # DID Client
//!
//! The fetch-diff-submit path between in-memory documents and the
//! registry. Persisting a document never uploads it wholesale: the client
//! resolves the registry's last-known state, computes the structural diff,
//! and submits only the delta. An unchanged document costs nothing.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;

use super::did::Did;
use super::document::DidDocument;
use super::registry::DidRegistry;

/// Resolves and persists DID documents against a registry.
#[derive(Clone)]
pub struct DidClient {
    registry: Arc<dyn DidRegistry>,
}

impl DidClient {
    pub fn new(registry: Arc<dyn DidRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve the registered document for a DID, if any.
    pub async fn get(&self, did: &Did) -> Result<Option<DidDocument>> {
        Ok(self.registry.lookup(did).await?)
    }

    /// Persist a document by submitting the minimal add/revoke change-set
    /// against the registry's last-known state.
    ///
    /// Returns `false` (and performs no registry write) when the document
    /// matches the registered state row for row. On success the in-memory
    /// document's version is bumped, keeping it monotonic with the
    /// registered copy.
    pub async fn save(&self, document: &mut DidDocument) -> Result<bool> {
        let did = document.did()?;
        let base = self
            .get(&did)
            .await?
            .unwrap_or_else(|| DidDocument::blank(&did));

        let diff = base.compare(document);
        if diff.is_empty() {
            debug!(did = %did, "document unchanged, skipping registry submission");
            return Ok(false);
        }

        debug!(
            did = %did,
            add_rows = diff.add.row_count(),
            remove_rows = diff.remove.row_count(),
            "submitting document delta"
        );
        self.registry.submit(&did, &diff).await?;
        document.touch();
        Ok(true)
    }
}
