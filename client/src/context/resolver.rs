//! # Context Resolver
//!
//! The cached mapping from `(did, context name)` to a
//! [`SecureContextConfig`], creating and registering the context when it
//! does not exist and the caller is authorized to bring it into existence.
//!
//! ## Caching & single-flight
//!
//! The cache key is the context hash, which is stable for the life of a
//! `(did, context name)` pair, so entries never need invalidating within a
//! process. Creation is single-flight per hash: concurrent callers racing
//! on a not-yet-existing context coalesce onto one in-flight resolution
//! and share its result, instead of racing duplicate registrations onto
//! the chain. A failed resolution evicts its cell so later callers retry.
//!
//! ## Authorization
//!
//! Creating a context mutates the DID document, so it demands a connected
//! account whose DID is the target DID. Cross-DID creation is refused
//! outright, never silently redirected.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identity::{ContextEndpoints, Did, DidClient, DidDocument, DidRegistry};

use super::account::Account;
use super::SecureContextConfig;

/// Resolves secure context configurations, with per-hash caching and
/// single-flight creation.
pub struct ContextResolver {
    client: DidClient,
    cache: DashMap<String, Arc<OnceCell<SecureContextConfig>>>,
    account: Option<Arc<Account>>,
    default_endpoints: Option<ContextEndpoints>,
}

impl ContextResolver {
    pub fn new(registry: Arc<dyn DidRegistry>) -> Self {
        Self {
            client: DidClient::new(registry),
            cache: DashMap::new(),
            account: None,
            default_endpoints: None,
        }
    }

    /// Connect an account, enabling context creation for its DID.
    pub fn with_account(mut self, account: Arc<Account>) -> Self {
        self.account = Some(account);
        self
    }

    /// Set the service endpoints newly created contexts are registered
    /// with.
    pub fn with_default_endpoints(mut self, endpoints: ContextEndpoints) -> Self {
        self.default_endpoints = Some(endpoints);
        self
    }

    /// The connected account, if any.
    pub fn account(&self) -> Option<&Arc<Account>> {
        self.account.as_ref()
    }

    /// The underlying DID client.
    pub fn client(&self) -> &DidClient {
        &self.client
    }

    /// Resolve the secure context config for `(did, context_name)`.
    ///
    /// Cache hit: returns the cached config. Cache miss: resolves via the
    /// registry; when absent there, either fails with [`Error::NotFound`]
    /// (`force_create` off) or creates and registers the context
    /// (`force_create` on, connected account required, own DID only).
    pub async fn get_did_context_config(
        &self,
        did: &Did,
        context_name: &str,
        force_create: bool,
    ) -> Result<SecureContextConfig> {
        let context_hash = did.context_hash(context_name);

        // Clone the cell out of the guard before awaiting anything; holding
        // a dashmap guard across an await point stalls the whole shard.
        let cell = self
            .cache
            .entry(context_hash.clone())
            .or_default()
            .clone();

        let result = cell
            .get_or_try_init(|| self.resolve_or_create(did, context_name, force_create))
            .await;

        match result {
            Ok(config) => Ok(config.clone()),
            Err(err) => {
                // Evict the failed cell so the next caller retries instead
                // of being pinned to a dead entry.
                self.cache.remove(&context_hash);
                Err(err)
            }
        }
    }

    /// The uncached resolution path. Runs at most once concurrently per
    /// context hash, courtesy of the OnceCell above.
    async fn resolve_or_create(
        &self,
        did: &Did,
        context_name: &str,
        force_create: bool,
    ) -> Result<SecureContextConfig> {
        debug!(did = %did, "resolving storage context");

        let existing_document = self.client.get(did).await?;
        if let Some(document) = &existing_document {
            match SecureContextConfig::from_document(document, context_name, did.network()) {
                Ok(config) => return Ok(config),
                Err(Error::NotFound(_)) => {}
                Err(other) => return Err(other),
            }
        }

        if !force_create {
            return Err(Error::NotFound(format!(
                "storage context '{context_name}' does not exist for {did}"
            )));
        }

        let account = self.account.as_ref().ok_or_else(|| {
            Error::Unauthorized("cannot create a storage context without a connected account".into())
        })?;
        if account.did() != did {
            return Err(Error::Unauthorized(format!(
                "cannot create a storage context for another DID: connected {}, requested {did}",
                account.did()
            )));
        }
        let endpoints = self.default_endpoints.as_ref().ok_or_else(|| {
            Error::Validation(
                "no default service endpoints configured for context creation".into(),
            )
        })?;

        let keyring = account.context_keyring(context_name);
        let mut document = match existing_document {
            Some(document) => document,
            None => DidDocument::new(did, &account.public_key_hex())?,
        };
        document.add_context(
            did.network(),
            context_name,
            &keyring,
            account.controller_key(),
            endpoints,
        )?;
        self.client.save(&mut document).await?;
        debug!(did = %did, "registered new storage context");

        SecureContextConfig::from_document(&document, context_name, did.network())
    }
}
