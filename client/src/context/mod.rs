//! # Secure Contexts
//!
//! A secure context is an application-scoped partition of a DID: its own
//! signing and key-agreement keys, its own service endpoints, its own
//! database encryption keys. On chain the partition is addressed only by
//! its context hash; the resolved bundle an application works with is the
//! [`SecureContextConfig`].
//!
//! The module is layered like the identity stack it sits on:
//!
//! 1. **SecureContextConfig** — the endpoint + public-key bundle extracted
//!    from a DID document.
//! 2. **Account** — a seed, the controller key derived from it, and the
//!    deterministic per-context keyrings.
//! 3. **ContextResolver** — the cached, single-flight mapping from
//!    `(did, context name)` to a config, creating and registering the
//!    context when authorized.

pub mod account;
pub mod resolver;

pub use account::Account;
pub use resolver::ContextResolver;

use serde::{Deserialize, Serialize};

use crate::config::Network;
use crate::error::{Error, Result};
use crate::identity::{ContextKeyType, DidDocument, ServiceType};

/// A published context public key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureContextPublicKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub public_key_hex: String,
}

/// The two public keys a context publishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureContextKeys {
    pub asym_key: SecureContextPublicKey,
    pub sign_key: SecureContextPublicKey,
}

/// A resolved service endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureContextEndpoint {
    #[serde(rename = "type")]
    pub endpoint_type: String,
    pub endpoint_uri: String,
}

/// The service endpoints a context publishes. Database and messaging are
/// always present; storage and notification are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureContextServices {
    pub database_server: SecureContextEndpoint,
    pub message_server: SecureContextEndpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_server: Option<SecureContextEndpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_server: Option<SecureContextEndpoint>,
}

/// The resolved bundle an application needs to open databases for a
/// context: the context hash, the published public keys, and the service
/// endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureContextConfig {
    /// The context hash. The only identifier that ever leaves the process.
    pub id: String,
    pub public_keys: SecureContextKeys,
    pub services: SecureContextServices,
}

impl SecureContextConfig {
    /// Extract a context's config from a DID document.
    ///
    /// Fails with [`Error::NotFound`] when the document does not carry the
    /// context (or carries it incompletely, which the document layer never
    /// produces).
    pub fn from_document(
        document: &DidDocument,
        context_name: &str,
        network: Option<Network>,
    ) -> Result<Self> {
        let did = document.did()?;
        let context_hash = did.context_hash(context_name);

        let absent = || {
            Error::NotFound(format!(
                "storage context '{context_name}' does not exist on {did}"
            ))
        };

        let sign = document
            .locate_context_key(context_name, ContextKeyType::Sign, network)
            .ok_or_else(absent)?;
        let asym = document
            .locate_context_key(context_name, ContextKeyType::Asym, network)
            .ok_or_else(absent)?;
        let database = document
            .locate_service_endpoint(context_name, ServiceType::Database, network)
            .ok_or_else(absent)?;
        let messaging = document
            .locate_service_endpoint(context_name, ServiceType::Messaging, network)
            .ok_or_else(absent)?;
        let storage =
            document.locate_service_endpoint(context_name, ServiceType::Storage, network);
        let notification =
            document.locate_service_endpoint(context_name, ServiceType::Notification, network);

        let key = |vm: &crate::identity::VerificationMethod| -> Result<SecureContextPublicKey> {
            Ok(SecureContextPublicKey {
                key_type: vm.method_type.clone(),
                public_key_hex: vm.public_key_hex.clone().ok_or_else(absent)?,
            })
        };
        let endpoint = |service: &crate::identity::Service| SecureContextEndpoint {
            endpoint_type: service.service_type.clone(),
            endpoint_uri: service.service_endpoint.clone(),
        };

        Ok(Self {
            id: context_hash,
            public_keys: SecureContextKeys {
                asym_key: key(asym)?,
                sign_key: key(sign)?,
            },
            services: SecureContextServices {
                database_server: endpoint(database),
                message_server: endpoint(messaging),
                storage_server: storage.map(endpoint),
                notification_server: notification.map(endpoint),
            },
        })
    }
}
