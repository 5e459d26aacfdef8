//! # Storage Engine
//!
//! Permission routing: given a resolved context and a `(read, write)`
//! permission tuple, decide which database flavor to construct and which
//! key material it runs on.
//!
//! The tuple is resolved once at open time into a closed
//! [`PermissionRoute`] and matched exhaustively. There is no string
//! comparison chain to fall through and no silent downgrade: every
//! combination lands on exactly one of encrypted, public, unsupported, or
//! invalid.
//!
//! | read   | write  | outcome                                             |
//! |--------|--------|-----------------------------------------------------|
//! | owner  | owner  | encrypted database, per-database key, account required |
//! | public | owner  | public database, writes gated to the owner          |
//! | public | public | public database, writes open                        |
//! | users  | *      | unsupported (explicitly, loudly)                    |
//! | *      | users  | unsupported (explicitly, loudly)                    |
//! | other  |        | invalid configuration                               |

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SYM_KEY_LENGTH;
use crate::context::{Account, ContextResolver, SecureContextConfig};
use crate::error::{Error, Result};
use crate::identity::Did;

use super::database::{Database, RecordSigner};
use super::store::{StoreOpenRequest, StoreProvider};

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

/// An access class for one side of the permission tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabasePermission {
    /// Only the context owner.
    Owner,
    /// Anyone.
    Public,
    /// A named list of DIDs. Declared but not implemented; see
    /// [`PermissionRoute::UsersScoped`].
    Users,
}

impl Default for DatabasePermission {
    fn default() -> Self {
        DatabasePermission::Owner
    }
}

/// The full permission configuration for a database.
///
/// `read_list`/`write_list` accompany the `users` class. They are carried
/// (and serialized) so documents round-trip, but their enforcement
/// semantics are an unimplemented extension point: opening a users-scoped
/// database fails with [`Error::Unsupported`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionsConfig {
    pub read: DatabasePermission,
    pub write: DatabasePermission,
    pub read_list: Vec<String>,
    pub write_list: Vec<String>,
}

/// The closed routing outcome of a permission tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermissionRoute {
    OwnerOwner,
    PublicOwner,
    PublicPublic,
    /// `users` anywhere in the tuple. Kept as its own variant (rather than
    /// folded into `Invalid`) so the gap stays visible at the type level.
    UsersScoped,
    Invalid,
}

impl From<&PermissionsConfig> for PermissionRoute {
    fn from(permissions: &PermissionsConfig) -> Self {
        use DatabasePermission::*;
        match (permissions.read, permissions.write) {
            (Owner, Owner) => PermissionRoute::OwnerOwner,
            (Public, Owner) => PermissionRoute::PublicOwner,
            (Public, Public) => PermissionRoute::PublicPublic,
            (Users, _) | (_, Users) => PermissionRoute::UsersScoped,
            (Owner, Public) => PermissionRoute::Invalid,
        }
    }
}

/// Options for opening a database.
#[derive(Clone, Default)]
pub struct DatabaseOptions {
    pub permissions: PermissionsConfig,
    /// Force read-only regardless of what the permissions would allow.
    pub read_only: bool,
    /// Override the derived per-database encryption key (owner-encrypted
    /// databases only).
    pub encryption_key: Option<[u8; SYM_KEY_LENGTH]>,
}

// ---------------------------------------------------------------------------
// StorageEngine
// ---------------------------------------------------------------------------

/// Opens permission-appropriate databases against one resolved context.
pub struct StorageEngine {
    did: Did,
    context_name: String,
    context: SecureContextConfig,
    resolver: Arc<ContextResolver>,
    provider: Arc<dyn StoreProvider>,
    account: Option<Arc<Account>>,
}

impl StorageEngine {
    /// Resolve a context and bind an engine to it.
    ///
    /// With an account connected (taken from the resolver), a missing
    /// context is created and registered; without one, a missing context
    /// is an error.
    pub async fn open(
        did: Did,
        context_name: impl Into<String>,
        resolver: Arc<ContextResolver>,
        provider: Arc<dyn StoreProvider>,
    ) -> Result<Self> {
        let context_name = context_name.into();
        let account = resolver.account().cloned();
        let context = resolver
            .get_did_context_config(&did, &context_name, account.is_some())
            .await?;
        Ok(Self {
            did,
            context_name,
            context,
            resolver,
            provider,
            account,
        })
    }

    /// The resolved context this engine is bound to.
    pub fn context(&self) -> &SecureContextConfig {
        &self.context
    }

    /// The DID whose context this engine is bound to.
    pub fn did(&self) -> &Did {
        &self.did
    }

    /// Whether the connected account owns the given DID's data.
    fn is_owner(&self, did: &Did) -> bool {
        self.account
            .as_ref()
            .is_some_and(|account| account.did() == did)
    }

    /// Open a database in this engine's own context.
    pub async fn open_database(&self, name: &str, options: &DatabaseOptions) -> Result<Database> {
        let did = self.did.clone();
        let context = self.context.clone();
        self.open_for(&did, &context, name, options).await
    }

    /// Open another DID's database in the same application context.
    /// The external context is resolved (never created) through the shared
    /// resolver, and ownership is evaluated against the external DID, so
    /// owner-gated writes collapse to read-only.
    pub async fn open_external_database(
        &self,
        name: &str,
        did: &Did,
        options: &DatabaseOptions,
    ) -> Result<Database> {
        let context = self
            .resolver
            .get_did_context_config(did, &self.context_name, false)
            .await?;
        self.open_for(did, &context, name, options).await
    }

    /// The routing core: the permission tuple fully determines the
    /// database implementation and key material.
    async fn open_for(
        &self,
        owner_did: &Did,
        context: &SecureContextConfig,
        name: &str,
        options: &DatabaseOptions,
    ) -> Result<Database> {
        let route = PermissionRoute::from(&options.permissions);
        let is_owner = self.is_owner(owner_did);
        debug!(database = name, ?route, is_owner, "routing database open");

        let (encryption_key, read_only) = match route {
            PermissionRoute::OwnerOwner => {
                let account = self.account.as_ref().ok_or_else(|| {
                    Error::Unauthorized(
                        "owner access required but no account supplied".into(),
                    )
                })?;
                if account.did() != owner_did {
                    return Err(Error::Unauthorized(format!(
                        "cannot open another DID's owner-only database ({owner_did})"
                    )));
                }
                let key = options.encryption_key.unwrap_or_else(|| {
                    account.context_keyring(&self.context_name).database_key(name)
                });
                (Some(key), options.read_only)
            }
            PermissionRoute::PublicOwner => {
                // Readable by anyone; writable by the owner alone. A
                // non-owner gets a working read-only handle, not an error.
                (None, options.read_only || !is_owner)
            }
            PermissionRoute::PublicPublic => (None, options.read_only),
            PermissionRoute::UsersScoped => {
                return Err(Error::Unsupported(
                    "users-scoped database sharing is not yet implemented".into(),
                ));
            }
            PermissionRoute::Invalid => {
                return Err(Error::Validation(format!(
                    "invalid permissions configuration: read={:?}, write={:?}",
                    options.permissions.read, options.permissions.write
                )));
            }
        };

        let store = self
            .provider
            .open(StoreOpenRequest {
                database_name: name.to_string(),
                endpoint_uri: context.services.database_server.endpoint_uri.clone(),
                context_id: context.id.clone(),
                encryption_key,
            })
            .await?;

        // Records are signed whenever an account is connected, keyed by the
        // signer's own context (not the database owner's).
        let signer = self.account.as_ref().map(|account| RecordSigner {
            keyring: account.context_keyring(&self.context_name),
            signer_key: format!(
                "{}?context={}",
                account.did().canonical(),
                account.did().context_hash(&self.context_name)
            ),
        });

        Ok(Database::new(
            name.to_string(),
            owner_did.clone(),
            store,
            options.permissions.clone(),
            read_only,
            signer,
        ))
    }
}
