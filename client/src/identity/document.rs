//! # DID Document
//!
//! The versioned, context-partitioned key/service registry for one DID.
//!
//! A document carries two kinds of entries:
//!
//! 1. **Base identity keys** — the secp256k1 controller key
//!    (`{did}#controller`) and the on-chain recovery entry (`{did}` with a
//!    `blockchainAccountId`). Seeded at construction, never touched by
//!    context operations.
//! 2. **Context entries** — per-application partitions addressed only by
//!    their context hash. Each context contributes exactly one `sign`
//!    verification method, one `asym` verification method, and two to four
//!    service endpoints. The raw context name never appears in the
//!    document; the hash is the only identifier that leaves the process.
//!
//! Entry ids follow a query-string scheme that other implementations parse
//! byte for byte:
//!
//! ```text
//! {did}?network=<net>&context=<hash>&type=<sign|asym|database|...>
//! ```
//!
//! Documents registered before networks existed omit the `network=` pair.
//! Every id lookup therefore runs an explicit two-step strategy: the
//! qualified id first, then the unqualified legacy form. Two steps, no
//! recursion.
//!
//! Mutation methods take `&mut self`; callers that share a document across
//! tasks must serialize writers. The borrow checker enforces exactly the
//! single-writer discipline the update model requires.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{
    Network, MIGRATION_CONTEXTS, PARAM_CONTEXT, PARAM_NETWORK, PARAM_TYPE, PROOF_PURPOSE,
    PROOF_TYPE, VM_TYPE_ED25519, VM_TYPE_RECOVERY, VM_TYPE_SECP256K1, VM_TYPE_X25519,
};
use crate::crypto::canonical_json;
use crate::error::{Error, Result};
use crate::keyring::{verify_signature, Keyring};

use super::did::{address_from_public_key, verify_controller_signature, ControllerKey, Did};

// ---------------------------------------------------------------------------
// Entry types
// ---------------------------------------------------------------------------

/// A published public key bound to a purpose and (for context keys) a
/// context hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub method_type: String,
    pub controller: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blockchain_account_id: Option<String>,
    /// Context ownership proof: the DID controller's signature binding the
    /// context signing key to the on-chain identity. Present on `sign`
    /// entries only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<String>,
}

/// A service endpoint row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub service_endpoint: String,
}

/// The whole-document self-assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentProof {
    #[serde(rename = "type")]
    pub proof_type: String,
    pub verification_method: String,
    pub proof_purpose: String,
    pub proof_value: String,
}

/// The two key kinds a context publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKeyType {
    /// Ed25519 record-signing key.
    Sign,
    /// X25519 key-agreement key.
    Asym,
}

impl ContextKeyType {
    /// The `type=` query parameter value inside verification-method ids.
    pub fn id_param(&self) -> &'static str {
        match self {
            ContextKeyType::Sign => "sign",
            ContextKeyType::Asym => "asym",
        }
    }
}

/// The service kinds a context can publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    Database,
    Messaging,
    Storage,
    Notification,
}

impl ServiceType {
    /// The `type=` query parameter value inside service ids.
    pub fn id_param(&self) -> &'static str {
        match self {
            ServiceType::Database => "database",
            ServiceType::Messaging => "messaging",
            ServiceType::Storage => "storage",
            ServiceType::Notification => "notification",
        }
    }

    /// The `type` field value of the service row itself.
    pub fn record_type(&self) -> &'static str {
        match self {
            ServiceType::Database => "VdaDatabase",
            ServiceType::Messaging => "VdaMessage",
            ServiceType::Storage => "VdaStorage",
            ServiceType::Notification => "VdaNotification",
        }
    }
}

/// Endpoint URIs supplied when a context is created. Database and
/// messaging are mandatory; storage and notification are optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextEndpoints {
    pub database: String,
    pub messaging: String,
    pub storage: Option<String>,
    pub notification: Option<String>,
}

/// Attribute overrides for [`DidDocument::set_attributes`].
#[derive(Debug, Clone, Default)]
pub struct DocumentAttributes {
    pub controller: Option<String>,
    pub created: Option<String>,
}

// ---------------------------------------------------------------------------
// DidDocument
// ---------------------------------------------------------------------------

/// An in-memory DID document. Serializes to the registry wire format
/// (camelCase field names, optional fields omitted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    /// The canonical lower-cased DID.
    pub id: String,
    pub controller: String,
    pub created: String,
    pub updated: String,
    pub version_id: u32,
    pub verification_method: Vec<VerificationMethod>,
    pub authentication: Vec<String>,
    pub assertion_method: Vec<String>,
    pub key_agreement: Vec<String>,
    pub service: Vec<Service>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<DocumentProof>,
}

impl DidDocument {
    /// Construct a fresh document for a DID, seeding the base identity
    /// entries from its uncompressed secp256k1 public key.
    ///
    /// Fails if the key is malformed or does not hash to the DID's address.
    pub fn new(did: &Did, public_key_hex: &str) -> Result<Self> {
        let address = address_from_public_key(public_key_hex)?;
        if !address.eq_ignore_ascii_case(did.address()) {
            return Err(Error::Validation(format!(
                "public key resolves to {address}, which does not control {did}"
            )));
        }

        let canonical = did.canonical();
        let controller_id = format!("{canonical}#controller");
        let now = now_timestamp();

        let verification_method = vec![
            VerificationMethod {
                id: controller_id.clone(),
                method_type: VM_TYPE_SECP256K1.to_string(),
                controller: canonical.clone(),
                public_key_hex: Some(public_key_hex.to_lowercase()),
                blockchain_account_id: None,
                proof: None,
            },
            VerificationMethod {
                id: canonical.clone(),
                method_type: VM_TYPE_RECOVERY.to_string(),
                controller: canonical.clone(),
                public_key_hex: None,
                blockchain_account_id: Some(format!(
                    "eip155:{}:{}",
                    did.network_or_default().chain_id(),
                    did.address()
                )),
                proof: None,
            },
        ];

        Ok(Self {
            id: canonical.clone(),
            controller: canonical.clone(),
            created: now.clone(),
            updated: now,
            version_id: 0,
            verification_method,
            authentication: vec![controller_id, canonical],
            assertion_method: self_refs(did),
            key_agreement: Vec::new(),
            service: Vec::new(),
            proof: None,
        })
    }

    /// An empty document shell for a DID: the zero state a registry diff is
    /// computed against when no document exists yet.
    pub fn blank(did: &Did) -> Self {
        let canonical = did.canonical();
        let now = now_timestamp();
        Self {
            id: canonical.clone(),
            controller: canonical,
            created: now.clone(),
            updated: now,
            version_id: 0,
            verification_method: Vec::new(),
            authentication: Vec::new(),
            assertion_method: Vec::new(),
            key_agreement: Vec::new(),
            service: Vec::new(),
            proof: None,
        }
    }

    /// The DID this document describes.
    pub fn did(&self) -> Result<Did> {
        Did::parse(&self.id)
    }

    /// Bump `versionId` and `updated`. Called by every mutation that will
    /// be persisted.
    pub(crate) fn touch(&mut self) {
        self.version_id += 1;
        self.updated = now_timestamp();
    }

    // -- Context management -------------------------------------------------

    /// Add (or replace) an application context.
    ///
    /// Any prior entries for the same context name are removed first:
    /// contexts are replace-not-merge, so stale keys from an earlier
    /// registration can never linger next to the new ones.
    ///
    /// The `sign` entry carries an ownership proof: the controller key's
    /// signature over `{did_address}{sign_key_address}` (both lower-cased),
    /// binding the context signing key to the on-chain identity.
    pub fn add_context(
        &mut self,
        network: Option<Network>,
        context_name: &str,
        keyring: &Keyring,
        controller_key: &ControllerKey,
        endpoints: &ContextEndpoints,
    ) -> Result<()> {
        let did = self.did()?;
        self.remove_context(context_name, network);

        let context_hash = did.context_hash(context_name);
        let keys = keyring.public_keys();

        let mut services = vec![
            (ServiceType::Database, endpoints.database.clone()),
            (ServiceType::Messaging, endpoints.messaging.clone()),
        ];
        if let Some(uri) = &endpoints.storage {
            services.push((ServiceType::Storage, uri.clone()));
        }
        if let Some(uri) = &endpoints.notification {
            services.push((ServiceType::Notification, uri.clone()));
        }
        for (service_type, endpoint) in services {
            let id = self.entry_id(network, &context_hash, service_type.id_param());
            self.service.push(Service {
                id,
                service_type: service_type.record_type().to_string(),
                service_endpoint: endpoint,
            });
        }

        let proof_message = format!("{}{}", did.address_lower(), keyring.sign_public_address());
        let proof = controller_key.sign(proof_message.as_bytes());

        let sign_id = self.entry_id(network, &context_hash, "sign");
        self.verification_method.push(VerificationMethod {
            id: sign_id.clone(),
            method_type: VM_TYPE_ED25519.to_string(),
            controller: self.id.clone(),
            public_key_hex: Some(keys.sign.hex),
            blockchain_account_id: None,
            proof: Some(proof),
        });
        self.assertion_method.push(sign_id);

        let asym_id = self.entry_id(network, &context_hash, "asym");
        self.verification_method.push(VerificationMethod {
            id: asym_id.clone(),
            method_type: VM_TYPE_X25519.to_string(),
            controller: self.id.clone(),
            public_key_hex: Some(keys.asym.hex),
            blockchain_account_id: None,
            proof: None,
        });
        self.assertion_method.push(asym_id.clone());
        self.key_agreement.push(asym_id);

        self.touch();
        Ok(())
    }

    /// Remove every entry belonging to a context. Returns `false` (leaving
    /// the document untouched) when no matching sign entry exists.
    ///
    /// Removal is keyed strictly by `context=<hash>`, so entries of another
    /// context that happen to share a service type are never touched.
    pub fn remove_context(&mut self, context_name: &str, network: Option<Network>) -> bool {
        let Ok(did) = self.did() else {
            return false;
        };
        let context_hash = did.context_hash(context_name);

        if self.find_sign_entry(network, &context_hash).is_none() {
            return false;
        }

        // The marker includes the trailing separator: every context entry id
        // continues with `&type=...`, and requiring it keeps the match exact.
        let doc_id = self.id.clone();
        let marker = format!("{PARAM_CONTEXT}={context_hash}&");
        let belongs = move |id: &str| id.starts_with(&doc_id) && id.contains(&marker);

        self.verification_method.retain(|vm| !belongs(&vm.id));
        self.service.retain(|s| !belongs(&s.id));
        self.assertion_method.retain(|id| !belongs(id));
        self.key_agreement.retain(|id| !belongs(id));

        self.touch();
        true
    }

    // -- Lookups ------------------------------------------------------------

    /// Locate a context's service endpoint by type, with the legacy
    /// unqualified retry.
    pub fn locate_service_endpoint(
        &self,
        context_name: &str,
        service_type: ServiceType,
        network: Option<Network>,
    ) -> Option<&Service> {
        let did = self.did().ok()?;
        let context_hash = did.context_hash(context_name);
        self.candidate_ids(network, &context_hash, service_type.id_param())
            .into_iter()
            .find_map(|id| self.service.iter().find(|s| s.id == id))
    }

    /// Locate one of a context's published keys, with the legacy
    /// unqualified retry.
    pub fn locate_context_key(
        &self,
        context_name: &str,
        key_type: ContextKeyType,
        network: Option<Network>,
    ) -> Option<&VerificationMethod> {
        let did = self.did().ok()?;
        let context_hash = did.context_hash(context_name);
        self.find_verification_method(network, &context_hash, key_type.id_param())
    }

    /// Locate a context's ownership proof (carried on its sign entry).
    pub fn locate_context_proof(
        &self,
        context_name: &str,
        network: Option<Network>,
    ) -> Option<&str> {
        let did = self.did().ok()?;
        let context_hash = did.context_hash(context_name);
        self.find_sign_entry(network, &context_hash)?
            .proof
            .as_deref()
    }

    /// Find a context verification method by hash and type parameter,
    /// running the qualified-then-unqualified two-step.
    fn find_verification_method(
        &self,
        network: Option<Network>,
        context_hash: &str,
        type_param: &str,
    ) -> Option<&VerificationMethod> {
        self.candidate_ids(network, context_hash, type_param)
            .into_iter()
            .find_map(|id| self.verification_method.iter().find(|vm| vm.id == id))
    }

    fn find_sign_entry(
        &self,
        network: Option<Network>,
        context_hash: &str,
    ) -> Option<&VerificationMethod> {
        self.find_verification_method(network, context_hash, "sign")
    }

    /// The explicit two-step lookup strategy: the network-qualified id
    /// first, then the unqualified legacy id. When no network is given the
    /// two collapse into one candidate.
    fn candidate_ids(
        &self,
        network: Option<Network>,
        context_hash: &str,
        type_param: &str,
    ) -> Vec<String> {
        let mut ids = Vec::with_capacity(2);
        if network.is_some() {
            ids.push(self.entry_id(network, context_hash, type_param));
        }
        ids.push(self.entry_id(None, context_hash, type_param));
        ids
    }

    // -- Signatures ---------------------------------------------------------

    /// Verify a controller-key signature against this document's base
    /// identity key.
    pub fn verify_sig(&self, data: &[u8], signature: &str) -> bool {
        let controller_id = format!("{}#controller", self.id);
        let Some(vm) = self.verification_method.iter().find(|vm| vm.id == controller_id) else {
            return false;
        };
        let Some(public_key_hex) = &vm.public_key_hex else {
            return false;
        };
        verify_controller_signature(public_key_hex, data, signature)
    }

    /// Verify a signature produced by a context's sign key.
    ///
    /// `context` is a raw context name unless `context_is_hash` is set, in
    /// which case it is already the context hash. The relevant sign entry
    /// is located by id pattern with the legacy two-step retry.
    pub fn verify_context_signature(
        &self,
        data: &[u8],
        network: Option<Network>,
        context: &str,
        signature: &str,
        context_is_hash: bool,
    ) -> bool {
        let context_hash = if context_is_hash {
            context.to_string()
        } else {
            let Ok(did) = self.did() else {
                return false;
            };
            did.context_hash(context)
        };
        let Some(vm) = self.find_sign_entry(network, &context_hash) else {
            return false;
        };
        let Some(public_key_hex) = &vm.public_key_hex else {
            return false;
        };
        verify_signature(public_key_hex, data, signature)
    }

    /// Sign the whole document (minus the proof itself) as a
    /// self-assertion by the controller key.
    pub fn sign_proof(&mut self, controller_key: &ControllerKey) {
        let payload = self.proof_payload();
        self.proof = Some(DocumentProof {
            proof_type: PROOF_TYPE.to_string(),
            verification_method: format!("{}#controller", self.id),
            proof_purpose: PROOF_PURPOSE.to_string(),
            proof_value: controller_key.sign(payload.as_bytes()),
        });
    }

    /// Verify the whole-document proof. `false` when absent, malformed, or
    /// stale.
    pub fn verify_proof(&self) -> bool {
        let Some(proof) = &self.proof else {
            return false;
        };
        self.verify_sig(self.proof_payload().as_bytes(), &proof.proof_value)
    }

    /// The canonical signing input: the document with `proof` removed,
    /// serialized with sorted keys.
    fn proof_payload(&self) -> String {
        let mut unsigned = self.clone();
        unsigned.proof = None;
        let value = serde_json::to_value(&unsigned).expect("document serializes");
        canonical_json(&value)
    }

    // -- Attribute updates & migration --------------------------------------

    /// Overwrite selected document attributes.
    pub fn set_attributes(&mut self, attributes: DocumentAttributes) {
        if let Some(controller) = attributes.controller {
            self.controller = controller;
        }
        if let Some(created) = attributes.created {
            self.created = created;
        }
        self.touch();
    }

    /// Rewrite the document for a new DID.
    ///
    /// Every id and controller field embedding the old DID is rewritten,
    /// and the context hashes of the well-known first-party contexts are
    /// recomputed (they embed the DID string, so they change with it).
    /// Third-party context hashes cannot be recomputed here because their
    /// names are unknown; those contexts re-register after migration.
    ///
    /// The whole-document proof signs the old content and is deleted, not
    /// left stale.
    pub fn update_did(&mut self, new_did: &Did) -> Result<()> {
        let old_did = self.did()?;
        let old_canonical = old_did.canonical();
        let new_canonical = new_did.canonical();
        let old_address = old_did.address_lower();
        let new_address = new_did.address_lower();

        let hash_moves: Vec<(String, String)> = MIGRATION_CONTEXTS
            .iter()
            .map(|name| (old_did.context_hash(name), new_did.context_hash(name)))
            .collect();

        let rewrite = |input: &str| -> String {
            let mut out = input
                .replace(&old_canonical, &new_canonical)
                .replace(&old_address, &new_address);
            for (old_hash, new_hash) in &hash_moves {
                out = out.replace(old_hash, new_hash);
            }
            out
        };

        self.id = new_canonical.clone();
        self.controller = rewrite(&self.controller);
        for vm in &mut self.verification_method {
            vm.id = rewrite(&vm.id);
            vm.controller = rewrite(&vm.controller);
            if vm.method_type == VM_TYPE_RECOVERY {
                vm.blockchain_account_id = Some(format!(
                    "eip155:{}:{}",
                    new_did.network_or_default().chain_id(),
                    new_did.address()
                ));
            }
        }
        for entry in self
            .authentication
            .iter_mut()
            .chain(self.assertion_method.iter_mut())
            .chain(self.key_agreement.iter_mut())
        {
            *entry = rewrite(entry);
        }
        for service in &mut self.service {
            service.id = rewrite(&service.id);
        }

        // The proof signed the old content; a stale proof is worse than none.
        self.proof = None;
        self.touch();
        Ok(())
    }

    // -- Id construction ----------------------------------------------------

    /// Build a context entry id:
    /// `{did}?network=<net>&context=<hash>&type=<t>`, dropping the
    /// `network=` pair when no network applies.
    fn entry_id(&self, network: Option<Network>, context_hash: &str, type_param: &str) -> String {
        match network {
            Some(net) => format!(
                "{}?{PARAM_NETWORK}={net}&{PARAM_CONTEXT}={context_hash}&{PARAM_TYPE}={type_param}",
                self.id
            ),
            None => format!(
                "{}?{PARAM_CONTEXT}={context_hash}&{PARAM_TYPE}={type_param}",
                self.id
            ),
        }
    }
}

/// `assertionMethod` references both base entries.
fn self_refs(did: &Did) -> Vec<String> {
    let canonical = did.canonical();
    vec![format!("{canonical}#controller"), canonical]
}

/// RFC 3339 UTC timestamp at second precision.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ControllerKey {
        ControllerKey::from_seed("document test seed")
    }

    fn test_did() -> Did {
        controller().did(Some(Network::Testnet))
    }

    fn test_document() -> DidDocument {
        DidDocument::new(&test_did(), &controller().public_key_hex()).unwrap()
    }

    fn endpoints() -> ContextEndpoints {
        ContextEndpoints {
            database: "https://db.vdanetwork.io/".into(),
            messaging: "https://msg.vdanetwork.io/".into(),
            storage: None,
            notification: None,
        }
    }

    // -- Construction -------------------------------------------------------

    #[test]
    fn new_document_seeds_base_entries() {
        let doc = test_document();
        assert_eq!(doc.verification_method.len(), 2);
        assert_eq!(doc.authentication.len(), 2);
        assert_eq!(doc.assertion_method.len(), 2);
        assert!(doc.service.is_empty());
        assert_eq!(doc.version_id, 0);
        assert_eq!(doc.id, test_did().canonical());

        let recovery = &doc.verification_method[1];
        assert_eq!(recovery.method_type, VM_TYPE_RECOVERY);
        let account_id = recovery.blockchain_account_id.as_ref().unwrap();
        assert!(account_id.starts_with(&format!("eip155:{}:", Network::Testnet.chain_id())));
    }

    #[test]
    fn new_document_rejects_malformed_keys() {
        let did = test_did();
        assert!(DidDocument::new(&did, "0x04deadbeef").is_err());
        assert!(DidDocument::new(&did, "not hex at all").is_err());
    }

    #[test]
    fn new_document_rejects_foreign_key() {
        // A valid key that hashes to a different address must not seed a
        // document for this DID.
        let other = ControllerKey::from_seed("someone else entirely");
        let result = DidDocument::new(&test_did(), &other.public_key_hex());
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    // -- Context add/remove -------------------------------------------------

    #[test]
    fn add_context_publishes_all_rows() {
        let mut doc = test_document();
        let keyring = Keyring::new("app keyring seed");
        doc.add_context(Some(Network::Testnet), "Test App", &keyring, &controller(), &endpoints())
            .unwrap();

        // 2 base + 2 context verification methods, 2 services, asym in
        // keyAgreement, both context ids in assertionMethod.
        assert_eq!(doc.verification_method.len(), 4);
        assert_eq!(doc.service.len(), 2);
        assert_eq!(doc.key_agreement.len(), 1);
        assert_eq!(doc.assertion_method.len(), 4);

        let hash = test_did().context_hash("Test App");
        let sign = doc.find_sign_entry(Some(Network::Testnet), &hash).unwrap();
        assert_eq!(sign.method_type, VM_TYPE_ED25519);
        assert_eq!(sign.public_key_hex.as_ref().unwrap(), &keyring.public_keys().sign.hex);
        assert!(sign.id.contains("network=testnet"));
        assert!(sign.id.contains(&format!("context={hash}")));
        assert!(sign.id.ends_with("type=sign"));
    }

    #[test]
    fn add_context_with_all_endpoints_publishes_four_services() {
        let mut doc = test_document();
        let all = ContextEndpoints {
            database: "https://db/".into(),
            messaging: "https://msg/".into(),
            storage: Some("https://store/".into()),
            notification: Some("https://notify/".into()),
        };
        doc.add_context(Some(Network::Testnet), "App", &Keyring::new("k"), &controller(), &all)
            .unwrap();
        assert_eq!(doc.service.len(), 4);
        assert!(doc
            .locate_service_endpoint("App", ServiceType::Notification, Some(Network::Testnet))
            .is_some());
    }

    #[test]
    fn add_context_replaces_not_merges() {
        let mut doc = test_document();
        let first = Keyring::new("first keyring");
        let second = Keyring::new("second keyring");
        doc.add_context(Some(Network::Testnet), "App", &first, &controller(), &endpoints())
            .unwrap();
        doc.add_context(Some(Network::Testnet), "App", &second, &controller(), &endpoints())
            .unwrap();

        // Exactly one sign + one asym entry for the context, carrying the
        // second keyring's keys. Zero leftovers from the first.
        let hash = test_did().context_hash("App");
        let context_vms: Vec<_> = doc
            .verification_method
            .iter()
            .filter(|vm| vm.id.contains(&format!("context={hash}")))
            .collect();
        assert_eq!(context_vms.len(), 2);
        let sign = doc.find_sign_entry(Some(Network::Testnet), &hash).unwrap();
        assert_eq!(sign.public_key_hex.as_ref().unwrap(), &second.public_keys().sign.hex);
        assert_eq!(doc.service.len(), 2);
        assert_eq!(doc.key_agreement.len(), 1);
    }

    #[test]
    fn remove_context_is_exact_and_idempotent() {
        let mut doc = test_document();
        let keyring = Keyring::new("k");
        doc.add_context(Some(Network::Testnet), "Keep", &keyring, &controller(), &endpoints())
            .unwrap();
        doc.add_context(Some(Network::Testnet), "Drop", &keyring, &controller(), &endpoints())
            .unwrap();

        assert!(doc.remove_context("Drop", Some(Network::Testnet)));

        // "Keep" still has its rows; "Drop" has none.
        let keep_hash = test_did().context_hash("Keep");
        let drop_hash = test_did().context_hash("Drop");
        assert!(doc.find_sign_entry(Some(Network::Testnet), &keep_hash).is_some());
        assert!(doc.find_sign_entry(Some(Network::Testnet), &drop_hash).is_none());
        assert_eq!(doc.service.len(), 2);

        // Second removal: false, and the document is untouched.
        let snapshot = doc.clone();
        assert!(!doc.remove_context("Drop", Some(Network::Testnet)));
        assert_eq!(doc, snapshot);
    }

    #[test]
    fn remove_context_never_exists_returns_false() {
        let mut doc = test_document();
        assert!(!doc.remove_context("Never Added", Some(Network::Testnet)));
    }

    #[test]
    fn legacy_lookup_retries_without_network_qualifier() {
        // A document whose context was registered without a network segment
        // must still resolve when callers ask with a network.
        let mut doc = test_document();
        let keyring = Keyring::new("legacy keyring");
        doc.add_context(None, "Legacy App", &keyring, &controller(), &endpoints())
            .unwrap();

        let hash = test_did().context_hash("Legacy App");
        assert!(doc.find_sign_entry(Some(Network::Testnet), &hash).is_some());
        assert!(doc
            .locate_service_endpoint("Legacy App", ServiceType::Database, Some(Network::Testnet))
            .is_some());
        assert!(doc.remove_context("Legacy App", Some(Network::Testnet)));
    }

    // -- Signatures & proofs ------------------------------------------------

    #[test]
    fn context_ownership_proof_verifies() {
        let mut doc = test_document();
        let keyring = Keyring::new("proof keyring");
        doc.add_context(Some(Network::Testnet), "App", &keyring, &controller(), &endpoints())
            .unwrap();

        let proof = doc.locate_context_proof("App", Some(Network::Testnet)).unwrap();
        let message = format!(
            "{}{}",
            test_did().address_lower(),
            keyring.sign_public_address()
        );
        assert!(doc.verify_sig(message.as_bytes(), proof));
    }

    #[test]
    fn context_signature_verification() {
        let mut doc = test_document();
        let keyring = Keyring::new("signer");
        doc.add_context(Some(Network::Testnet), "App", &keyring, &controller(), &endpoints())
            .unwrap();

        let sig = keyring.sign(b"record payload");
        assert!(doc.verify_context_signature(
            b"record payload",
            Some(Network::Testnet),
            "App",
            &sig,
            false
        ));
        // Same lookup, but addressed by hash instead of name.
        let hash = test_did().context_hash("App");
        assert!(doc.verify_context_signature(
            b"record payload",
            Some(Network::Testnet),
            &hash,
            &sig,
            true
        ));
        // Wrong payload fails.
        assert!(!doc.verify_context_signature(
            b"tampered payload",
            Some(Network::Testnet),
            "App",
            &sig,
            false
        ));
        // Unknown context fails.
        assert!(!doc.verify_context_signature(
            b"record payload",
            Some(Network::Testnet),
            "Other App",
            &sig,
            false
        ));
    }

    #[test]
    fn document_proof_roundtrip() {
        let mut doc = test_document();
        assert!(!doc.verify_proof()); // no proof yet

        doc.sign_proof(&controller());
        assert!(doc.verify_proof());

        // Any mutation after signing makes the proof stale.
        doc.set_attributes(DocumentAttributes {
            controller: Some("did:vda:testnet:0x0000000000000000000000000000000000000001".into()),
            created: None,
        });
        assert!(!doc.verify_proof());
    }

    // -- Versioning ---------------------------------------------------------

    #[test]
    fn mutations_bump_version_monotonically() {
        let mut doc = test_document();
        let keyring = Keyring::new("k");
        let mut last = doc.version_id;

        doc.add_context(Some(Network::Testnet), "App", &keyring, &controller(), &endpoints())
            .unwrap();
        assert!(doc.version_id > last);
        last = doc.version_id;

        assert!(doc.remove_context("App", Some(Network::Testnet)));
        assert!(doc.version_id > last);
    }

    // -- Migration ----------------------------------------------------------

    #[test]
    fn update_did_rewrites_everything() {
        let mut doc = test_document();
        let keyring = Keyring::new("migrating keyring");
        let migration_context = MIGRATION_CONTEXTS[0];
        doc.add_context(
            Some(Network::Testnet),
            migration_context,
            &keyring,
            &controller(),
            &endpoints(),
        )
        .unwrap();
        doc.sign_proof(&controller());

        let new_controller = ControllerKey::from_seed("the new identity");
        let new_did = new_controller.did(Some(Network::Testnet));
        let old_canonical = doc.id.clone();
        doc.update_did(&new_did).unwrap();

        assert_eq!(doc.id, new_did.canonical());
        assert_eq!(doc.controller, new_did.canonical());
        // No trace of the old DID anywhere.
        let serialized = serde_json::to_string(&doc).unwrap();
        assert!(!serialized.contains(&old_canonical));

        // The well-known context resolves under its recomputed hash.
        let new_hash = new_did.context_hash(migration_context);
        assert!(doc.find_sign_entry(Some(Network::Testnet), &new_hash).is_some());
        assert!(doc
            .locate_service_endpoint(migration_context, ServiceType::Database, Some(Network::Testnet))
            .is_some());

        // Recovery entry points at the new chain account.
        let recovery = doc
            .verification_method
            .iter()
            .find(|vm| vm.method_type == VM_TYPE_RECOVERY)
            .unwrap();
        assert!(recovery
            .blockchain_account_id
            .as_ref()
            .unwrap()
            .ends_with(new_did.address()));

        // The old proof signed the old content; it must be gone, not stale.
        assert!(doc.proof.is_none());
    }

    // -- Serialization ------------------------------------------------------

    #[test]
    fn wire_format_uses_camel_case() {
        let mut doc = test_document();
        doc.add_context(Some(Network::Testnet), "App", &Keyring::new("k"), &controller(), &endpoints())
            .unwrap();
        let value = serde_json::to_value(&doc).unwrap();

        assert!(value.get("versionId").is_some());
        assert!(value.get("verificationMethod").is_some());
        assert!(value.get("assertionMethod").is_some());
        assert!(value.get("keyAgreement").is_some());
        let vm = &value["verificationMethod"][0];
        assert!(vm.get("publicKeyHex").is_some());
        assert!(vm.get("type").is_some());
        // Absent optionals are omitted, not null.
        assert!(vm.get("blockchainAccountId").is_none());
    }

    #[test]
    fn document_json_roundtrip() {
        let mut doc = test_document();
        doc.add_context(Some(Network::Testnet), "App", &Keyring::new("k"), &controller(), &endpoints())
            .unwrap();
        doc.sign_proof(&controller());

        let json = serde_json::to_string(&doc).unwrap();
        let back: DidDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, back);
        assert!(back.verify_proof());
    }
}
