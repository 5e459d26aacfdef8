//! # Protocol Configuration & Constants
//!
//! Every magic value in the VDA client lives here. If you're hardcoding a
//! constant somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! Most of these values are part of the wire-level identity format. The DID
//! method string, the id query-parameter scheme, and the context-hash inputs
//! must match other implementations byte for byte, so treat anything in this
//! file as consensus-adjacent: changing it strands every document already
//! registered on chain.

// ---------------------------------------------------------------------------
// DID Method
// ---------------------------------------------------------------------------

/// The DID method name. A full DID reads `did:vda:<network>:<address>`,
/// or `did:vda:<address>` for documents registered before the network
/// segment existed.
pub const DID_METHOD: &str = "vda";

/// The `did:vda` prefix, assembled once so parsers and formatters agree.
pub const DID_PREFIX: &str = "did:vda";

/// Query parameter carrying the network name in verification-method and
/// service ids. Absent on legacy documents.
pub const PARAM_NETWORK: &str = "network";

/// Query parameter carrying the context hash in verification-method and
/// service ids.
pub const PARAM_CONTEXT: &str = "context";

/// Query parameter carrying the entry type (`sign`, `asym`, `database`,
/// `messaging`, `storage`, `notification`).
pub const PARAM_TYPE: &str = "type";

// ---------------------------------------------------------------------------
// Networks
// ---------------------------------------------------------------------------

/// A named VDA network. The network appears as the third segment of a DID
/// and as a query parameter inside verification-method and service ids.
///
/// Documents registered before networks existed have neither; lookups
/// against such documents must retry without the qualifier (see
/// [`crate::did::DidDocument`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// The real deal. Mistakes here are permanent.
    Mainnet,
    /// Where we break things on purpose and call it "testing."
    Testnet,
    /// Reset weekly, no promises, no survivors.
    Devnet,
}

impl Network {
    /// The lowercase network name as it appears inside DIDs and ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Devnet => "devnet",
        }
    }

    /// The EVM chain id backing this network's DID registry. Used in
    /// `blockchainAccountId` entries (`eip155:<chainId>:<address>`).
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => CHAIN_ID_MAINNET,
            Network::Testnet => CHAIN_ID_TESTNET,
            Network::Devnet => CHAIN_ID_DEVNET,
        }
    }

    /// Parse a network name. Returns `None` for unrecognized names — we
    /// don't guess.
    pub fn from_name(name: &str) -> Option<Network> {
        match name {
            "mainnet" => Some(Network::Mainnet),
            "testnet" => Some(Network::Testnet),
            "devnet" => Some(Network::Devnet),
            _ => None,
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chain id of the mainnet DID registry.
pub const CHAIN_ID_MAINNET: u64 = 7701;

/// Chain id of the testnet DID registry.
pub const CHAIN_ID_TESTNET: u64 = 7702;

/// Chain id of the devnet DID registry.
pub const CHAIN_ID_DEVNET: u64 = 7703;

/// Network assumed for legacy documents (no network segment in the DID).
/// Their recovery entries still need a chain id to point at.
pub const LEGACY_DEFAULT_NETWORK: Network = Network::Testnet;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Hex length of an uncompressed secp256k1 public key including the `0x`
/// prefix and the `04` tag byte: 2 + 2 + 128. Document construction rejects
/// anything else.
pub const UNCOMPRESSED_PUBLIC_KEY_HEX_LENGTH: usize = 132;

/// On-chain addresses are the last 20 bytes of the Keccak-256 of the raw
/// public key, rendered as EIP-55 checksummed hex.
pub const ADDRESS_LENGTH: usize = 20;

/// Ed25519 context signing keys: 32-byte public, 64-byte signatures.
pub const SIGN_KEY_LENGTH: usize = 32;
pub const SIGNATURE_LENGTH: usize = 64;

/// X25519 asymmetric (box) keys are 32 bytes on both sides.
pub const ASYM_KEY_LENGTH: usize = 32;

/// Symmetric database keys: AES-256-GCM. 32-byte keys, 96-bit nonces,
/// 128-bit tags. 12-byte nonces. Not 16. Not 8. Twelve.
pub const SYM_KEY_LENGTH: usize = 32;
pub const AES_NONCE_LENGTH: usize = 12;
pub const AES_TAG_LENGTH: usize = 16;

// ---------------------------------------------------------------------------
// Verification Method & Proof Types
// ---------------------------------------------------------------------------

/// Verification-method type for the base controller key.
pub const VM_TYPE_SECP256K1: &str = "EcdsaSecp256k1VerificationKey2019";

/// Verification-method type for the on-chain recovery entry.
pub const VM_TYPE_RECOVERY: &str = "EcdsaSecp256k1RecoveryMethod2020";

/// Verification-method type for per-context signing keys.
pub const VM_TYPE_ED25519: &str = "Ed25519VerificationKey2018";

/// Verification-method type for per-context key-agreement keys.
pub const VM_TYPE_X25519: &str = "X25519KeyAgreementKey2019";

/// Proof type for the whole-document self-assertion.
pub const PROOF_TYPE: &str = "EcdsaSecp256k1Signature2019";

/// Proof purpose for the whole-document self-assertion.
pub const PROOF_PURPOSE: &str = "assertionMethod";

// ---------------------------------------------------------------------------
// Key Derivation Domains
// ---------------------------------------------------------------------------

/// Suffixes hashed into the seed to derive each key of a keyring:
/// `SHA-256("{seed}-{suffix}")` feeds the respective key generator.
pub const KEY_TYPE_SIGN: &str = "sign";
pub const KEY_TYPE_ASYM: &str = "asym";
pub const KEY_TYPE_SYM: &str = "sym";

/// BLAKE3 `derive_key` context for per-context keyring seeds.
pub const CONTEXT_KEYRING_KDF: &str = "vda-context-keyring";

/// BLAKE3 `derive_key` context for the controller key derived from an
/// account seed.
pub const CONTROLLER_KEY_KDF: &str = "vda-controller-key";

/// BLAKE3 `derive_key` contexts for the two halves of a Diffie-Hellman
/// shared-key precomputation. The initiator calls `start`, the responder
/// `end`; both land on the same key.
pub const SHARED_KEY_KDF: &str = "vda-shared-key";

/// BLAKE3 `derive_key` context for ephemeral-static asymmetric encryption.
pub const ASYM_BOX_KDF: &str = "vda-asym-box";

/// BLAKE3 `derive_key` context prefix for per-database symmetric keys.
/// The database name is appended so every database gets an independent key.
pub const DATABASE_KEY_KDF: &str = "vda-database";

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Default result limit merged into every query that doesn't set one.
pub const DEFAULT_QUERY_LIMIT: usize = 20;

/// Context names whose hashes are recomputed when a document migrates to a
/// new DID. These are the first-party application contexts every account
/// carries; third-party contexts must re-register after migration because
/// their hashes are derived from the old DID string.
pub const MIGRATION_CONTEXTS: &[&str] = &["VDA: Vault", "VDA: Messaging", "VDA: Profile"];
