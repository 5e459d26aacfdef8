//! # DID Compatibility
//!
//! The `did:vda:` method maps on-chain account addresses into the W3C DID
//! ecosystem:
//!
//! ```text
//! did:vda:<network>:<address>
//! did:vda:<address>              (legacy, pre-network documents)
//! ```
//!
//! The address is an EIP-55 checksummed hex address recovered from an
//! uncompressed secp256k1 public key. Two DIDs are the same identity when
//! they compare equal case-insensitively; every hash and lookup in the
//! protocol uses the lower-cased canonical form, so the checksummed casing
//! is cosmetic and the lowercase string is law.

use serde::{Deserialize, Serialize};

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::config::{
    Network, CONTROLLER_KEY_KDF, DID_METHOD, DID_PREFIX, LEGACY_DEFAULT_NETWORK,
    UNCOMPRESSED_PUBLIC_KEY_HEX_LENGTH,
};
use crate::crypto::{derive_domain_key, keccak256, raw_address, to_checksum_address};
use crate::error::Error;

// ---------------------------------------------------------------------------
// Did
// ---------------------------------------------------------------------------

/// A parsed `did:vda` identifier.
///
/// Stores the checksummed address for display; comparison, hashing, and
/// every derived identifier use the lower-cased canonical form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct Did {
    /// The network segment. `None` for legacy documents.
    network: Option<Network>,
    /// EIP-55 checksummed `0x` address.
    address: String,
}

impl Did {
    /// Build a DID from a network and a raw or checksummed address.
    /// The address is re-checksummed so formatting is uniform.
    pub fn new(network: Option<Network>, address: &str) -> Result<Self, Error> {
        let bytes = decode_address(address)?;
        Ok(Self {
            network,
            address: to_checksum_address(&bytes),
        })
    }

    /// Derive a DID from an uncompressed secp256k1 public key
    /// (`0x04`-prefixed, 132 hex chars total).
    pub fn from_public_key(network: Option<Network>, public_key_hex: &str) -> Result<Self, Error> {
        let address = address_from_public_key(public_key_hex)?;
        Self::new(network, &address)
    }

    /// Parse a DID string. Accepts both the network-qualified and the
    /// legacy two-segment form.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let segments: Vec<&str> = input.split(':').collect();
        match segments.as_slice() {
            ["did", method, address] if method.eq_ignore_ascii_case(DID_METHOD) => {
                Self::new(None, address)
            }
            ["did", method, network, address] if method.eq_ignore_ascii_case(DID_METHOD) => {
                let network = Network::from_name(&network.to_lowercase()).ok_or_else(|| {
                    Error::Validation(format!("unknown network '{network}' in DID '{input}'"))
                })?;
                Self::new(Some(network), address)
            }
            _ => Err(Error::Validation(format!(
                "malformed DID '{input}': expected '{DID_PREFIX}:[<network>:]<address>'"
            ))),
        }
    }

    /// The network segment, if any. `None` means a legacy document.
    pub fn network(&self) -> Option<Network> {
        self.network
    }

    /// The network to use for chain-facing values (recovery chain id) when
    /// the DID itself carries none.
    pub fn network_or_default(&self) -> Network {
        self.network.unwrap_or(LEGACY_DEFAULT_NETWORK)
    }

    /// The EIP-55 checksummed address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The lower-cased address, as used inside proofs and hashes.
    pub fn address_lower(&self) -> String {
        self.address.to_lowercase()
    }

    /// The canonical lower-cased DID string. This is the form embedded in
    /// document ids and hashed into context hashes.
    pub fn canonical(&self) -> String {
        self.to_string().to_lowercase()
    }

    /// The context hash for an application context name:
    /// `0x` + Keccak-256 of `"{canonical_did}/{context_name}"`.
    ///
    /// Stable for the life of the (did, name) pair. The raw name never
    /// appears in a persisted document; the hash is the only identifier
    /// that leaves the process.
    pub fn context_hash(&self, context_name: &str) -> String {
        let input = format!("{}/{}", self.canonical(), context_name);
        format!("0x{}", hex::encode(keccak256(input.as_bytes())))
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.network {
            Some(network) => write!(f, "{DID_PREFIX}:{network}:{}", self.address),
            None => write!(f, "{DID_PREFIX}:{}", self.address),
        }
    }
}

impl PartialEq for Did {
    /// Same identity when the canonical (lower-cased) forms match.
    fn eq(&self, other: &Self) -> bool {
        self.network == other.network && self.address.eq_ignore_ascii_case(&other.address)
    }
}

impl Eq for Did {}

impl std::hash::Hash for Did {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl TryFrom<String> for Did {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Error> {
        Did::parse(&value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> String {
        did.to_string()
    }
}

impl std::str::FromStr for Did {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Error> {
        Did::parse(s)
    }
}

// ---------------------------------------------------------------------------
// ControllerKey
// ---------------------------------------------------------------------------

/// The secp256k1 key controlling a DID on chain.
///
/// This key IS the identity: it owns the registry entry, signs context
/// ownership proofs, and signs the whole-document self-assertion. Guard it
/// accordingly.
pub struct ControllerKey {
    secret: SigningKey,
}

impl ControllerKey {
    /// Derive a controller key deterministically from an account seed.
    ///
    /// The KDF output is rejected and re-hashed in the astronomically
    /// unlikely case it falls outside the secp256k1 scalar range, so this
    /// always terminates with a valid key.
    pub fn from_seed(seed: &str) -> Self {
        let mut digest = derive_domain_key(CONTROLLER_KEY_KDF, seed.as_bytes());
        loop {
            if let Ok(secret) = SigningKey::from_bytes(&digest.into()) {
                return Self { secret };
            }
            digest = derive_domain_key(CONTROLLER_KEY_KDF, &digest);
        }
    }

    /// Reconstruct a controller key from raw 32-byte secret material.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, Error> {
        let secret = SigningKey::from_bytes(&(*bytes).into())
            .map_err(|_| Error::Validation("invalid secp256k1 secret key bytes".into()))?;
        Ok(Self { secret })
    }

    /// The uncompressed public key as `0x04…` hex (132 chars).
    pub fn public_key_hex(&self) -> String {
        let point = self.secret.verifying_key().to_encoded_point(false);
        format!("0x{}", hex::encode(point.as_bytes()))
    }

    /// The EIP-55 checksummed address of this key.
    pub fn address(&self) -> String {
        let point = self.secret.verifying_key().to_encoded_point(false);
        // Skip the 0x04 tag byte; the address hashes the raw coordinates.
        to_checksum_address(&raw_address(&point.as_bytes()[1..]))
    }

    /// The DID controlled by this key on the given network.
    pub fn did(&self, network: Option<Network>) -> Did {
        Did::new(network, &self.address()).expect("own address is well-formed")
    }

    /// Sign a message: ECDSA over the Keccak-256 digest, rendered as
    /// `0x` + 64-byte `r||s` hex. Deterministic (RFC 6979).
    pub fn sign(&self, message: &[u8]) -> String {
        let digest = keccak256(message);
        let signature: Signature = self
            .secret
            .sign_prehash(&digest)
            .expect("32-byte prehash always signs");
        format!("0x{}", hex::encode(signature.to_vec()))
    }
}

impl std::fmt::Debug for ControllerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ControllerKey(address={})", self.address())
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Recover the checksummed address from an uncompressed secp256k1 public
/// key (`0x04`-prefixed, 132 hex chars). This is the validation gate for
/// document construction: anything shorter, compressed, or untagged is a
/// hard error.
pub fn address_from_public_key(public_key_hex: &str) -> Result<String, Error> {
    let bytes = validate_uncompressed_public_key(public_key_hex)?;
    Ok(to_checksum_address(&raw_address(&bytes[1..])))
}

/// Validate and decode an uncompressed public key, returning the 65 raw
/// bytes (tag + coordinates).
pub fn validate_uncompressed_public_key(public_key_hex: &str) -> Result<Vec<u8>, Error> {
    if public_key_hex.len() != UNCOMPRESSED_PUBLIC_KEY_HEX_LENGTH
        || !public_key_hex.starts_with("0x04")
    {
        return Err(Error::Validation(format!(
            "public key must be an uncompressed 0x04-prefixed secp256k1 key \
             ({UNCOMPRESSED_PUBLIC_KEY_HEX_LENGTH} hex chars), got {} chars",
            public_key_hex.len()
        )));
    }
    let bytes = hex::decode(&public_key_hex[2..])
        .map_err(|_| Error::Validation("public key is not valid hex".into()))?;
    // Cheap structural check above, real curve check here.
    VerifyingKey::from_sec1_bytes(&bytes)
        .map_err(|_| Error::Validation("public key is not a point on secp256k1".into()))?;
    Ok(bytes)
}

/// Verify a controller signature (as produced by [`ControllerKey::sign`])
/// against an uncompressed public key. Malformed input verifies as `false`.
pub fn verify_controller_signature(
    public_key_hex: &str,
    message: &[u8],
    signature_hex: &str,
) -> bool {
    let Ok(key_bytes) = validate_uncompressed_public_key(public_key_hex) else {
        return false;
    };
    let Ok(verifying) = VerifyingKey::from_sec1_bytes(&key_bytes) else {
        return false;
    };
    let stripped = signature_hex.strip_prefix("0x").unwrap_or(signature_hex);
    let Ok(sig_bytes) = hex::decode(stripped) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&sig_bytes) else {
        return false;
    };
    verifying
        .verify_prehash(&keccak256(message), &signature)
        .is_ok()
}

fn decode_address(address: &str) -> Result<[u8; 20], Error> {
    let stripped = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| {
            Error::Validation(format!("address '{address}' is missing the 0x prefix"))
        })?;
    let bytes = hex::decode(stripped)
        .map_err(|_| Error::Validation(format!("address '{address}' is not valid hex")))?;
    bytes.as_slice().try_into().map_err(|_| {
        Error::Validation(format!(
            "address '{address}' must be 20 bytes, got {}",
            bytes.len()
        ))
    })
}
