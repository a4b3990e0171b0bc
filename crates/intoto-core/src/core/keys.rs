// crates/intoto-core/src/core/keys.rs
// ============================================================================
// Module: in-toto Keys and Signatures
// Description: Public key records, key id derivation, and detached signatures.
// Purpose: Bind signatures on layouts and links to authorized keys.
// Dependencies: serde, crate::core::hashing
// ============================================================================

//! ## Overview
//! A [`PublicKey`] is the serialized key record carried in a layout's `keys`
//! map and in owner key files. Its [`KeyId`] is the SHA-256 digest of the
//! key's canonical JSON, so a key id cannot be reassigned to different key
//! material without detection. Cryptographic verification itself is delegated
//! to a [`crate::interfaces::SignatureVerifier`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashError;
use crate::core::hashing::canonical_json_bytes;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::KeyId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Key type label for ed25519 keys.
pub const ED25519_KEYTYPE: &str = "ed25519";

/// Signature scheme label for ed25519 keys.
pub const ED25519_SCHEME: &str = "ed25519";

/// Member excluded from signing payloads.
const SIGNATURES_FIELD: &str = "signatures";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Public portion of a key value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    /// Encoded public key material (hex for ed25519).
    pub public: String,
}

/// Serialized public key record.
///
/// # Invariants
/// - The key id is derived from the canonical JSON of this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    /// Key type label (for example `ed25519`).
    pub keytype: String,
    /// Signature scheme label.
    pub scheme: String,
    /// Public key value.
    pub keyval: KeyValue,
    /// Hash algorithms that may be used to compute the key id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyid_hash_algorithms: Option<Vec<String>>,
}

impl PublicKey {
    /// Builds an ed25519 key record from hex-encoded public bytes.
    #[must_use]
    pub fn ed25519(public_hex: impl Into<String>) -> Self {
        Self {
            keytype: ED25519_KEYTYPE.to_string(),
            scheme: ED25519_SCHEME.to_string(),
            keyval: KeyValue {
                public: public_hex.into(),
            },
            keyid_hash_algorithms: None,
        }
    }

    /// Computes the key id of this record.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the record cannot be canonicalized.
    pub fn key_id(&self) -> Result<KeyId, HashError> {
        hash_canonical_json(DEFAULT_HASH_ALGORITHM, self).map(KeyId::new)
    }
}

/// Detached signature over a canonical payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Id of the signing key.
    pub keyid: KeyId,
    /// Lowercase hex signature bytes.
    pub sig: String,
}

// ============================================================================
// SECTION: Signing Payload
// ============================================================================

/// Returns the canonical bytes a signature over `record` covers.
///
/// The payload is the canonical JSON of the record with its top-level
/// `signatures` member removed.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when the record cannot be serialized.
pub fn signing_payload<T: Serialize>(record: &T) -> Result<Vec<u8>, HashError> {
    let mut value = serde_json::to_value(record)
        .map_err(|err| HashError::Canonicalization(err.to_string()))?;
    if let Value::Object(members) = &mut value {
        members.remove(SIGNATURES_FIELD);
    }
    canonical_json_bytes(&value)
}
