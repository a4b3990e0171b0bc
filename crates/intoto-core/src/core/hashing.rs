// crates/intoto-core/src/core/hashing.rs
// ============================================================================
// Module: in-toto Canonical Hashing
// Description: RFC 8785 JSON canonicalization and artifact digest utilities.
// Purpose: Provide deterministic signing payloads and artifact digest sets.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Signing payloads are the RFC 8785 (JCS) canonical JSON of layout and link
//! records. Artifacts are described by an [`ArtifactDigest`]: a mapping from
//! hash algorithm name to lowercase hex digest. Two digests are equal only when
//! the full mappings are structurally equal; no serialization round-trip is
//! involved in the comparison.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use sha2::Sha512;
use thiserror::Error;

// ============================================================================
// SECTION: Hash Algorithm
// ============================================================================

/// Supported artifact hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256 hashing.
    Sha256,
    /// SHA-512 hashing.
    Sha512,
}

impl HashAlgorithm {
    /// Returns the algorithm name used as a digest map key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default hash algorithm for artifacts and key ids.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

// ============================================================================
// SECTION: Artifact Digest
// ============================================================================

/// Digest set recorded for one artifact (`algorithm -> hex digest`).
///
/// # Invariants
/// - Equality is structural over the whole mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactDigest(BTreeMap<String, String>);

impl ArtifactDigest {
    /// Creates an empty digest set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Computes a digest set over raw bytes for each requested algorithm.
    #[must_use]
    pub fn from_bytes(algorithms: &[HashAlgorithm], bytes: &[u8]) -> Self {
        let mut digests = BTreeMap::new();
        for algorithm in algorithms {
            digests.insert(algorithm.as_str().to_string(), hash_bytes(*algorithm, bytes));
        }
        Self(digests)
    }

    /// Adds or replaces the digest for an algorithm name.
    #[must_use]
    pub fn with(mut self, algorithm: impl Into<String>, hex_digest: impl Into<String>) -> Self {
        self.0.insert(algorithm.into(), hex_digest.into());
        self
    }

    /// Returns the digest recorded for an algorithm name.
    #[must_use]
    pub fn get(&self, algorithm: &str) -> Option<&str> {
        self.0.get(algorithm).map(String::as_str)
    }

    /// Returns true when no digest is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(algorithm, digest)` pairs in algorithm order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(algorithm, digest)| (algorithm.as_str(), digest.as_str()))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing canonical payloads or decoding digests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    /// The value could not be serialized canonically.
    #[error("canonical json encoding failed: {0}")]
    Canonicalization(String),
    /// Hex input was malformed.
    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Serializes `value` as RFC 8785 (JCS) bytes.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes canonical JSON and returns the lowercase hex digest.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<String, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

/// Hashes raw bytes and returns the lowercase hex digest.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            hex_encode(&hasher.finalize())
        }
        HashAlgorithm::Sha512 => {
            let mut hasher = Sha512::new();
            hasher.update(bytes);
            hex_encode(&hasher.finalize())
        }
    }
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Lowercase hex of `bytes`.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

/// Decodes a hex string (either case) into bytes.
///
/// # Errors
///
/// Returns [`HashError::InvalidHex`] on odd length or non-hex characters.
pub fn hex_decode(text: &str) -> Result<Vec<u8>, HashError> {
    let bytes = text.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(HashError::InvalidHex("odd number of hex digits".to_string()));
    }
    let mut out = Vec::with_capacity(bytes.len() / 2);
    for pair in bytes.chunks_exact(2) {
        let high = hex_value(pair[0])?;
        let low = hex_value(pair[1])?;
        out.push((high << 4) | low);
    }
    Ok(out)
}

/// Returns the numeric value of one hex digit.
fn hex_value(digit: u8) -> Result<u8, HashError> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        other => {
            Err(HashError::InvalidHex(format!("unexpected character '{}'", char::from(other))))
        }
    }
}
