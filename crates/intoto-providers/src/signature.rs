// crates/intoto-providers/src/signature.rs
// ============================================================================
// Module: Ed25519 Signature Verifier
// Description: Strict ed25519 verification of layout and link signatures.
// Purpose: Back the core signature interface with ed25519-dalek.
// Dependencies: ed25519-dalek, intoto-core
// ============================================================================

//! ## Overview
//! Keys carry their 32 public bytes as hex in `keyval.public`; signatures are
//! 64 bytes of hex. Verification uses `verify_strict`, which rejects weak keys
//! and malleable signatures.

// ============================================================================
// SECTION: Imports
// ============================================================================

use ed25519_dalek::Signature as Ed25519Signature;
use ed25519_dalek::VerifyingKey;
use intoto_core::PublicKey;
use intoto_core::Signature;
use intoto_core::SignatureError;
use intoto_core::SignatureVerifier;
use intoto_core::hashing::hex_decode;
use intoto_core::keys::ED25519_KEYTYPE;
use intoto_core::keys::ED25519_SCHEME;

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Signature verifier for `ed25519` keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519SignatureVerifier;

impl SignatureVerifier for Ed25519SignatureVerifier {
    fn verify(
        &self,
        key: &PublicKey,
        signature: &Signature,
        payload: &[u8],
    ) -> Result<(), SignatureError> {
        let verifying_key = verifying_key(key)?;
        let sig_bytes = hex_decode(&signature.sig)
            .map_err(|err| SignatureError::MalformedSignature(err.to_string()))?;
        let sig = Ed25519Signature::from_slice(&sig_bytes)
            .map_err(|_| SignatureError::MalformedSignature("expected 64 bytes".to_string()))?;
        verifying_key.verify_strict(payload, &sig).map_err(|_| SignatureError::Invalid)
    }
}

/// Decodes the verifying key of an ed25519 key record.
fn verifying_key(key: &PublicKey) -> Result<VerifyingKey, SignatureError> {
    if key.keytype != ED25519_KEYTYPE || key.scheme != ED25519_SCHEME {
        return Err(SignatureError::UnsupportedKey {
            keytype: key.keytype.clone(),
            scheme: key.scheme.clone(),
        });
    }
    let bytes = hex_decode(&key.keyval.public)
        .map_err(|err| SignatureError::MalformedKey(err.to_string()))?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| SignatureError::MalformedKey("expected 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|_| SignatureError::MalformedKey("invalid ed25519 point".to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
