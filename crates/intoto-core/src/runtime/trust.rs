// crates/intoto-core/src/runtime/trust.rs
// ============================================================================
// Module: in-toto Trust Verification
// Description: Layout expiry, owner signatures, and step signature thresholds.
// Purpose: Authenticate the layout and every link before rules are evaluated.
// Dependencies: serde, time, crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Trust verification establishes that the layout comes from its owner and is
//! still valid, and that each step's link evidence is signed by at least
//! `threshold` distinct keys the layout authorizes for that step. A valid
//! signature by a key the step does not authorize never counts. Command
//! alignment is advisory and reported as a [`CommandMismatch`] finding.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::CommandMismatch;
use crate::core::KeyId;
use crate::core::Layout;
use crate::core::Link;
use crate::core::PublicKey;
use crate::core::Signature;
use crate::core::Step;
use crate::core::StepName;
use crate::core::time::is_expired;
use crate::interfaces::SignatureVerifier;

// ============================================================================
// SECTION: Types
// ============================================================================

/// How many supplied owner keys must have signed the layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerSignaturePolicy {
    /// At least one owner key has a valid signature.
    #[default]
    AnyOwner,
    /// Every owner key has a valid signature.
    AllOwners,
}

/// Link evidence of a step that met its signature threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedStep {
    /// Link used for rule verification.
    pub link: Link,
    /// Distinct authorized keys with a valid signature, in key id order.
    pub signers: Vec<KeyId>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Trust verification failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrustError {
    /// Layout expired before the verification instant.
    #[error("layout expired at {expires}")]
    LayoutExpired {
        /// Layout `expires` value.
        expires: String,
    },
    /// Layout `expires` could not be parsed.
    #[error("malformed layout expiry: {0}")]
    MalformedExpiry(String),
    /// No owner keys were supplied.
    #[error("no layout owner keys supplied")]
    NoOwnerKeys,
    /// Owner signatures do not satisfy the policy.
    #[error("layout signature verification failed: {0}")]
    LayoutSignature(String),
    /// A step link set has too few valid authorized signatures.
    #[error("step {step} requires {required} valid signatures from authorized keys, found {found}")]
    Threshold {
        /// Step name.
        step: StepName,
        /// Required distinct keys.
        required: u32,
        /// Distinct keys with a valid signature.
        found: usize,
    },
    /// Links contributing to a threshold disagree on their artifacts.
    #[error("links for step {step} signed by {keys} report different artifacts")]
    ThresholdConstraint {
        /// Step name.
        step: StepName,
        /// Signing keys of the contributing links, comma separated.
        keys: String,
    },
    /// Canonical payload could not be computed.
    #[error("failed to compute signing payload: {0}")]
    Payload(String),
}

// ============================================================================
// SECTION: Layout Checks
// ============================================================================

/// Fails when the layout expired strictly before `at`.
///
/// # Errors
///
/// Returns [`TrustError::LayoutExpired`] or [`TrustError::MalformedExpiry`].
pub fn check_expiry(layout: &Layout, at: OffsetDateTime) -> Result<(), TrustError> {
    let expires = layout.expiry().map_err(|err| TrustError::MalformedExpiry(err.to_string()))?;
    if is_expired(expires, at) {
        return Err(TrustError::LayoutExpired {
            expires: layout.expires.clone(),
        });
    }
    Ok(())
}

/// Verifies owner signatures on the layout and returns the owners that signed.
///
/// # Errors
///
/// Returns [`TrustError`] when no owner key is supplied or the policy is not met.
pub fn verify_layout_signatures(
    layout: &Layout,
    owner_keys: &[PublicKey],
    policy: OwnerSignaturePolicy,
    verifier: &dyn SignatureVerifier,
) -> Result<Vec<KeyId>, TrustError> {
    if owner_keys.is_empty() {
        return Err(TrustError::NoOwnerKeys);
    }
    let payload = layout.signed_payload().map_err(|err| TrustError::Payload(err.to_string()))?;
    let mut signed = Vec::new();
    for key in owner_keys {
        let key_id = key.key_id().map_err(|err| TrustError::Payload(err.to_string()))?;
        if has_valid_signature(&layout.signatures, &key_id, key, &payload, verifier) {
            signed.push(key_id);
        } else if policy == OwnerSignaturePolicy::AllOwners {
            return Err(TrustError::LayoutSignature(format!(
                "no valid signature by owner key {key_id}"
            )));
        }
    }
    if signed.is_empty() {
        return Err(TrustError::LayoutSignature(
            "no valid signature by any owner key".to_string(),
        ));
    }
    Ok(signed)
}

/// Returns true when any signature by `key_id` verifies over `payload`.
fn has_valid_signature(
    signatures: &[Signature],
    key_id: &KeyId,
    key: &PublicKey,
    payload: &[u8],
    verifier: &dyn SignatureVerifier,
) -> bool {
    signatures
        .iter()
        .filter(|signature| &signature.keyid == key_id)
        .any(|signature| verifier.verify(key, signature, payload).is_ok())
}

// ============================================================================
// SECTION: Step Checks
// ============================================================================

/// Verifies the signature threshold of one step over its links.
///
/// Every link recorded for the step is considered. A key counts once, no
/// matter how many links or signatures it contributes. Links that contributed
/// a valid signature must agree on materials and products; the link of the
/// lowest signing key id is the one returned.
///
/// # Errors
///
/// Returns [`TrustError::Threshold`] when too few distinct authorized keys
/// signed, or [`TrustError::ThresholdConstraint`] when contributing links
/// disagree.
pub fn verify_step_links(
    step: &Step,
    links: &[Link],
    layout: &Layout,
    verifier: &dyn SignatureVerifier,
) -> Result<VerifiedStep, TrustError> {
    let mut signed_by: BTreeMap<KeyId, usize> = BTreeMap::new();
    for (index, link) in links.iter().enumerate() {
        let payload = link.signed_payload().map_err(|err| TrustError::Payload(err.to_string()))?;
        for signature in &link.signatures {
            if signed_by.contains_key(&signature.keyid) || !step.pubkeys.contains(&signature.keyid)
            {
                continue;
            }
            let Some(key) = layout.keys.get(&signature.keyid) else {
                continue;
            };
            if verifier.verify(key, signature, &payload).is_ok() {
                signed_by.insert(signature.keyid.clone(), index);
            }
        }
    }
    let found = signed_by.len();
    let threshold_met = usize::try_from(step.threshold).is_ok_and(|required| found >= required);
    let chosen = signed_by.values().next().copied().filter(|_| threshold_met);
    let Some(chosen) = chosen else {
        return Err(TrustError::Threshold {
            step: step.name.clone(),
            required: step.threshold,
            found,
        });
    };
    let reference = &links[chosen];
    let agree = signed_by.values().all(|index| {
        let link = &links[*index];
        link.materials == reference.materials && link.products == reference.products
    });
    if !agree {
        let keys = signed_by.keys().map(KeyId::as_str).collect::<Vec<_>>().join(", ");
        return Err(TrustError::ThresholdConstraint {
            step: step.name.clone(),
            keys,
        });
    }
    Ok(VerifiedStep {
        link: reference.clone(),
        signers: signed_by.into_keys().collect(),
    })
}

/// Compares the recorded command with the expected command.
#[must_use]
pub fn command_alignment(step: &Step, link: &Link) -> Option<CommandMismatch> {
    if step.expected_command.is_empty() || step.expected_command == link.command {
        return None;
    }
    Some(CommandMismatch {
        step: step.name.clone(),
        expected: step.expected_command.clone(),
        actual: link.command.clone(),
    })
}
