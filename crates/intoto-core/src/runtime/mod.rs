// crates/intoto-core/src/runtime/mod.rs
// ============================================================================
// Module: in-toto Runtime
// Description: Rule engine, trust checks, and the verification state machine.
// Purpose: Decide whether link evidence satisfies a signed layout.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules evaluate a layout against link evidence. Verification is a
//! pure function of the layout, the links, the owner keys, and the supplied
//! instant; the only mutation is the per-run addition of inspection links.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod rules;
pub mod trust;
pub mod verifier;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use rules::ResolvedLinks;
pub use rules::RuleContext;
pub use rules::RuleFailure;
pub use rules::RuleVerificationError;
pub use rules::verify_rules;
pub use trust::OwnerSignaturePolicy;
pub use trust::TrustError;
pub use trust::VerifiedStep;
pub use verifier::LayoutVerifier;
pub use verifier::SUMMARY_LINK_NAME;
pub use verifier::StepSigners;
pub use verifier::VerificationError;
pub use verifier::VerificationReport;
pub use verifier::VerifierConfig;
