// crates/intoto-core/src/lib.rs
// ============================================================================
// Module: in-toto Core Library
// Description: Public API surface for in-toto layout verification.
// Purpose: Expose core types, collaborator interfaces, and the verifier.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! in-toto core verifies that the link evidence produced by a supply chain
//! matches the layout its owner signed. It models layouts, links, and
//! matchrules; evaluates rules with queue-consumption semantics; checks
//! signature thresholds; and sequences everything into one fail-closed
//! verification run. Cryptography, hashing, and command execution are
//! supplied by the host through [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ArtifactHasher;
pub use interfaces::CommandRunner;
pub use interfaces::HasherError;
pub use interfaces::NoopAuditSink;
pub use interfaces::RunnerError;
pub use interfaces::SignatureError;
pub use interfaces::SignatureVerifier;
pub use interfaces::VerificationAuditSink;
pub use runtime::LayoutVerifier;
pub use runtime::OwnerSignaturePolicy;
pub use runtime::RuleVerificationError;
pub use runtime::TrustError;
pub use runtime::VerificationError;
pub use runtime::VerificationReport;
pub use runtime::VerifierConfig;
