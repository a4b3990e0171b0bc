// crates/intoto-core/src/core/mod.rs
// ============================================================================
// Module: in-toto Core Types
// Description: Canonical records for layouts, links, rules, keys, and state.
// Purpose: Provide the serializable data model shared by every crate.
// Dependencies: serde, serde_jcs, sha2, globset, time
// ============================================================================

//! ## Overview
//! Core types are pure data plus construction-time validation. They never
//! touch the filesystem, spawn processes, or read the clock.

pub mod audit;
pub mod hashing;
pub mod identifiers;
pub mod keys;
pub mod layout;
pub mod link;
pub mod matchrule;
pub mod pattern;
pub mod state;
pub mod time;

pub use audit::AuditEventKind;
pub use audit::VerificationAuditEvent;
pub use hashing::ArtifactDigest;
pub use hashing::HashAlgorithm;
pub use hashing::HashError;
pub use identifiers::KeyId;
pub use identifiers::StepName;
pub use keys::PublicKey;
pub use keys::Signature;
pub use layout::Inspection;
pub use layout::Layout;
pub use layout::LayoutError;
pub use layout::LayoutItem;
pub use layout::Step;
pub use link::ArtifactSet;
pub use link::Byproducts;
pub use link::Link;
pub use link::LinkError;
pub use link::LinkSet;
pub use link::MetadataType;
pub use matchrule::ArtifactKind;
pub use matchrule::MalformedRule;
pub use matchrule::MatchRule;
pub use matchrule::Matchrule;
pub use matchrule::ParsedRule;
pub use matchrule::RuleKind;
pub use state::CommandMismatch;
pub use state::VerificationState;
pub use state::VerificationStatus;
