// crates/intoto-providers/src/lib.rs
// ============================================================================
// Module: in-toto Providers
// Description: Host implementations of the verifier collaborator interfaces.
// Purpose: Supply signatures, hashing, process execution, and metadata files.
// Dependencies: intoto-core, ed25519-dalek, globset, serde_json
// ============================================================================

//! ## Overview
//! This crate provides the collaborators a real verification run needs:
//! ed25519 signature checks, a filesystem artifact hasher, a process runner for
//! inspections, bounded loaders for layout, key, and link files, and JSON line
//! audit sinks. Every file read is size-limited because metadata and working
//! trees are untrusted input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod hasher;
pub mod loader;
pub mod runner;
pub mod signature;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::StderrAuditSink;
pub use hasher::ArtifactHasherConfig;
pub use hasher::FileArtifactHasher;
pub use loader::LoadError;
pub use loader::MetadataLimits;
pub use loader::load_layout;
pub use loader::load_links;
pub use loader::load_public_key;
pub use runner::CommandRunnerConfig;
pub use runner::ProcessCommandRunner;
pub use signature::Ed25519SignatureVerifier;
