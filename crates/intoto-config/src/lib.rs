// crates/intoto-config/src/lib.rs
// ============================================================================
// Module: in-toto Verify Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for intoto-verify.toml semantics.
// Dependencies: intoto-core, intoto-providers, serde, toml
// ============================================================================

//! ## Overview
//! `intoto-config` defines the configuration model for the `intoto-verify`
//! binary. It provides strict, fail-closed validation and converts each
//! section into the explicit runtime structs the verifier and its
//! collaborators take at construction.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
