// crates/intoto-core/src/interfaces/mod.rs
// ============================================================================
// Module: in-toto Interfaces
// Description: Collaborator contracts for signatures, hashing, commands, audit.
// Purpose: Keep the verifier independent of cryptography and the host system.
// Dependencies: thiserror, crate::core
// ============================================================================

//! ## Overview
//! The verifier never reads files, runs processes, or performs cryptography
//! itself. Hosts plug those capabilities in through the traits below.
//! Implementations must be deterministic for identical inputs and fail closed:
//! an error is always treated as a verification failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::ArtifactDigest;
use crate::core::ArtifactSet;
use crate::core::Byproducts;
use crate::core::PublicKey;
use crate::core::Signature;
use crate::core::VerificationAuditEvent;

// ============================================================================
// SECTION: Signature Verification
// ============================================================================

/// Signature verification errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// Key type or scheme is not supported by the verifier.
    #[error("unsupported key type {keytype} with scheme {scheme}")]
    UnsupportedKey {
        /// Key type label.
        keytype: String,
        /// Scheme label.
        scheme: String,
    },
    /// Key material could not be decoded.
    #[error("malformed public key: {0}")]
    MalformedKey(String),
    /// Signature bytes could not be decoded.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
    /// Signature does not verify over the payload.
    #[error("signature does not match payload")]
    Invalid,
}

/// Verifies detached signatures over canonical payloads.
pub trait SignatureVerifier {
    /// Verifies `signature` by `key` over `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] when the key or signature is malformed or
    /// the signature is not valid.
    fn verify(
        &self,
        key: &PublicKey,
        signature: &Signature,
        payload: &[u8],
    ) -> Result<(), SignatureError>;
}

// ============================================================================
// SECTION: Artifact Hashing
// ============================================================================

/// Artifact hashing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HasherError {
    /// Artifact could not be read.
    #[error("failed to read artifact {artifact}: {reason}")]
    Io {
        /// Artifact identifier.
        artifact: String,
        /// Underlying message.
        reason: String,
    },
    /// Snapshot exceeded the configured artifact count.
    #[error("artifact count exceeds limit {limit}")]
    TooManyArtifacts {
        /// Configured limit.
        limit: usize,
    },
    /// Hasher configuration is invalid.
    #[error("invalid hasher configuration: {0}")]
    Config(String),
}

/// Produces artifact digests for inspections.
pub trait ArtifactHasher {
    /// Hashes one artifact by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`HasherError`] when the artifact cannot be read.
    fn hash(&self, artifact: &str) -> Result<ArtifactDigest, HasherError>;

    /// Hashes every artifact in scope.
    ///
    /// # Errors
    ///
    /// Returns [`HasherError`] when traversal or hashing fails.
    fn snapshot(&self) -> Result<ArtifactSet, HasherError>;
}

// ============================================================================
// SECTION: Command Execution
// ============================================================================

/// Command execution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunnerError {
    /// Command is empty.
    #[error("command is empty")]
    EmptyCommand,
    /// Process could not be spawned or awaited.
    #[error("failed to run {program}: {reason}")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying message.
        reason: String,
    },
}

/// Runs inspection commands.
pub trait CommandRunner {
    /// Runs `command` to completion and captures its output.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] when the process cannot be started.
    fn run(&self, command: &[String]) -> Result<Byproducts, RunnerError>;
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Receives verification audit events.
pub trait VerificationAuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &VerificationAuditEvent);
}

/// Audit sink that discards every event.
pub struct NoopAuditSink;

impl VerificationAuditSink for NoopAuditSink {
    fn record(&self, _event: &VerificationAuditEvent) {}
}
