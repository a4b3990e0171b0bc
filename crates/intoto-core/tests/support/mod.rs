// crates/intoto-core/tests/support/mod.rs
// ============================================================================
// Module: Test Support
// Description: Deterministic collaborators and fixtures for verifier tests.
// ============================================================================
//! ## Overview
//! Shared helpers for the in-toto core integration tests. Signatures are
//! simulated with a keyed SHA-256 digest so tests stay deterministic without
//! real cryptography.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    dead_code,
    reason = "Test-only helpers; not every test binary uses every helper."
)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use intoto_core::ArtifactDigest;
use intoto_core::ArtifactHasher;
use intoto_core::ArtifactSet;
use intoto_core::Byproducts;
use intoto_core::CommandRunner;
use intoto_core::HashAlgorithm;
use intoto_core::HasherError;
use intoto_core::KeyId;
use intoto_core::Layout;
use intoto_core::Link;
use intoto_core::Matchrule;
use intoto_core::MetadataType;
use intoto_core::PublicKey;
use intoto_core::RunnerError;
use intoto_core::Signature;
use intoto_core::SignatureError;
use intoto_core::SignatureVerifier;
use intoto_core::Step;
use intoto_core::VerificationAuditEvent;
use intoto_core::VerificationAuditSink;
use intoto_core::hashing::hash_bytes;
use intoto_core::time::parse_expiry;
use time::OffsetDateTime;

// ========================================================================
// Time
// ========================================================================

/// Expiry far beyond any verification instant used in tests.
pub const FAR_FUTURE: &str = "2099-01-01T00:00:00Z";

/// Fixed verification instant.
pub fn verification_time() -> OffsetDateTime {
    parse_expiry("2025-06-01T12:00:00Z").expect("verification time")
}

// ========================================================================
// Keys and Signatures
// ========================================================================

/// Builds a deterministic key for a functionary label.
pub fn test_key(label: &str) -> PublicKey {
    PublicKey::ed25519(hash_bytes(HashAlgorithm::Sha256, label.as_bytes()))
}

/// Returns the key id of a test key.
pub fn key_id(key: &PublicKey) -> KeyId {
    key.key_id().expect("key id")
}

/// Computes the simulated signature of `payload` by `key`.
pub fn fake_signature(key: &PublicKey, payload: &[u8]) -> String {
    let mut bytes = key.keyval.public.as_bytes().to_vec();
    bytes.extend_from_slice(payload);
    hash_bytes(HashAlgorithm::Sha256, &bytes)
}

/// Signature verifier matching [`fake_signature`].
pub struct FakeSignatureVerifier;

impl SignatureVerifier for FakeSignatureVerifier {
    fn verify(
        &self,
        key: &PublicKey,
        signature: &Signature,
        payload: &[u8],
    ) -> Result<(), SignatureError> {
        if signature.sig == fake_signature(key, payload) {
            Ok(())
        } else {
            Err(SignatureError::Invalid)
        }
    }
}

/// Appends an owner signature to a layout.
pub fn sign_layout(layout: &mut Layout, key: &PublicKey) {
    let payload = layout.signed_payload().expect("layout payload");
    layout.signatures.push(Signature {
        keyid: key_id(key),
        sig: fake_signature(key, &payload),
    });
}

/// Appends a functionary signature to a link.
pub fn sign_link(link: &mut Link, key: &PublicKey) {
    let payload = link.signed_payload().expect("link payload");
    link.signatures.push(Signature {
        keyid: key_id(key),
        sig: fake_signature(key, &payload),
    });
}

// ========================================================================
// Artifacts and Rules
// ========================================================================

/// SHA-256 digest set of textual content.
pub fn digest(content: &str) -> ArtifactDigest {
    ArtifactDigest::from_bytes(&[HashAlgorithm::Sha256], content.as_bytes())
}

/// Builds an artifact set from `(path, content)` pairs.
pub fn artifacts(entries: &[(&str, &str)]) -> ArtifactSet {
    entries.iter().map(|(path, content)| ((*path).to_string(), digest(content))).collect()
}

/// Parses whitespace-separated rules.
pub fn rules(texts: &[&str]) -> Vec<Matchrule> {
    texts.iter().map(|text| text.parse().expect("rule")).collect()
}

// ========================================================================
// Layout Fixtures
// ========================================================================

/// Builds a step authorizing `keys` with the given threshold.
pub fn step(name: &str, keys: &[&PublicKey], threshold: u32) -> Step {
    Step {
        name: name.into(),
        expected_materials: Vec::new(),
        expected_products: Vec::new(),
        pubkeys: keys.iter().map(|key| key_id(key)).collect(),
        threshold,
        expected_command: Vec::new(),
    }
}

/// Builds an unsigned layout carrying `keys` as functionary keys.
pub fn layout(steps: Vec<Step>, keys: &[&PublicKey]) -> Layout {
    Layout {
        metadata_type: MetadataType::Layout,
        steps,
        inspect: Vec::new(),
        keys: keys.iter().map(|key| (key_id(key), (*key).clone())).collect::<BTreeMap<_, _>>(),
        expires: FAR_FUTURE.to_string(),
        readme: String::new(),
        signatures: Vec::new(),
    }
}

/// Builds the two-step `write-code` / `package` layout signed by `owner`.
pub fn two_step_layout(owner: &PublicKey, alice: &PublicKey, bob: &PublicKey) -> Layout {
    let mut write_code = step("write-code", &[alice], 1);
    write_code.expected_products = rules(&["CREATE foo.py"]);
    write_code.expected_command = vec!["vi".to_string(), "foo.py".to_string()];
    let mut package = step("package", &[bob], 1);
    package.expected_materials = rules(&["MATCH foo.py WITH PRODUCTS FROM write-code"]);
    package.expected_products =
        rules(&["CREATE foo.tar.gz", "MATCH foo.py WITH PRODUCTS FROM write-code"]);
    package.expected_command =
        vec!["tar".to_string(), "zcvf".to_string(), "foo.tar.gz".to_string(), "foo.py".to_string()];
    let mut layout = layout(vec![write_code, package], &[alice, bob]);
    sign_layout(&mut layout, owner);
    layout
}

/// Builds a link with the given artifacts and command, signed by `key`.
pub fn signed_link(
    name: &str,
    materials: ArtifactSet,
    products: ArtifactSet,
    command: &[&str],
    key: &PublicKey,
) -> Link {
    let mut link = Link {
        materials,
        products,
        command: command.iter().map(|part| (*part).to_string()).collect(),
        ..Link::new(name)
    };
    sign_link(&mut link, key);
    link
}

// ========================================================================
// Collaborators
// ========================================================================

/// Hasher returning a sequence of snapshots, repeating the last one.
pub struct SequenceHasher {
    /// Snapshots in call order.
    snapshots: Vec<ArtifactSet>,
    /// Index of the next snapshot.
    next: Mutex<usize>,
}

impl SequenceHasher {
    /// Creates a hasher over `snapshots`.
    pub fn new(snapshots: Vec<ArtifactSet>) -> Self {
        Self {
            snapshots,
            next: Mutex::new(0),
        }
    }

    /// Hasher that always reports an empty tree.
    pub fn empty() -> Self {
        Self::new(vec![ArtifactSet::new()])
    }
}

impl ArtifactHasher for SequenceHasher {
    fn hash(&self, artifact: &str) -> Result<ArtifactDigest, HasherError> {
        self.snapshots
            .last()
            .and_then(|snapshot| snapshot.get(artifact).cloned())
            .ok_or_else(|| HasherError::Io {
                artifact: artifact.to_string(),
                reason: "not found".to_string(),
            })
    }

    fn snapshot(&self) -> Result<ArtifactSet, HasherError> {
        let mut next = self.next.lock().expect("hasher lock");
        let index = (*next).min(self.snapshots.len().saturating_sub(1));
        *next += 1;
        Ok(self.snapshots.get(index).cloned().unwrap_or_default())
    }
}

/// Runner returning a fixed exit code and recording commands.
pub struct FixedRunner {
    /// Exit code reported for every command.
    return_value: Option<i32>,
    /// Commands received.
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl FixedRunner {
    /// Runner reporting `return_value`.
    pub fn new(return_value: Option<i32>) -> Self {
        Self {
            return_value,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Runner reporting success.
    pub fn success() -> Self {
        Self::new(Some(0))
    }
}

impl CommandRunner for FixedRunner {
    fn run(&self, command: &[String]) -> Result<Byproducts, RunnerError> {
        self.calls.lock().expect("runner lock").push(command.to_vec());
        Ok(Byproducts {
            stdout: "ok".to_string(),
            stderr: String::new(),
            return_value: self.return_value,
        })
    }
}

/// Audit sink capturing events in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Recorded events.
    pub events: Mutex<Vec<VerificationAuditEvent>>,
}

impl VerificationAuditSink for RecordingAuditSink {
    fn record(&self, event: &VerificationAuditEvent) {
        self.events.lock().expect("audit lock").push(event.clone());
    }
}
