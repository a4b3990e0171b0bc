// crates/intoto-core/tests/verifier.rs
// ============================================================================
// Module: Layout Verifier Tests
// Description: End-to-end verification runs over in-memory evidence.
// ============================================================================
//! ## Overview
//! Drives [`LayoutVerifier`] through passing and failing runs of a two-step
//! supply chain, with and without inspections, and checks the report and the
//! audit trail each run produces.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod support;

use std::sync::Arc;

use intoto_core::ArtifactSet;
use intoto_core::AuditEventKind;
use intoto_core::Inspection;
use intoto_core::Layout;
use intoto_core::LayoutVerifier;
use intoto_core::LinkSet;
use intoto_core::PublicKey;
use intoto_core::VerificationError;
use intoto_core::VerificationReport;
use intoto_core::VerificationState;
use intoto_core::VerificationStatus;
use intoto_core::VerifierConfig;
use intoto_core::runtime::RuleFailure;
use intoto_core::runtime::SUMMARY_LINK_NAME;
use intoto_core::time::parse_expiry;
use support::FakeSignatureVerifier;
use support::FixedRunner;
use support::RecordingAuditSink;
use support::SequenceHasher;
use support::artifacts;
use support::key_id;
use support::rules;
use support::sign_layout;
use support::signed_link;
use support::step;
use support::test_key;
use support::two_step_layout;
use support::verification_time;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Owner and functionary keys of the fixture supply chain.
struct Parties {
    owner: PublicKey,
    alice: PublicKey,
    bob: PublicKey,
}

fn parties() -> Parties {
    Parties {
        owner: test_key("owner"),
        alice: test_key("alice"),
        bob: test_key("bob"),
    }
}

/// Honest evidence: alice writes `foo.py`, bob packages it.
fn honest_links(parties: &Parties, packaged_source: &str) -> LinkSet {
    let write_code = signed_link(
        "write-code",
        artifacts(&[]),
        artifacts(&[("foo.py", "print('hi')")]),
        &["vi", "foo.py"],
        &parties.alice,
    );
    let package = signed_link(
        "package",
        artifacts(&[("foo.py", packaged_source)]),
        artifacts(&[("foo.py", packaged_source), ("foo.tar.gz", "tarball")]),
        &["tar", "zcvf", "foo.tar.gz", "foo.py"],
        &parties.bob,
    );
    [write_code, package].into_iter().collect()
}

fn verifier_with(
    parties: &Parties,
    layout: Layout,
    hasher: SequenceHasher,
    runner: FixedRunner,
    config: VerifierConfig,
) -> LayoutVerifier<FakeSignatureVerifier, SequenceHasher, FixedRunner> {
    LayoutVerifier::new(
        layout,
        vec![parties.owner.clone()],
        FakeSignatureVerifier,
        hasher,
        runner,
        config,
    )
    .expect("layout is valid")
}

fn verifier(
    parties: &Parties,
) -> LayoutVerifier<FakeSignatureVerifier, SequenceHasher, FixedRunner> {
    let layout = two_step_layout(&parties.owner, &parties.alice, &parties.bob);
    verifier_with(
        parties,
        layout,
        SequenceHasher::empty(),
        FixedRunner::success(),
        VerifierConfig::default(),
    )
}

/// Fixture layout extended with an `untar` inspection and re-signed.
fn layout_with_inspection(parties: &Parties) -> Layout {
    let mut layout = two_step_layout(&parties.owner, &parties.alice, &parties.bob);
    layout.inspect.push(Inspection {
        name: "untar".into(),
        expected_materials: rules(&["MATCH foo.tar.gz WITH PRODUCTS FROM package"]),
        expected_products: rules(&[
            "MATCH foo.py WITH PRODUCTS FROM write-code",
            "ALLOW foo.tar.gz",
        ]),
        run: vec!["tar".to_string(), "xzf".to_string(), "foo.tar.gz".to_string()],
    });
    layout.signatures.clear();
    sign_layout(&mut layout, &parties.owner);
    layout
}

/// Working tree before and after the `untar` inspection.
fn untar_snapshots(extracted: &str) -> Vec<ArtifactSet> {
    vec![
        artifacts(&[("foo.tar.gz", "tarball")]),
        artifacts(&[("foo.tar.gz", "tarball"), ("foo.py", extracted)]),
    ]
}

fn failure(report: &VerificationReport) -> &VerificationError {
    report.failure.as_ref().expect("run failed")
}

// ============================================================================
// SECTION: Passing Runs
// ============================================================================

#[test]
fn honest_two_step_chain_passes() {
    let parties = parties();
    let links = honest_links(&parties, "print('hi')");
    let report = verifier(&parties).verify(&links, verification_time());

    assert!(report.passed(), "{}", failure_text(&report));
    assert_eq!(report.status, VerificationStatus::Pass);
    assert_eq!(report.reached_state, VerificationState::Pass);
    assert!(report.command_mismatches.is_empty());
    let steps: Vec<&str> = report.verified_steps.iter().map(|s| s.step.as_str()).collect();
    assert_eq!(steps, vec!["write-code", "package"]);
    assert_eq!(report.verified_steps[0].signers, vec![key_id(&parties.alice)]);
}

#[test]
fn summary_link_spans_first_and_last_step() {
    let parties = parties();
    let links = honest_links(&parties, "print('hi')");
    let report = verifier(&parties).verify(&links, verification_time());
    let summary = report.summary.expect("summary on pass");
    assert_eq!(summary.name.as_str(), SUMMARY_LINK_NAME);
    assert!(summary.materials.is_empty());
    assert_eq!(
        summary.products,
        artifacts(&[("foo.py", "print('hi')"), ("foo.tar.gz", "tarball")])
    );
    assert_eq!(summary.command, vec!["tar", "zcvf", "foo.tar.gz", "foo.py"]);
    assert!(summary.signatures.is_empty());
}

#[test]
fn repeated_runs_produce_identical_reports() {
    let parties = parties();
    let verifier = verifier(&parties);
    let links = honest_links(&parties, "print('hi')");
    let first = verifier.verify(&links, verification_time());
    let second = verifier.verify(&links, verification_time());
    assert_eq!(first, second);
}

#[test]
fn command_mismatch_is_reported_without_failing() {
    let parties = parties();
    let mut links = honest_links(&parties, "print('hi')");
    links.replace(signed_link(
        "write-code",
        artifacts(&[]),
        artifacts(&[("foo.py", "print('hi')")]),
        &["emacs", "foo.py"],
        &parties.alice,
    ));
    let sink = Arc::new(RecordingAuditSink::default());
    let verifier = verifier(&parties).with_audit_sink(sink.clone());
    let report = verifier.verify(&links, verification_time());

    assert!(report.passed(), "{}", failure_text(&report));
    assert_eq!(report.command_mismatches.len(), 1);
    assert_eq!(report.command_mismatches[0].step.as_str(), "write-code");
    let events = sink.events.lock().expect("events");
    assert!(events.iter().any(|event| event.event == AuditEventKind::CommandMismatch));
}

#[test]
fn audit_trail_records_each_state_then_outcome() {
    let parties = parties();
    let sink = Arc::new(RecordingAuditSink::default());
    let verifier = verifier(&parties).with_audit_sink(sink.clone());
    let report = verifier.verify(&honest_links(&parties, "print('hi')"), verification_time());
    assert!(report.passed());

    let events = sink.events.lock().expect("events");
    let transitions: Vec<VerificationState> = events
        .iter()
        .filter(|event| event.event == AuditEventKind::StateTransition)
        .map(|event| event.state)
        .collect();
    assert_eq!(
        transitions,
        vec![
            VerificationState::Start,
            VerificationState::LayoutLoaded,
            VerificationState::TrustVerified,
            VerificationState::InspectionsRun,
            VerificationState::RulesVerified,
        ]
    );
    let last = events.last().expect("outcome event");
    assert_eq!(last.event, AuditEventKind::Outcome);
    assert_eq!(last.status, Some(VerificationStatus::Pass));
    assert_eq!(last.timestamp, "2025-06-01T12:00:00Z");
}

// ============================================================================
// SECTION: Failing Runs
// ============================================================================

#[test]
fn tampered_package_material_fails_rule_verification() {
    let parties = parties();
    let report =
        verifier(&parties).verify(&honest_links(&parties, "rm -rf /"), verification_time());

    assert_eq!(report.status, VerificationStatus::Fail);
    assert_eq!(report.reached_state, VerificationState::InspectionsRun);
    assert!(report.summary.is_none());
    let VerificationError::RuleVerificationFailed(err) = failure(&report) else {
        panic!("expected rule failure, got {}", failure_text(&report));
    };
    assert_eq!(err.item.as_str(), "package");
    assert_eq!(err.reason, RuleFailure::DigestMismatch("foo.py".to_string()));
}

#[test]
fn missing_step_link_fails_before_trust() {
    let parties = parties();
    let mut links = LinkSet::new();
    links.insert(signed_link(
        "write-code",
        artifacts(&[]),
        artifacts(&[("foo.py", "print('hi')")]),
        &["vi", "foo.py"],
        &parties.alice,
    ));
    let report = verifier(&parties).verify(&links, verification_time());
    assert_eq!(failure(&report), &VerificationError::MissingLink("package".into()));
    assert_eq!(report.reached_state, VerificationState::Start);
}

#[test]
fn expired_layout_fails() {
    let parties = parties();
    let later = parse_expiry("2100-01-01T00:00:00Z").expect("instant");
    let report = verifier(&parties).verify(&honest_links(&parties, "print('hi')"), later);
    assert!(matches!(failure(&report), VerificationError::LayoutExpired { .. }));
    assert_eq!(report.reached_state, VerificationState::LayoutLoaded);
}

#[test]
fn unknown_owner_key_fails_signature_verification() {
    let parties = parties();
    let layout = two_step_layout(&test_key("impostor"), &parties.alice, &parties.bob);
    let verifier = verifier_with(
        &parties,
        layout,
        SequenceHasher::empty(),
        FixedRunner::success(),
        VerifierConfig::default(),
    );
    let report = verifier.verify(&honest_links(&parties, "print('hi')"), verification_time());
    assert!(matches!(failure(&report), VerificationError::SignatureVerification(_)));
}

#[test]
fn link_signed_by_wrong_functionary_fails_threshold() {
    let parties = parties();
    let mut links = honest_links(&parties, "print('hi')");
    links.replace(signed_link(
        "write-code",
        artifacts(&[]),
        artifacts(&[("foo.py", "print('hi')")]),
        &["vi", "foo.py"],
        &parties.bob,
    ));
    let report = verifier(&parties).verify(&links, verification_time());
    assert!(matches!(failure(&report), VerificationError::SignatureVerification(_)));
    assert_eq!(report.reached_state, VerificationState::LayoutLoaded);
}

#[test]
fn invalid_layout_is_rejected_at_construction() {
    let parties = parties();
    let layout = support::layout(vec![step("build", &[&parties.alice], 3)], &[&parties.alice]);
    let result = LayoutVerifier::new(
        layout,
        vec![parties.owner.clone()],
        FakeSignatureVerifier,
        SequenceHasher::empty(),
        FixedRunner::success(),
        VerifierConfig::default(),
    );
    assert!(matches!(result, Err(VerificationError::InvalidLayout(_))));
}

#[test]
fn report_serializes_failure_kind_and_message() {
    let parties = parties();
    let report =
        verifier(&parties).verify(&honest_links(&parties, "rm -rf /"), verification_time());
    let value = serde_json::to_value(&report).expect("serialize report");
    assert_eq!(value["status"], "fail");
    assert_eq!(value["failure"]["kind"], "rule_verification_failed");
    assert!(value["failure"]["message"].as_str().expect("message").contains("package"));
}

// ============================================================================
// SECTION: Inspections
// ============================================================================

#[test]
fn inspection_runs_and_its_rules_pass() {
    let parties = parties();
    let verifier = verifier_with(
        &parties,
        layout_with_inspection(&parties),
        SequenceHasher::new(untar_snapshots("print('hi')")),
        FixedRunner::success(),
        VerifierConfig::default(),
    );
    let report = verifier.verify(&honest_links(&parties, "print('hi')"), verification_time());
    assert!(report.passed(), "{}", failure_text(&report));
}

#[test]
fn inspection_detects_tampered_tarball_contents() {
    let parties = parties();
    let verifier = verifier_with(
        &parties,
        layout_with_inspection(&parties),
        SequenceHasher::new(untar_snapshots("backdoor()")),
        FixedRunner::success(),
        VerifierConfig::default(),
    );
    let report = verifier.verify(&honest_links(&parties, "print('hi')"), verification_time());
    let VerificationError::RuleVerificationFailed(err) = failure(&report) else {
        panic!("expected rule failure, got {}", failure_text(&report));
    };
    assert_eq!(err.item.as_str(), "untar");
}

#[test]
fn failing_inspection_command_fails_when_enforced() {
    let parties = parties();
    let verifier = verifier_with(
        &parties,
        layout_with_inspection(&parties),
        SequenceHasher::new(untar_snapshots("print('hi')")),
        FixedRunner::new(Some(2)),
        VerifierConfig::default(),
    );
    let report = verifier.verify(&honest_links(&parties, "print('hi')"), verification_time());
    assert_eq!(
        failure(&report),
        &VerificationError::InspectionFailed {
            name: "untar".into(),
            return_value: Some(2),
        }
    );
    assert_eq!(report.reached_state, VerificationState::TrustVerified);
}

#[test]
fn failing_inspection_command_is_tolerated_when_not_enforced() {
    let parties = parties();
    let config = VerifierConfig {
        enforce_inspection_exit_code: false,
        ..VerifierConfig::default()
    };
    let verifier = verifier_with(
        &parties,
        layout_with_inspection(&parties),
        SequenceHasher::new(untar_snapshots("print('hi')")),
        FixedRunner::new(Some(2)),
        config,
    );
    let report = verifier.verify(&honest_links(&parties, "print('hi')"), verification_time());
    assert!(report.passed(), "{}", failure_text(&report));
}

#[test]
fn supplied_link_for_inspection_name_is_ignored() {
    let parties = parties();
    let mut links = honest_links(&parties, "print('hi')");
    links.insert(signed_link(
        "untar",
        artifacts(&[("foo.tar.gz", "forged")]),
        artifacts(&[]),
        &["true"],
        &parties.alice,
    ));
    let verifier = verifier_with(
        &parties,
        layout_with_inspection(&parties),
        SequenceHasher::new(untar_snapshots("print('hi')")),
        FixedRunner::success(),
        VerifierConfig::default(),
    );
    let report = verifier.verify(&links, verification_time());
    assert!(report.passed(), "{}", failure_text(&report));
}

/// Renders a report failure for assertion messages.
fn failure_text(report: &VerificationReport) -> String {
    report.failure.as_ref().map(ToString::to_string).unwrap_or_default()
}
