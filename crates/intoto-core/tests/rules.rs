// crates/intoto-core/tests/rules.rs
// ============================================================================
// Module: Rule Engine Tests
// Description: Queue-consumption semantics of artifact rules.
// ============================================================================
//! ## Overview
//! Verifies each rule kind against hand-built artifact sets, including the
//! prefix and rename handling of MATCH rules and the final unconsumed check.

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

use intoto_core::ArtifactKind;
use intoto_core::ArtifactSet;
use intoto_core::Link;
use intoto_core::runtime::ResolvedLinks;
use intoto_core::runtime::RuleContext;
use intoto_core::runtime::RuleFailure;
use intoto_core::runtime::RuleVerificationError;
use intoto_core::runtime::verify_rules;
use support::artifacts;
use support::rules;

/// Builds a link without signatures.
fn link(name: &str, materials: ArtifactSet, products: ArtifactSet) -> Link {
    Link {
        materials,
        products,
        ..Link::new(name)
    }
}

/// Runs `specs` against one artifact set of `subject` with `others` resolvable.
fn check(
    subject: &Link,
    kind: ArtifactKind,
    specs: &[&str],
    others: &[Link],
) -> Result<(), RuleVerificationError> {
    let mut resolved: ResolvedLinks =
        others.iter().map(|other| (other.name.clone(), other.clone())).collect();
    resolved.insert(subject.name.clone(), subject.clone());
    let ctx = RuleContext::for_link(subject, kind, &resolved);
    verify_rules(&rules(specs), &ctx)
}

// ============================================================================
// SECTION: CREATE / DELETE / MODIFY
// ============================================================================

#[test]
fn create_passes_for_new_product() {
    let subject = link("write-code", artifacts(&[]), artifacts(&[("foo.py", "v1")]));
    check(&subject, ArtifactKind::Products, &["CREATE foo.py"], &[]).expect("created");
}

#[test]
fn create_fails_when_artifact_existed_as_material() {
    let subject =
        link("edit", artifacts(&[("foo.py", "v1")]), artifacts(&[("foo.py", "v2")]));
    let err = check(&subject, ArtifactKind::Products, &["CREATE foo.py"], &[])
        .expect_err("artifact existed before");
    assert_eq!(err.reason, RuleFailure::NotCreated);
    assert_eq!(err.artifacts, vec!["foo.py".to_string()]);
    assert_eq!(err.rule.as_deref(), Some("CREATE foo.py"));
}

#[test]
fn create_with_nothing_matching_fails_unless_wildcard() {
    let subject = link("noop", artifacts(&[]), artifacts(&[]));
    let err = check(&subject, ArtifactKind::Products, &["CREATE foo.py"], &[])
        .expect_err("nothing created");
    assert_eq!(err.reason, RuleFailure::NothingCreated);
    check(&subject, ArtifactKind::Products, &["CREATE *"], &[]).expect("wildcard may be empty");
}

#[test]
fn delete_passes_for_removed_material() {
    let subject = link("clean", artifacts(&[("a.o", "obj")]), artifacts(&[]));
    check(&subject, ArtifactKind::Materials, &["DELETE *.o"], &[]).expect("deleted");
}

#[test]
fn delete_fails_when_artifact_survives() {
    let subject = link("clean", artifacts(&[("a.o", "obj")]), artifacts(&[("a.o", "obj")]));
    let err = check(&subject, ArtifactKind::Materials, &["DELETE a.o"], &[])
        .expect_err("still present");
    assert_eq!(err.reason, RuleFailure::NotDeleted);
    assert_eq!(err.artifacts, vec!["a.o".to_string()]);
}

#[test]
fn modify_requires_changed_digest() {
    let changed = link("edit", artifacts(&[("f", "v1")]), artifacts(&[("f", "v2")]));
    check(&changed, ArtifactKind::Products, &["MODIFY f"], &[]).expect("modified");

    let unchanged = link("edit", artifacts(&[("f", "v1")]), artifacts(&[("f", "v1")]));
    let err = check(&unchanged, ArtifactKind::Products, &["MODIFY f"], &[])
        .expect_err("unchanged digest");
    assert_eq!(err.reason, RuleFailure::NotModified);
}

// ============================================================================
// SECTION: ALLOW / DISALLOW / Unconsumed
// ============================================================================

#[test]
fn allow_consumes_matches() {
    let subject = link("s", artifacts(&[]), artifacts(&[("README", "r"), ("x.log", "l")]));
    check(&subject, ArtifactKind::Products, &["ALLOW README", "ALLOW *.log"], &[])
        .expect("all consumed");
}

#[test]
fn disallow_fails_on_any_remaining_match() {
    let subject = link("s", artifacts(&[]), artifacts(&[("secret.key", "k")]));
    let err = check(&subject, ArtifactKind::Products, &["DISALLOW *.key"], &[])
        .expect_err("disallowed artifact");
    assert_eq!(err.reason, RuleFailure::Disallowed);
    assert_eq!(err.artifacts, vec!["secret.key".to_string()]);
}

#[test]
fn earlier_rules_shield_artifacts_from_later_disallow() {
    let subject = link("s", artifacts(&[]), artifacts(&[("foo.py", "v")]));
    check(&subject, ArtifactKind::Products, &["ALLOW foo.py", "DISALLOW *"], &[])
        .expect("consumed before disallow");
}

#[test]
fn leftover_artifacts_are_reported_as_unconsumed() {
    let subject =
        link("s", artifacts(&[]), artifacts(&[("foo.py", "v"), ("stray.txt", "x")]));
    let err = check(&subject, ArtifactKind::Products, &["CREATE foo.py"], &[])
        .expect_err("stray artifact");
    assert_eq!(err.reason, RuleFailure::Unconsumed);
    assert_eq!(err.rule, None);
    assert_eq!(err.artifacts, vec!["stray.txt".to_string()]);
}

#[test]
fn empty_rule_list_passes_only_for_empty_set() {
    let empty = link("s", artifacts(&[]), artifacts(&[]));
    check(&empty, ArtifactKind::Materials, &[], &[]).expect("nothing to consume");
    let full = link("s", artifacts(&[("a", "a")]), artifacts(&[]));
    let err = check(&full, ArtifactKind::Materials, &[], &[]).expect_err("unconsumed");
    assert_eq!(err.reason, RuleFailure::Unconsumed);
}

#[test]
fn star_matches_across_directories() {
    let subject = link("s", artifacts(&[]), artifacts(&[("dist/pkg/a.whl", "w")]));
    check(&subject, ArtifactKind::Products, &["CREATE *.whl"], &[]).expect("star crosses '/'");
}

// ============================================================================
// SECTION: MATCH
// ============================================================================

#[test]
fn match_passes_when_digests_agree() {
    let upstream = link("write-code", artifacts(&[]), artifacts(&[("foo.py", "v1")]));
    let subject = link("package", artifacts(&[("foo.py", "v1")]), artifacts(&[]));
    check(
        &subject,
        ArtifactKind::Materials,
        &["MATCH foo.py WITH PRODUCTS FROM write-code"],
        &[upstream],
    )
    .expect("digests agree");
}

#[test]
fn match_fails_on_digest_mismatch() {
    let upstream = link("write-code", artifacts(&[]), artifacts(&[("foo.py", "v1")]));
    let subject = link("package", artifacts(&[("foo.py", "tampered")]), artifacts(&[]));
    let err = check(
        &subject,
        ArtifactKind::Materials,
        &["MATCH foo.py WITH PRODUCTS FROM write-code"],
        &[upstream],
    )
    .expect_err("tampered artifact");
    assert_eq!(err.reason, RuleFailure::DigestMismatch("foo.py".to_string()));
    assert_eq!(err.artifacts, vec!["foo.py".to_string()]);
}

#[test]
fn match_fails_when_target_link_lacks_the_artifact() {
    let upstream = link("write-code", artifacts(&[]), artifacts(&[("foo.py", "v1")]));
    let subject =
        link("package", artifacts(&[("foo.py", "v1"), ("bar.py", "b")]), artifacts(&[]));
    let err = check(
        &subject,
        ArtifactKind::Materials,
        &["MATCH *.py WITH PRODUCTS FROM write-code"],
        &[upstream],
    )
    .expect_err("bar.py missing upstream");
    assert_eq!(err.reason, RuleFailure::MissingTarget("bar.py".to_string()));
}

#[test]
fn match_fails_when_target_set_has_nothing_matching() {
    let upstream = link("write-code", artifacts(&[]), artifacts(&[("other.txt", "o")]));
    let subject = link("package", artifacts(&[]), artifacts(&[]));
    let err = check(
        &subject,
        ArtifactKind::Materials,
        &["MATCH foo.py WITH PRODUCTS FROM write-code"],
        &[upstream],
    )
    .expect_err("no target artifacts");
    assert_eq!(err.reason, RuleFailure::NoTargetArtifacts);
}

#[test]
fn match_fails_when_source_artifact_is_absent() {
    let upstream = link("link-1", artifacts(&[("foo", "v1")]), artifacts(&[]));
    let subject = link("package", artifacts(&[]), artifacts(&[]));
    let err = check(
        &subject,
        ArtifactKind::Materials,
        &["MATCH MATERIAL foo FROM link-1"],
        std::slice::from_ref(&upstream),
    )
    .expect_err("foo never reached this step");
    assert_eq!(err.reason, RuleFailure::NoSourceArtifacts);
    assert_eq!(err.rule.as_deref(), Some("MATCH foo WITH MATERIALS FROM link-1"));

    let elsewhere = link("package", artifacts(&[("notes.txt", "n")]), artifacts(&[]));
    let err = check(
        &elsewhere,
        ArtifactKind::Materials,
        &["MATCH * IN staging WITH MATERIALS FROM link-1", "ALLOW notes.txt"],
        &[upstream],
    )
    .expect_err("nothing under the source prefix");
    assert_eq!(err.reason, RuleFailure::NoSourceArtifacts);
}

#[test]
fn match_fails_when_target_link_is_absent() {
    let subject = link("package", artifacts(&[("foo.py", "v1")]), artifacts(&[]));
    let err = check(
        &subject,
        ArtifactKind::Materials,
        &["MATCH foo.py WITH PRODUCTS FROM write-code"],
        &[],
    )
    .expect_err("missing link");
    assert_eq!(err.reason, RuleFailure::MissingLink("write-code".into()));
}

#[test]
fn match_applies_source_and_destination_prefixes() {
    let upstream = link("build", artifacts(&[]), artifacts(&[("out/lib.so", "bin")]));
    let subject = link("package", artifacts(&[("staging/lib.so", "bin")]), artifacts(&[]));
    check(
        &subject,
        ArtifactKind::Materials,
        &["MATCH * IN staging/ WITH PRODUCTS IN out FROM build"],
        &[upstream],
    )
    .expect("prefixes stripped and applied");
}

#[test]
fn match_ignores_queue_entries_outside_source_prefix() {
    let upstream = link("build", artifacts(&[]), artifacts(&[("lib.so", "bin")]));
    let materials = artifacts(&[("staging/lib.so", "bin"), ("notes.txt", "n")]);
    let subject = link("package", materials, artifacts(&[]));
    let err = check(
        &subject,
        ArtifactKind::Materials,
        &["MATCH * IN staging WITH PRODUCTS FROM build"],
        &[upstream],
    )
    .expect_err("notes.txt left over");
    assert_eq!(err.reason, RuleFailure::Unconsumed);
    assert_eq!(err.artifacts, vec!["notes.txt".to_string()]);
}

#[test]
fn match_literal_rename() {
    let upstream = link("build", artifacts(&[]), artifacts(&[("app-1.0.tar", "t")]));
    let subject = link("sign", artifacts(&[("app.tar", "t")]), artifacts(&[]));
    check(
        &subject,
        ArtifactKind::Materials,
        &["MATCH app.tar WITH PRODUCTS FROM build AS app-1.0.tar"],
        &[upstream],
    )
    .expect("renamed target");
}

#[test]
fn match_star_rename_substitutes_capture() {
    let upstream =
        link("build", artifacts(&[]), artifacts(&[("dist/a.bin", "a"), ("dist/b.bin", "b")]));
    let subject =
        link("ship", artifacts(&[("a.out", "a"), ("b.out", "b")]), artifacts(&[]));
    check(
        &subject,
        ArtifactKind::Materials,
        &["MATCH *.out WITH PRODUCTS IN dist FROM build AS *.bin"],
        &[upstream],
    )
    .expect("captured stem reused");
}

#[test]
fn match_against_materials_of_target() {
    let upstream = link("fetch", artifacts(&[("src.tar", "s")]), artifacts(&[]));
    let subject = link("build", artifacts(&[("src.tar", "s")]), artifacts(&[]));
    check(
        &subject,
        ArtifactKind::Materials,
        &["MATCH src.tar WITH MATERIALS FROM fetch"],
        &[upstream],
    )
    .expect("materials compared");
}

#[test]
fn error_message_names_item_rule_and_artifacts() {
    let subject = link("s", artifacts(&[]), artifacts(&[("secret.key", "k")]));
    let err = check(&subject, ArtifactKind::Products, &["DISALLOW *.key"], &[])
        .expect_err("disallowed");
    let message = err.to_string();
    assert!(message.contains("s products failed"), "{message}");
    assert!(message.contains("DISALLOW *.key"), "{message}");
    assert!(message.contains("secret.key"), "{message}");
}
