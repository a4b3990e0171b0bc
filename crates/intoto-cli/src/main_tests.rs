// crates/intoto-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for time resolution, audit sinks, and rendering.
// Purpose: Ensure CLI helpers fail closed and render reports faithfully.
// Dependencies: intoto-cli main helpers
// ============================================================================

//! ## Overview
//! Exercises the helpers behind `verify` without spawning the binary.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use intoto_config::AuditConfig;
use intoto_config::AuditSinkKind;
use intoto_core::CommandMismatch;
use intoto_core::KeyId;
use intoto_core::VerificationError;
use intoto_core::VerificationReport;
use intoto_core::VerificationState;
use intoto_core::VerificationStatus;
use intoto_core::runtime::StepSigners;

use super::LangArg;
use super::Locale;
use super::VerifyFormat;
use super::build_audit_sink;
use super::render_verification_markdown;
use super::render_verification_report;
use super::resolve_locale;
use super::resolve_verification_time;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn passing_report() -> VerificationReport {
    VerificationReport {
        status: VerificationStatus::Pass,
        reached_state: VerificationState::Pass,
        failure: None,
        command_mismatches: vec![CommandMismatch {
            step: "package".into(),
            expected: vec!["tar".to_string(), "zcvf".to_string()],
            actual: vec!["zip".to_string()],
        }],
        verified_steps: vec![StepSigners {
            step: "package".into(),
            signers: vec![KeyId::new("0123456789abcdef0123")],
        }],
        summary: None,
    }
}

fn failing_report() -> VerificationReport {
    VerificationReport {
        status: VerificationStatus::Fail,
        reached_state: VerificationState::Start,
        failure: Some(VerificationError::MissingLink("build".into())),
        command_mismatches: Vec::new(),
        verified_steps: Vec::new(),
        summary: None,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn verification_time_parses_rfc3339_and_rejects_garbage() {
    let at = resolve_verification_time(Some("2025-06-01T12:00:00Z")).expect("valid instant");
    assert_eq!(at.unix_timestamp(), 1_748_779_200);
    let err = resolve_verification_time(Some("yesterday")).expect_err("invalid instant");
    assert!(err.to_string().contains("yesterday"));
    assert!(resolve_verification_time(None).is_ok());
}

#[test]
fn markdown_lists_steps_and_mismatches() {
    let markdown = render_verification_markdown(&passing_report());
    assert!(markdown.starts_with("# in-toto Verification Report"));
    assert!(markdown.contains("- Status: pass"));
    assert!(markdown.contains("- Failure: none"));
    assert!(markdown.contains("- package: signed by 01234567"));
    assert!(markdown.contains("- package: expected `tar zcvf`, ran `zip`"));
}

#[test]
fn markdown_reports_failure_kind() {
    let markdown = render_verification_markdown(&failing_report());
    assert!(markdown.contains("- Status: fail"));
    assert!(markdown.contains("- Reached state: start"));
    assert!(markdown.contains("- Failure (missing_link): no link found for step build"));
    assert_eq!(markdown.matches("- none").count(), 2);
}

#[test]
fn json_report_is_canonical() {
    let json = render_verification_report(VerifyFormat::Json, &failing_report()).expect("json");
    let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
    assert_eq!(value["status"], "fail");
    assert_eq!(value["failure"]["kind"], "missing_link");
    assert!(!json.contains('\n'));
}

#[test]
fn audit_sink_follows_config() {
    assert!(build_audit_sink(&AuditConfig::default()).expect("none").is_none());
    let stderr = AuditConfig {
        sink: AuditSinkKind::Stderr,
        path: None,
    };
    assert!(build_audit_sink(&stderr).expect("stderr").is_some());

    let dir = tempfile::tempdir().expect("tempdir");
    let file = AuditConfig {
        sink: AuditSinkKind::File,
        path: Some(dir.path().join("audit.jsonl")),
    };
    assert!(build_audit_sink(&file).expect("file").is_some());
    assert!(dir.path().join("audit.jsonl").exists());

    let missing = AuditConfig {
        sink: AuditSinkKind::File,
        path: None,
    };
    assert!(build_audit_sink(&missing).is_err());
}

#[test]
fn locale_prefers_flag_then_env() {
    assert_eq!(resolve_locale(Some(LangArg::Ca), Some("en")).expect("flag"), Locale::Ca);
    assert_eq!(resolve_locale(None, Some("ca-ES")).expect("env"), Locale::Ca);
    assert_eq!(resolve_locale(None, None).expect("default"), Locale::En);
    assert!(resolve_locale(None, Some("klingon")).is_err());
}
