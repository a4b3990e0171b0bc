// crates/intoto-core/src/core/audit.rs
// ============================================================================
// Module: in-toto Verification Audit Events
// Description: Structured audit payloads emitted during verification.
// Purpose: Let hosts log verification progress without a logging framework.
// Dependencies: serde, time, crate::core::{identifiers, state, time}
// ============================================================================

//! ## Overview
//! The verifier emits one event per state transition, per command mismatch,
//! per executed inspection, and one for the final outcome. Events serialize as
//! flat JSON objects suitable for JSON-lines sinks. Timestamps are the
//! verification instant supplied by the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use time::OffsetDateTime;

use crate::core::identifiers::StepName;
use crate::core::state::CommandMismatch;
use crate::core::state::VerificationState;
use crate::core::state::VerificationStatus;
use crate::core::time::format_timestamp;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Audit event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    /// Verifier entered a new state.
    StateTransition,
    /// A link command differed from the expected command.
    CommandMismatch,
    /// An inspection command was executed.
    InspectionRun,
    /// Verification finished.
    Outcome,
}

/// Verification audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationAuditEvent {
    /// Event kind.
    pub event: AuditEventKind,
    /// RFC 3339 verification instant.
    pub timestamp: String,
    /// State the verifier is in.
    pub state: VerificationState,
    /// Step or inspection concerned, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<StepName>,
    /// Inspection exit code, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_value: Option<i32>,
    /// Final status for outcome events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VerificationStatus>,
    /// Human-readable detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// ============================================================================
// SECTION: Constructors
// ============================================================================

impl VerificationAuditEvent {
    /// Builds an event with no optional fields.
    fn base(event: AuditEventKind, at: OffsetDateTime, state: VerificationState) -> Self {
        Self {
            event,
            timestamp: format_timestamp(at).unwrap_or_else(|_| at.unix_timestamp().to_string()),
            state,
            item: None,
            return_value: None,
            status: None,
            detail: None,
        }
    }

    /// Event for entering `state`.
    #[must_use]
    pub fn transition(at: OffsetDateTime, state: VerificationState) -> Self {
        Self::base(AuditEventKind::StateTransition, at, state)
    }

    /// Event for an advisory command mismatch.
    #[must_use]
    pub fn command_mismatch(at: OffsetDateTime, mismatch: &CommandMismatch) -> Self {
        Self {
            item: Some(mismatch.step.clone()),
            detail: Some(format!(
                "expected '{}', link recorded '{}'",
                mismatch.expected.join(" "),
                mismatch.actual.join(" ")
            )),
            ..Self::base(AuditEventKind::CommandMismatch, at, VerificationState::TrustVerified)
        }
    }

    /// Event for an executed inspection.
    #[must_use]
    pub fn inspection_run(at: OffsetDateTime, name: &StepName, return_value: Option<i32>) -> Self {
        Self {
            item: Some(name.clone()),
            return_value,
            ..Self::base(AuditEventKind::InspectionRun, at, VerificationState::TrustVerified)
        }
    }

    /// Event for the final outcome.
    #[must_use]
    pub fn outcome(
        at: OffsetDateTime,
        reached: VerificationState,
        status: VerificationStatus,
        reason: Option<String>,
    ) -> Self {
        let state = match status {
            VerificationStatus::Pass => VerificationState::Pass,
            VerificationStatus::Fail => VerificationState::Fail,
        };
        Self {
            status: Some(status),
            detail: reason.or_else(|| Some(format!("reached {}", reached.as_str()))),
            ..Self::base(AuditEventKind::Outcome, at, state)
        }
    }
}
