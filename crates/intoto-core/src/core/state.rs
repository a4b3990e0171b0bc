// crates/intoto-core/src/core/state.rs
// ============================================================================
// Module: in-toto Verification State
// Description: Verification lifecycle states, outcome status, and findings.
// Purpose: Describe how far a verification run progressed and what it noticed.
// Dependencies: serde, crate::core::identifiers
// ============================================================================

//! ## Overview
//! A verification run advances through a fixed sequence of states and ends in
//! [`VerificationState::Pass`] or [`VerificationState::Fail`]. Advisory
//! findings such as command mismatches are collected alongside the run but
//! never change its outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::StepName;

// ============================================================================
// SECTION: Verification State
// ============================================================================

/// Verification lifecycle state.
///
/// # Invariants
/// - Runs move forward only: `Start -> LayoutLoaded -> TrustVerified ->
///   InspectionsRun -> RulesVerified -> Pass`, or to `Fail` from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    /// Nothing checked yet.
    Start,
    /// Layout validated and every step has link evidence.
    LayoutLoaded,
    /// Layout and link signatures verified.
    TrustVerified,
    /// Inspections executed.
    InspectionsRun,
    /// All matchrules verified.
    RulesVerified,
    /// Verification passed.
    Pass,
    /// Verification failed.
    Fail,
}

impl VerificationState {
    /// Returns the snake case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::LayoutLoaded => "layout_loaded",
            Self::TrustVerified => "trust_verified",
            Self::InspectionsRun => "inspections_run",
            Self::RulesVerified => "rules_verified",
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }
}

/// Final verification status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Every check succeeded.
    Pass,
    /// A fatal check failed.
    Fail,
}

// ============================================================================
// SECTION: Findings
// ============================================================================

/// Advisory finding: a link ran a different command than the step expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMismatch {
    /// Step name.
    pub step: StepName,
    /// Command declared by the layout.
    pub expected: Vec<String>,
    /// Command recorded in the link.
    pub actual: Vec<String>,
}
