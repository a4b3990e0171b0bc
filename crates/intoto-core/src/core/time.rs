// crates/intoto-core/src/core/time.rs
// ============================================================================
// Module: in-toto Time Model
// Description: Layout expiry parsing and audit timestamp formatting.
// Purpose: Keep verification time explicit and deterministic.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Layouts carry an ISO-8601 `expires` string. The core parses it with the
//! RFC 3339 profile and compares it against a verification instant supplied by
//! the caller. The core never reads wall-clock time directly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when parsing or formatting timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// Timestamp text is not valid RFC 3339.
    #[error("malformed timestamp '{value}': {reason}")]
    Malformed {
        /// Offending input.
        value: String,
        /// Parser message.
        reason: String,
    },
    /// Timestamp could not be rendered.
    #[error("failed to format timestamp: {0}")]
    Format(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a layout `expires` value.
///
/// # Errors
///
/// Returns [`TimeError::Malformed`] when the value is not RFC 3339.
pub fn parse_expiry(value: &str) -> Result<OffsetDateTime, TimeError> {
    OffsetDateTime::parse(value, &Rfc3339).map_err(|err| TimeError::Malformed {
        value: value.to_string(),
        reason: err.to_string(),
    })
}

/// Returns true when `at` is strictly after `expires`.
#[must_use]
pub fn is_expired(expires: OffsetDateTime, at: OffsetDateTime) -> bool {
    at > expires
}

/// Formats an instant as RFC 3339 for audit records.
///
/// # Errors
///
/// Returns [`TimeError::Format`] when the instant cannot be rendered.
pub fn format_timestamp(at: OffsetDateTime) -> Result<String, TimeError> {
    at.format(&Rfc3339).map_err(|err| TimeError::Format(err.to_string()))
}
