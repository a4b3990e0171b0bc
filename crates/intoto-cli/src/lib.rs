// crates/intoto-cli/src/lib.rs
// ============================================================================
// Module: in-toto Verify CLI Library
// Description: Shared helpers for the intoto-verify command-line interface.
// Purpose: Provide reusable components (i18n) for the CLI binary and tests.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! This library houses the localized message catalog. The binary entry point
//! (`src/main.rs`) imports it so every user-facing line goes through one
//! place.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Internationalization helpers and message catalog.
pub mod i18n;

#[cfg(test)]
mod tests;
